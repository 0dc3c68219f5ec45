use crate::domain::model::{Bar, CycleReport, SpreadsheetLocator, TrendSignal, WorksheetRef};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Source of OAuth access tokens for Google APIs.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Daily bars for `symbol`, oldest first, at most `limit` of them.
    async fn daily_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>>;
}

#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn open_worksheet(&self, locator: &SpreadsheetLocator, tab: &str) -> Result<WorksheetRef>;
    async fn read_cell(&self, worksheet: &WorksheetRef, cell: &str) -> Result<Option<String>>;
    async fn write_cell(&self, worksheet: &WorksheetRef, cell: &str, value: &str) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn spreadsheet(&self) -> SpreadsheetLocator;
    fn tab_name(&self) -> &str;
    fn target_cell(&self) -> &str;
    fn symbol(&self) -> &str;
    fn ma_window(&self) -> usize;
    fn weak_threshold_pct(&self) -> f64;
}

/// One update cycle: bars in, trend signal out, signal written to the sheet.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn prepare(&self) -> Result<Option<WorksheetRef>>;
    async fn extract(&self) -> Result<Vec<Bar>>;
    async fn transform(&self, bars: Vec<Bar>) -> Result<TrendSignal>;
    async fn load(&self, worksheet: Option<WorksheetRef>, signal: TrendSignal) -> Result<CycleReport>;
}

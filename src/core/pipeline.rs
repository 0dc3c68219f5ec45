use crate::core::{
    Bar, ConfigProvider, CycleReport, MarketData, Pipeline, SheetStore, TrendSignal, WorksheetRef,
};
use crate::domain::services::{classify_trend, compute_moving_average};
use crate::utils::error::{BotError, Result};

/// Fetches bars, classifies the latest close against the moving average and
/// writes the label into the configured cell. Without a sheet store it only
/// computes and logs.
pub struct TrendPipeline<M: MarketData, S: SheetStore, C: ConfigProvider> {
    market: M,
    sheets: Option<S>,
    config: C,
}

impl<M: MarketData, S: SheetStore, C: ConfigProvider> TrendPipeline<M, S, C> {
    pub fn new(market: M, sheets: S, config: C) -> Self {
        Self {
            market,
            sheets: Some(sheets),
            config,
        }
    }

    pub fn without_sheets(market: M, config: C) -> Self {
        Self {
            market,
            sheets: None,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<M: MarketData, S: SheetStore, C: ConfigProvider> Pipeline for TrendPipeline<M, S, C> {
    async fn prepare(&self) -> Result<Option<WorksheetRef>> {
        let Some(sheets) = &self.sheets else {
            return Ok(None);
        };
        let worksheet = sheets
            .open_worksheet(&self.config.spreadsheet(), self.config.tab_name())
            .await?;
        Ok(Some(worksheet))
    }

    async fn extract(&self) -> Result<Vec<Bar>> {
        self.market
            .daily_bars(self.config.symbol(), self.config.ma_window())
            .await
    }

    async fn transform(&self, bars: Vec<Bar>) -> Result<TrendSignal> {
        let symbol = self.config.symbol();
        let ma = compute_moving_average(&bars, self.config.ma_window())?;
        tracing::info!(
            "Computed {}-day MA for {} closes: MA={:.4}",
            ma.window,
            symbol,
            ma.value
        );

        let last_bar = bars
            .last()
            .ok_or_else(|| BotError::processing("No bars available to read the last price"))?;
        let last_price = last_bar.c.ok_or_else(|| {
            BotError::processing(format!("Latest bar at {} has no close price", last_bar.t))
        })?;
        tracing::info!(
            "Latest {} bar: t={} close={:.4} (used for comparison with {}-day MA).",
            symbol,
            last_bar.t,
            last_price,
            self.config.ma_window()
        );

        let classification = classify_trend(last_price, ma.value, self.config.weak_threshold_pct())?;
        tracing::info!(
            "Classification for {}: last_price={:.4}, MA={:.4}, diff={:.2}% => {}",
            symbol,
            last_price,
            ma.value,
            classification.diff_pct,
            classification.label
        );

        Ok(TrendSignal {
            symbol: symbol.to_string(),
            window: ma.window,
            ma_value: ma.value,
            last_price,
            last_time: last_bar.t,
            label: classification.label,
            diff_pct: classification.diff_pct,
        })
    }

    async fn load(&self, worksheet: Option<WorksheetRef>, signal: TrendSignal) -> Result<CycleReport> {
        let cell = self.config.target_cell().to_string();
        let tab = self.config.tab_name();

        let (Some(sheets), Some(worksheet)) = (&self.sheets, worksheet) else {
            tracing::info!(
                "Dry run: would set {}!{} to '{}'",
                tab,
                cell,
                signal.label
            );
            return Ok(CycleReport {
                signal,
                worksheet: None,
                cell,
                previous_value: None,
                written: false,
            });
        };

        let previous_value = match sheets.read_cell(&worksheet, &cell).await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Could not read previous value of {}!{}: {}", tab, cell, e);
                None
            }
        };
        tracing::info!(
            "Previous value in {}!{} was: {}",
            tab,
            cell,
            previous_value.as_deref().unwrap_or("None")
        );

        tracing::info!("Updating {}!{} with value '{}'.", tab, cell, signal.label);
        sheets
            .write_cell(&worksheet, &cell, signal.label.as_str())
            .await?;

        Ok(CycleReport {
            signal,
            worksheet: Some(worksheet),
            cell,
            previous_value,
            written: true,
        })
    }
}

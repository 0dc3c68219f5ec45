pub mod engine;
pub mod pipeline;

pub use crate::domain::model::{
    Bar, CycleOutcome, CycleReport, SpreadsheetLocator, TrendLabel, TrendSignal, WorksheetRef,
};
pub use crate::domain::ports::{ConfigProvider, MarketData, Pipeline, SheetStore, TokenSource};
pub use crate::utils::error::Result;

pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use app::{build_dry_run_engine, build_engine, once_exit_code, LiveEngine};
pub use config::Settings;
pub use crate::core::{engine::BotEngine, pipeline::TrendPipeline};
pub use domain::model::{CycleOutcome, CycleReport, TrendLabel, TrendSignal};
pub use utils::error::{BotError, Result};

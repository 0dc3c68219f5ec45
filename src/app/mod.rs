// Application wiring: turns validated settings into a ready engine.

use crate::adapters::{AlpacaClient, GoogleSheetsClient, ServiceAccountTokenSource};
use crate::config::Settings;
use crate::core::{engine::BotEngine, pipeline::TrendPipeline, CycleOutcome};
use crate::utils::error::Result;
use std::time::Duration;

pub type LiveSheets = GoogleSheetsClient<ServiceAccountTokenSource>;
pub type LivePipeline = TrendPipeline<AlpacaClient, LiveSheets, Settings>;
pub type LiveEngine = BotEngine<LivePipeline>;

fn interval(settings: &Settings) -> Duration {
    Duration::from_secs(settings.schedule.refresh_interval_seconds)
}

pub fn build_engine(settings: Settings) -> Result<LiveEngine> {
    let market = AlpacaClient::from_settings(&settings.alpaca)?;
    let tokens = ServiceAccountTokenSource::from_settings(&settings.google, &Settings::scopes())?;
    tracing::info!("Using Google service account {}", tokens.client_email());
    let sheets = GoogleSheetsClient::from_settings(tokens, &settings.google)?;

    let interval = interval(&settings);
    Ok(BotEngine::new(
        TrendPipeline::new(market, sheets, settings),
        interval,
    ))
}

/// Same engine without a sheet store: computes and logs, never writes.
pub fn build_dry_run_engine(settings: Settings) -> Result<LiveEngine> {
    let market = AlpacaClient::from_settings(&settings.alpaca)?;
    let interval = interval(&settings);
    Ok(BotEngine::new(
        TrendPipeline::without_sheets(market, settings),
        interval,
    ))
}

/// Process exit code for a single `--once` cycle: 0 once the label is
/// computed, 2 when the cycle was skipped, otherwise the error's own code.
pub fn once_exit_code(outcome: &Result<CycleOutcome>) -> i32 {
    match outcome {
        Ok(CycleOutcome::Updated(_)) => 0,
        Ok(CycleOutcome::Skipped { .. }) => 2,
        Err(e) => e.exit_code(),
    }
}

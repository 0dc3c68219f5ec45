use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "rsp-ma-bot")]
#[command(about = "Classifies a symbol against its long moving average and writes the label to a Google Sheet")]
pub struct CliArgs {
    /// Optional TOML configuration file; environment variables override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run a single update cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Compute and log the classification without touching the spreadsheet
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the refresh interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

impl CliArgs {
    pub fn apply(&self, settings: &mut super::Settings) {
        if let Some(interval) = self.interval {
            settings.schedule.refresh_interval_seconds = interval;
        }
    }
}

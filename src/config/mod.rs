#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod toml_config;

use crate::domain::model::SpreadsheetLocator;
use crate::domain::ports::ConfigProvider;
use crate::domain::services::DEFAULT_WEAK_THRESHOLD_PCT;
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// A credential value that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sheets: SheetsSettings,
    pub google: GoogleSettings,
    pub alpaca: AlpacaSettings,
    pub strategy: StrategySettings,
    pub schedule: ScheduleSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub sheet_name: String,
    pub sheet_id: Option<String>,
    pub tab_name: String,
    pub target_cell: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            sheet_name: "Active-Investing".to_string(),
            sheet_id: None,
            tab_name: "Dashboard".to_string(),
            target_cell: "T3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub service_account_json: Option<Secret>,
    pub service_account_file: Option<String>,
    /// Overrides the `token_uri` found in the service account key.
    pub token_uri: Option<String>,
    pub sheets_base_url: String,
    pub drive_base_url: String,
    pub timeout_seconds: u64,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            service_account_json: None,
            service_account_file: None,
            token_uri: None,
            sheets_base_url: "https://sheets.googleapis.com".to_string(),
            drive_base_url: "https://www.googleapis.com".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlpacaSettings {
    pub data_base_url: String,
    pub symbol: String,
    pub api_key_id: Option<Secret>,
    pub api_secret_key: Option<Secret>,
    pub feed: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            data_base_url: "https://data.alpaca.markets".to_string(),
            symbol: "RSP".to_string(),
            api_key_id: None,
            api_secret_key: None,
            feed: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub ma_window: usize,
    pub weak_threshold_pct: f64,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            ma_window: 960,
            weak_threshold_pct: DEFAULT_WEAK_THRESHOLD_PCT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub refresh_interval_seconds: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then the optional TOML file, then the process environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut settings = match config_file {
            Some(path) => {
                tracing::debug!("Loading configuration file {}", path.display());
                toml_config::from_file(path)?
            }
            None => Settings::default(),
        };
        env::apply_overrides(&mut settings, |key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.logging.format).unwrap_or(LogFormat::Compact)
    }

    pub fn scopes() -> Vec<&'static str> {
        vec![SPREADSHEETS_SCOPE, DRIVE_SCOPE]
    }

    /// Everything except credentials.
    pub fn validate_settings(&self) -> Result<()> {
        use validation::*;

        if self.sheets.sheet_id.is_none() {
            validate_non_empty_string("sheets.sheet_name", &self.sheets.sheet_name)?;
        }
        if let Some(id) = &self.sheets.sheet_id {
            validate_non_empty_string("sheets.sheet_id", id)?;
        }
        validate_non_empty_string("sheets.tab_name", &self.sheets.tab_name)?;
        validate_a1_cell("sheets.target_cell", &self.sheets.target_cell)?;

        validate_url("google.sheets_base_url", &self.google.sheets_base_url)?;
        validate_url("google.drive_base_url", &self.google.drive_base_url)?;
        if let Some(token_uri) = &self.google.token_uri {
            validate_url("google.token_uri", token_uri)?;
        }
        validate_positive_number("google.timeout_seconds", self.google.timeout_seconds as usize, 1)?;

        validate_url("alpaca.data_base_url", &self.alpaca.data_base_url)?;
        validate_non_empty_string("alpaca.symbol", &self.alpaca.symbol)?;
        validate_positive_number("alpaca.timeout_seconds", self.alpaca.timeout_seconds as usize, 1)?;

        validate_positive_number("strategy.ma_window", self.strategy.ma_window, 1)?;
        validate_range(
            "strategy.weak_threshold_pct",
            self.strategy.weak_threshold_pct,
            0.0,
            1000.0,
        )?;

        validate_positive_number(
            "schedule.refresh_interval_seconds",
            self.schedule.refresh_interval_seconds as usize,
            1,
        )?;

        if LogFormat::parse(&self.logging.format).is_none() {
            return Err(crate::utils::error::BotError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
                reason: "Expected 'compact' or 'json'".to_string(),
            });
        }

        Ok(())
    }

    pub fn validate_alpaca_credentials(&self) -> Result<()> {
        let key = validation::validate_required_field("ALPACA_API_KEY_ID", &self.alpaca.api_key_id)?;
        validation::validate_non_empty_string("ALPACA_API_KEY_ID", key.expose())?;
        let secret =
            validation::validate_required_field("ALPACA_API_SECRET_KEY", &self.alpaca.api_secret_key)?;
        validation::validate_non_empty_string("ALPACA_API_SECRET_KEY", secret.expose())?;
        Ok(())
    }

    pub fn validate_google_credentials(&self) -> Result<()> {
        match (&self.google.service_account_json, &self.google.service_account_file) {
            (Some(json), _) => validation::validate_non_empty_string(
                "GOOGLE_SERVICE_ACCOUNT_JSON",
                json.expose(),
            ),
            (None, Some(path)) => validation::validate_path("GOOGLE_SERVICE_ACCOUNT_FILE", path),
            (None, None) => Err(crate::utils::error::BotError::MissingConfigError {
                field: "GOOGLE_SERVICE_ACCOUNT_JSON".to_string(),
            }),
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.validate_settings()?;
        self.validate_alpaca_credentials()?;
        self.validate_google_credentials()?;
        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn spreadsheet(&self) -> SpreadsheetLocator {
        match &self.sheets.sheet_id {
            Some(id) => SpreadsheetLocator::Id(id.clone()),
            None => SpreadsheetLocator::Title(self.sheets.sheet_name.clone()),
        }
    }

    fn tab_name(&self) -> &str {
        &self.sheets.tab_name
    }

    fn target_cell(&self) -> &str {
        &self.sheets.target_cell
    }

    fn symbol(&self) -> &str {
        &self.alpaca.symbol
    }

    fn ma_window(&self) -> usize {
        self.strategy.ma_window
    }

    fn weak_threshold_pct(&self) -> f64 {
        self.strategy.weak_threshold_pct
    }
}

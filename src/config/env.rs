use super::{Secret, Settings};
use crate::utils::error::{BotError, Result};
use std::str::FromStr;

pub const GOOGLE_SERVICE_ACCOUNT_JSON: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";
pub const GOOGLE_SERVICE_ACCOUNT_FILE: &str = "GOOGLE_SERVICE_ACCOUNT_FILE";
pub const GOOGLE_TOKEN_URI: &str = "GOOGLE_TOKEN_URI";
pub const GOOGLE_SHEETS_BASE_URL: &str = "GOOGLE_SHEETS_BASE_URL";
pub const GOOGLE_DRIVE_BASE_URL: &str = "GOOGLE_DRIVE_BASE_URL";
pub const GOOGLE_SHEET_NAME: &str = "GOOGLE_SHEET_NAME";
pub const GOOGLE_SHEET_ID: &str = "GOOGLE_SHEET_ID";
pub const DASHBOARD_TAB_NAME: &str = "DASHBOARD_TAB_NAME";
pub const TARGET_CELL: &str = "TARGET_CELL";
pub const ALPACA_API_KEY_ID: &str = "ALPACA_API_KEY_ID";
pub const ALPACA_API_SECRET_KEY: &str = "ALPACA_API_SECRET_KEY";
pub const ALPACA_DATA_BASE_URL: &str = "ALPACA_DATA_BASE_URL";
pub const ALPACA_SYMBOL: &str = "ALPACA_SYMBOL";
pub const ALPACA_FEED: &str = "ALPACA_FEED";
pub const MA_WINDOW: &str = "MA_WINDOW";
pub const WEAK_THRESHOLD_PCT: &str = "WEAK_THRESHOLD_PCT";
pub const REFRESH_INTERVAL_SECONDS: &str = "REFRESH_INTERVAL_SECONDS";
pub const HTTP_TIMEOUT_SECONDS: &str = "HTTP_TIMEOUT_SECONDS";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const LOG_FORMAT: &str = "LOG_FORMAT";

/// Applies environment overrides on top of `settings`. Empty values count as unset.
pub fn apply_overrides<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(GOOGLE_SERVICE_ACCOUNT_JSON) {
        settings.google.service_account_json = Some(Secret::new(v));
    }
    if let Some(v) = get(GOOGLE_SERVICE_ACCOUNT_FILE) {
        settings.google.service_account_file = Some(v);
    }
    if let Some(v) = get(GOOGLE_TOKEN_URI) {
        settings.google.token_uri = Some(v);
    }
    if let Some(v) = get(GOOGLE_SHEETS_BASE_URL) {
        settings.google.sheets_base_url = v;
    }
    if let Some(v) = get(GOOGLE_DRIVE_BASE_URL) {
        settings.google.drive_base_url = v;
    }
    if let Some(v) = get(GOOGLE_SHEET_NAME) {
        settings.sheets.sheet_name = v;
    }
    if let Some(v) = get(GOOGLE_SHEET_ID) {
        settings.sheets.sheet_id = Some(v);
    }
    if let Some(v) = get(DASHBOARD_TAB_NAME) {
        settings.sheets.tab_name = v;
    }
    if let Some(v) = get(TARGET_CELL) {
        settings.sheets.target_cell = v.trim().to_string();
    }
    if let Some(v) = get(ALPACA_API_KEY_ID) {
        settings.alpaca.api_key_id = Some(Secret::new(v));
    }
    if let Some(v) = get(ALPACA_API_SECRET_KEY) {
        settings.alpaca.api_secret_key = Some(Secret::new(v));
    }
    if let Some(v) = get(ALPACA_DATA_BASE_URL) {
        settings.alpaca.data_base_url = v;
    }
    if let Some(v) = get(ALPACA_SYMBOL) {
        settings.alpaca.symbol = v.trim().to_ascii_uppercase();
    }
    if let Some(v) = get(ALPACA_FEED) {
        settings.alpaca.feed = Some(v);
    }
    if let Some(v) = get(MA_WINDOW) {
        settings.strategy.ma_window = parse_number(MA_WINDOW, &v)?;
    }
    if let Some(v) = get(WEAK_THRESHOLD_PCT) {
        settings.strategy.weak_threshold_pct = parse_number(WEAK_THRESHOLD_PCT, &v)?;
    }
    if let Some(v) = get(REFRESH_INTERVAL_SECONDS) {
        settings.schedule.refresh_interval_seconds = parse_number(REFRESH_INTERVAL_SECONDS, &v)?;
    }
    if let Some(v) = get(HTTP_TIMEOUT_SECONDS) {
        let timeout: u64 = parse_number(HTTP_TIMEOUT_SECONDS, &v)?;
        settings.alpaca.timeout_seconds = timeout;
        settings.google.timeout_seconds = timeout;
    }
    if let Some(v) = get(LOG_LEVEL) {
        settings.logging.level = v.trim().to_ascii_uppercase();
    }
    if let Some(v) = get(LOG_FORMAT) {
        settings.logging.format = v;
    }

    Ok(())
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| BotError::InvalidConfigValueError {
            field: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

use rsp_ma_bot::config::{env, toml_config, Secret};
use rsp_ma_bot::utils::validation::Validate;
use rsp_ma_bot::Settings;
use std::collections::HashMap;

#[test]
fn test_example_config_parses() -> anyhow::Result<()> {
    let settings = toml_config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/bot.example.toml"))?;

    assert_eq!(settings.sheets.target_cell, "T3");
    assert_eq!(settings.alpaca.symbol, "RSP");
    assert_eq!(settings.strategy.ma_window, 960);
    assert!(settings.validate_settings().is_ok());
    Ok(())
}

#[test]
fn test_environment_overrides_file() -> anyhow::Result<()> {
    let mut settings = toml_config::from_toml_str(
        r#"
[alpaca]
symbol = "SPY"

[strategy]
ma_window = 200
"#,
    )?;

    let vars: HashMap<&str, &str> = HashMap::from([
        ("ALPACA_SYMBOL", "QQQ"),
        ("ALPACA_API_KEY_ID", "key"),
        ("ALPACA_API_SECRET_KEY", "secret"),
        ("GOOGLE_SERVICE_ACCOUNT_JSON", "{\"client_email\":\"x\"}"),
    ]);
    env::apply_overrides(&mut settings, |key| vars.get(key).map(|v| v.to_string()))?;

    assert_eq!(settings.alpaca.symbol, "QQQ");
    assert_eq!(settings.strategy.ma_window, 200);
    assert_eq!(settings.alpaca.api_key_id, Some(Secret::new("key")));
    assert!(settings.validate().is_ok());
    Ok(())
}

#[test]
fn test_missing_credentials_are_reported_by_name() {
    let settings = Settings::default();
    let err = settings.validate().unwrap_err();
    assert!(err.to_string().contains("ALPACA_API_KEY_ID"));
    assert_eq!(err.exit_code(), 1);
}

use super::Settings;
use crate::utils::error::{BotError, Result};
use regex::Regex;
use std::path::Path;

/// Loads settings from a TOML file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let content = std::fs::read_to_string(&path).map_err(BotError::IoError)?;
    from_toml_str(&content)
}

/// Parses settings from TOML text. Missing sections keep their defaults.
pub fn from_toml_str(content: &str) -> Result<Settings> {
    let processed_content = substitute_env_vars(content, |name| std::env::var(name).ok());

    toml::from_str(&processed_content).map_err(|e| BotError::ConfigValidationError {
        field: "toml_parsing".to_string(),
        message: format!("TOML parsing error: {}", e),
    })
}

/// Replaces `${VAR}` references with environment values. Unknown names are left as is.
pub fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
    })
    .to_string()
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Token signing error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("{service} API returned {status}: {body}")]
    ApiResponseError {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Spreadsheet '{name}' not found or not shared with the service account")]
    SpreadsheetNotFound { name: String },

    #[error("Worksheet '{name}' not found in spreadsheet {spreadsheet_id}")]
    WorksheetNotFound {
        name: String,
        spreadsheet_id: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Authentication,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BotError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BotError::HttpError(e) if e.is_decode() => ErrorCategory::Data,
            BotError::HttpError(_) => ErrorCategory::Network,
            BotError::ApiResponseError { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            BotError::ApiResponseError { .. } => ErrorCategory::Upstream,
            BotError::AuthError { .. } | BotError::JwtError(_) => ErrorCategory::Authentication,
            BotError::ConfigError { .. }
            | BotError::MissingConfigError { .. }
            | BotError::InvalidConfigValueError { .. }
            | BotError::ConfigValidationError { .. }
            | BotError::SpreadsheetNotFound { .. }
            | BotError::WorksheetNotFound { .. } => ErrorCategory::Configuration,
            BotError::SerializationError(_) | BotError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            BotError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Authentication | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Whether the next scheduled cycle has a reasonable chance of succeeding
    /// without operator action.
    pub fn is_transient(&self) -> bool {
        match self {
            BotError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            BotError::ApiResponseError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BotError::HttpError(e) if e.is_decode() => {
                "The upstream response had an unexpected shape; inspect debug logs".to_string()
            }
            BotError::HttpError(_) => {
                "Check network connectivity; the next cycle will retry automatically".to_string()
            }
            BotError::ApiResponseError { service, status, .. } => match status {
                401 | 403 => format!("Verify the {} credentials and their permissions", service),
                429 => format!("{} is rate limiting; consider a longer refresh interval", service),
                s if *s >= 500 => format!("{} is having trouble; the next cycle will retry", service),
                _ => format!("Check the {} request parameters (symbol, feed, range)", service),
            },
            BotError::AuthError { .. } | BotError::JwtError(_) => {
                "Check GOOGLE_SERVICE_ACCOUNT_JSON contains a valid service account key".to_string()
            }
            BotError::SpreadsheetNotFound { .. } => {
                "Share the spreadsheet with the service account email or set GOOGLE_SHEET_ID"
                    .to_string()
            }
            BotError::WorksheetNotFound { .. } => {
                "Check DASHBOARD_TAB_NAME matches an existing tab".to_string()
            }
            BotError::MissingConfigError { field } => {
                format!("Set {} in the environment or the config file", field)
            }
            BotError::InvalidConfigValueError { field, .. }
            | BotError::ConfigValidationError { field, .. } => {
                format!("Fix the value of {}", field)
            }
            BotError::ConfigError { .. } => "Review the bot configuration".to_string(),
            BotError::SerializationError(_) => {
                "The upstream response had an unexpected shape; inspect debug logs".to_string()
            }
            BotError::ProcessingError { .. } => {
                "Check that the symbol has enough daily bars with close prices".to_string()
            }
            BotError::IoError(_) => "Check file paths and permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::Upstream => format!("A remote service rejected the request: {}", self),
            ErrorCategory::Authentication => format!("Authentication problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Could not compute the trend: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code for single-shot runs.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_auth_failures_are_authentication() {
        let err = BotError::ApiResponseError {
            service: "Alpaca".to_string(),
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(!err.is_transient());
        assert!(err.recovery_suggestion().contains("Alpaca"));
    }

    #[test]
    fn test_server_errors_are_transient() {
        let err = BotError::ApiResponseError {
            service: "Google Sheets".to_string(),
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert!(err.is_transient());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_config_errors_exit_with_one() {
        let err = BotError::MissingConfigError {
            field: "ALPACA_API_KEY_ID".to_string(),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().starts_with("Configuration problem"));
        assert!(err.recovery_suggestion().contains("ALPACA_API_KEY_ID"));
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = BotError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }
}

use crate::presentation::config::{Environment, LoggingSettings};

pub const DEFAULT_FILTER: &str = "info,amr_backend=debug,tower_http=debug";

/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub filter: String,
    pub json_format: bool,
}

impl TracingConfig {
    pub fn from_settings(logging: &LoggingSettings, environment: Environment) -> Self {
        let filter = if logging.level.trim().is_empty() {
            DEFAULT_FILTER.to_string()
        } else {
            logging.level.clone()
        };
        Self {
            environment: environment.to_string(),
            filter,
            json_format: logging.enable_json,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".to_string()),
            filter: DEFAULT_FILTER.to_string(),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
        }
    }
}

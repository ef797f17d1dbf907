//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client configuration, read from `CYCLE_PLANNER_*` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash.
    pub api_url: String,
    /// Upper bound on every outbound call.
    pub request_timeout: Duration,
    /// Location of the local keyed store.
    pub db_path: PathBuf,
    /// URL the app was entered with (inspected for the calendar redirect marker).
    pub start_url: Option<String>,
    /// Directory for rolling log files, if file logging is wanted.
    pub log_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            db_path: PathBuf::from("./data/cycle-planner.db"),
            start_url: None,
            log_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("CYCLE_PLANNER_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_url);

        let request_timeout = match lookup("CYCLE_PLANNER_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "CYCLE_PLANNER_TIMEOUT_SECS".to_string(),
                    message: format!("{raw:?}: {e}"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "CYCLE_PLANNER_TIMEOUT_SECS".to_string(),
                        message: "must be at least 1".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let db_path = lookup("CYCLE_PLANNER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let start_url = lookup("CYCLE_PLANNER_START_URL").filter(|s| !s.trim().is_empty());
        let log_dir = lookup("CYCLE_PLANNER_LOG_DIR").map(PathBuf::from);

        Ok(Self {
            api_url,
            request_timeout,
            db_path,
            start_url,
            log_dir,
        })
    }
}

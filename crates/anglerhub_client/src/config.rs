//! crates/anglerhub_client/src/config.rs
//!
//! Client settings. Defaults suit a local development server; every value can
//! be overridden from the environment.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server origin, without the `/api` prefix.
    pub base_url: String,
    pub request_timeout: Duration,
    /// Where the offline queue document lives.
    pub queue_path: PathBuf,
    /// Wait after connectivity returns before syncing.
    pub settle_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout: Duration::from_secs(30),
            queue_path: PathBuf::from("./anglerhub_offline.json"),
            settle_delay: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Reads `ANGLERHUB_API_URL`, `ANGLERHUB_REQUEST_TIMEOUT_SECS`,
    /// `ANGLERHUB_QUEUE_PATH` and `ANGLERHUB_SYNC_SETTLE_MS`, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_url = std::env::var("ANGLERHUB_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let request_timeout = match std::env::var("ANGLERHUB_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(parse_number("ANGLERHUB_REQUEST_TIMEOUT_SECS", &raw)?),
            Err(_) => defaults.request_timeout,
        };

        let queue_path = std::env::var("ANGLERHUB_QUEUE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.queue_path);

        let settle_delay = match std::env::var("ANGLERHUB_SYNC_SETTLE_MS") {
            Ok(raw) => Duration::from_millis(parse_number("ANGLERHUB_SYNC_SETTLE_MS", &raw)?),
            Err(_) => defaults.settle_delay,
        };

        Ok(Self {
            base_url,
            request_timeout,
            queue_path,
            settle_delay,
        })
    }
}

fn parse_number(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue(var.to_string(), e.to_string()))
}

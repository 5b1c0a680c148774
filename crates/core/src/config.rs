//! Runtime configuration read from `PHARMASYNC_*` environment variables.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_UNDO_WINDOW_SECS,
};
use crate::env_parse_with_default;
use crate::error::CoreError;

/// How failed remote executions count against the retry bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPolicy {
    /// Every failure counts the same; the action is frozen after `max_retries`.
    #[default]
    Uniform,
    /// Permanent rejections (validation, conflict, auth) freeze the action
    /// on the first attempt; transient failures follow the bound.
    Classified,
}

impl RetryPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Uniform => "uniform",
            Self::Classified => "classified",
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "classified" => Ok(Self::Classified),
            other => Err(CoreError::UnknownVariant { kind: "retry policy", value: other.to_owned() }),
        }
    }
}

/// Settings shared by the sync manager, the remote client and the store.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub backend_url: String,
    pub api_key: String,
    pub max_retries: u32,
    pub retry_policy: RetryPolicy,
    pub undo_window: Duration,
    pub request_timeout: Duration,
    pub db_pool_size: u32,
    pub db_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:54321".to_owned(),
            api_key: String::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_policy: RetryPolicy::Uniform,
            undo_window: Duration::from_secs(DEFAULT_UNDO_WINDOW_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            db_pool_size: DEFAULT_DB_POOL_SIZE,
            db_path: default_db_path(),
        }
    }
}

impl SyncConfig {
    /// Build the configuration from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let retry_policy = match std::env::var("PHARMASYNC_RETRY_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "invalid retry policy, using uniform");
                RetryPolicy::Uniform
            }),
            Err(_) => RetryPolicy::Uniform,
        };

        Self {
            backend_url: std::env::var("PHARMASYNC_BACKEND_URL").unwrap_or(defaults.backend_url),
            api_key: std::env::var("PHARMASYNC_API_KEY").unwrap_or_default(),
            max_retries: env_parse_with_default("PHARMASYNC_MAX_RETRY", DEFAULT_MAX_RETRIES).max(1),
            retry_policy,
            undo_window: Duration::from_secs(env_parse_with_default(
                "PHARMASYNC_UNDO_WINDOW_SECS",
                DEFAULT_UNDO_WINDOW_SECS,
            )),
            request_timeout: Duration::from_secs(env_parse_with_default(
                "PHARMASYNC_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            db_pool_size: env_parse_with_default("PHARMASYNC_DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)
                .max(1),
            db_path: std::env::var("PHARMASYNC_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
        }
    }
}

/// `<data dir>/pharmasync/queue.db`, or `./queue.db` when no data dir exists.
#[must_use]
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pharmasync")
        .join("queue.db")
}

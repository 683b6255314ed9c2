//! Configuration for the sidecar operator.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sidecar_reconcile::{
    ObjectKey, DEFAULT_MAX_RETRIES, DEFAULT_RESYNC_INTERVAL, DEFAULT_RETRY_WINDOW,
};

/// Sidecar operator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key of the single desired-state object this operator manages.
    pub policy: ObjectKey,

    /// Seconds between periodic resyncs.
    pub resync_interval_secs: u64,

    /// Retries per trigger within the retry window.
    pub max_retries: u32,

    /// Retry window in seconds.
    pub retry_window_secs: u64,

    /// JSON file seeding the in-memory stores.
    pub seed_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let policy = lookup("SIDECAR_POLICY")
            .unwrap_or_else(|| "default/sidecar".to_string())
            .parse::<ObjectKey>()
            .context("invalid SIDECAR_POLICY")?;

        let resync_interval_secs = lookup("SIDECAR_RESYNC_INTERVAL")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_RESYNC_INTERVAL.as_secs());

        let max_retries = lookup("SIDECAR_MAX_RETRIES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let retry_window_secs = lookup("SIDECAR_RETRY_WINDOW")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_WINDOW.as_secs());

        let seed_file = lookup("SIDECAR_SEED_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let log_level = lookup("SIDECAR_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            policy,
            resync_interval_secs,
            max_retries,
            retry_window_secs,
            seed_file,
            log_level,
        })
    }
}

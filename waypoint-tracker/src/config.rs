//! Tracker configuration
//!
//! Selects the progress store and its retention policy. Binaries load it
//! from the environment and may override fields from command-line flags.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{FileStore, MemoryStore, ProgressStore};

/// Which store backs the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "file" => Ok(StoreKind::File),
            other => anyhow::bail!("unknown store kind '{}' (expected memory or file)", other),
        }
    }
}

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Store implementation to use
    pub store: StoreKind,

    /// Directory of the file store
    pub store_dir: PathBuf,

    /// How long records live after their last update; `None` keeps them forever
    pub retention: Option<Duration>,

    /// How often long-running services drop expired records and contexts
    pub sweep_interval: Duration,
}

impl Config {
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
    pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

    /// Creates a configuration with defaults
    pub fn new() -> Self {
        Self {
            store: StoreKind::Memory,
            store_dir: PathBuf::from(".waypoint"),
            retention: Some(Self::DEFAULT_RETENTION),
            sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - WAYPOINT_STORE (optional, memory | file, default: memory)
    /// - WAYPOINT_STORE_DIR (optional, default: .waypoint)
    /// - WAYPOINT_RETENTION_SECS (optional, default: 86400, 0 disables expiry)
    /// - WAYPOINT_SWEEP_INTERVAL_SECS (optional, default: 60)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Creates configuration from any variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new();

        if let Some(kind) = var("WAYPOINT_STORE") {
            config.store = kind.parse().context("Invalid WAYPOINT_STORE")?;
        }

        if let Some(dir) = var("WAYPOINT_STORE_DIR") {
            config.store_dir = PathBuf::from(dir);
        }

        if let Some(secs) = var("WAYPOINT_RETENTION_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .context("WAYPOINT_RETENTION_SECS must be a whole number of seconds")?;
            config.retention = retention_from_secs(secs);
        }

        if let Some(secs) = var("WAYPOINT_SWEEP_INTERVAL_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .context("WAYPOINT_SWEEP_INTERVAL_SECS must be a whole number of seconds")?;
            config.sweep_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.store == StoreKind::File && self.store_dir.as_os_str().is_empty() {
            anyhow::bail!("store_dir cannot be empty for the file store");
        }

        if self.sweep_interval.is_zero() {
            anyhow::bail!("sweep_interval must be greater than 0");
        }

        Ok(())
    }

    /// Opens the configured store
    pub async fn open_store(&self) -> Result<Arc<dyn ProgressStore>> {
        let store: Arc<dyn ProgressStore> = match self.store {
            StoreKind::Memory => Arc::new(MemoryStore::new().with_retention(self.retention)),
            StoreKind::File => Arc::new(
                FileStore::open(&self.store_dir)
                    .await
                    .with_context(|| {
                        format!("Failed to open store at {}", self.store_dir.display())
                    })?
                    .with_retention(self.retention),
            ),
        };
        Ok(store)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a retention in seconds, where 0 means "never expire"
pub fn retention_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

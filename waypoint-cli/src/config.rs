//! Configuration module
//!
//! Maps CLI settings onto the tracker's store configuration.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use waypoint_tracker::ProgressStore;
use waypoint_tracker::config::{Config as TrackerConfig, StoreKind, retention_from_secs};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of the file store shared with job drivers
    pub store_dir: PathBuf,
    /// Record retention in seconds, 0 disables expiry
    pub retention_secs: u64,
}

impl Config {
    /// Store configuration the commands run against
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            store: StoreKind::File,
            store_dir: self.store_dir.clone(),
            retention: retention_from_secs(self.retention_secs),
            ..TrackerConfig::new()
        }
    }

    /// Opens the file store
    pub async fn open_store(&self) -> Result<Arc<dyn ProgressStore>> {
        let config = self.tracker_config();
        config.validate()?;
        config.open_store().await
    }
}

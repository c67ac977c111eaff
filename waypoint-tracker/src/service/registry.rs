//! Registry service
//!
//! Read side of progress tracking. Lookups go straight to the store and hand
//! out owned snapshots, so readers never coordinate with the tracker.

use chrono::Utc;
use std::sync::Arc;
use waypoint_core::dto::progress::ProgressSnapshot;

use crate::error::Result;
use crate::store::ProgressStore;

/// Read-only access to job progress
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn ProgressStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Snapshot of one job
    ///
    /// Unknown and expired jobs both come back as `None`.
    pub async fn lookup(&self, job_id: &str) -> Result<Option<ProgressSnapshot>> {
        let record = self.store.get(job_id).await?;
        let now = Utc::now();
        Ok(record.map(|r| ProgressSnapshot::at(&r, now)))
    }

    /// Snapshots of every live job, newest first
    pub async fn list(&self) -> Result<Vec<ProgressSnapshot>> {
        let now = Utc::now();
        let mut snapshots: Vec<ProgressSnapshot> = self
            .store
            .list()
            .await?
            .iter()
            .map(|r| ProgressSnapshot::at(r, now))
            .collect();
        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(snapshots)
    }

    /// Snapshots of jobs that have not reached a terminal status
    pub async fn list_active(&self) -> Result<Vec<ProgressSnapshot>> {
        let mut snapshots = self.list().await?;
        snapshots.retain(|s| !s.is_terminal());
        Ok(snapshots)
    }
}

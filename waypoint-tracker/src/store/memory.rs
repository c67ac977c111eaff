//! In-memory progress store
//!
//! Process-local map of records, shared by cloning. Useful for tests and for
//! services where progress does not need to outlive the process.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use waypoint_core::domain::progress::ProgressRecord;

use super::{ProgressStore, StoreResult, is_expired};

/// In-memory implementation of ProgressStore
///
/// Uses Arc<RwLock<HashMap>> so clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, ProgressRecord>>>,
    retention: Option<Duration>,
}

impl MemoryStore {
    /// Creates an empty store that never expires records
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires records whose last write is older than `retention`
    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> Option<Duration> {
        self.retention
    }

    /// Number of records held, expired or not
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get(&self, job_id: &str) -> StoreResult<Option<ProgressRecord>> {
        let records = self.records.read().await;
        let now = Utc::now();
        Ok(records
            .get(job_id)
            .filter(|r| !is_expired(r.updated_at, self.retention, now))
            .cloned())
    }

    async fn set(&self, record: &ProgressRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        records.insert(record.job_id.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, job_id: &str) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        Ok(records.remove(job_id).is_some())
    }

    async fn list(&self) -> StoreResult<Vec<ProgressRecord>> {
        let records = self.records.read().await;
        let now = Utc::now();
        Ok(records
            .values()
            .filter(|r| !is_expired(r.updated_at, self.retention, now))
            .cloned()
            .collect())
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let before = records.len();
        records.retain(|_, r| !is_expired(r.updated_at, self.retention, now));
        Ok(before - records.len())
    }
}

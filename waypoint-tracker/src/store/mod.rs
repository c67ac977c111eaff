//! Progress store layer
//!
//! Stores are thin key-value adapters keyed by job id holding whole
//! `ProgressRecord`s. The tracker only needs `get` and `set`; `list` and
//! `remove` serve readers and housekeeping. Expiry is a store policy: an
//! expired record is simply absent.
//!
//! All stores are trait-based so the tracker can run against memory, files
//! or a database without changes.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use waypoint_core::domain::progress::ProgressRecord;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by progress stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem or socket failure
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record could not be encoded or decoded
    #[error("Failed to encode progress record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend specific failure (e.g. database errors)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Key-value store for progress records
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Fetches the record of `job_id`, or `None` if unknown or expired
    async fn get(&self, job_id: &str) -> StoreResult<Option<ProgressRecord>>;

    /// Writes the whole record, replacing any previous version
    ///
    /// One call is one atomic write: readers see either the old or the new
    /// record, never a mix.
    async fn set(&self, record: &ProgressRecord) -> StoreResult<()>;

    /// Deletes the record of `job_id`; returns whether one existed
    async fn remove(&self, job_id: &str) -> StoreResult<bool>;

    /// Returns every live record, in no particular order
    async fn list(&self) -> StoreResult<Vec<ProgressRecord>>;

    /// Drops expired records; returns how many were removed
    async fn purge_expired(&self) -> StoreResult<usize> {
        Ok(0)
    }
}

/// Whether a record last written at `updated_at` is past `retention` at `now`
pub fn is_expired(
    updated_at: DateTime<Utc>,
    retention: Option<Duration>,
    now: DateTime<Utc>,
) -> bool {
    let Some(retention) = retention else {
        return false;
    };
    match chrono::Duration::from_std(retention) {
        Ok(retention) => now.signed_duration_since(updated_at) > retention,
        Err(_) => false,
    }
}

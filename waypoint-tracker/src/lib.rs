//! Waypoint Tracker
//!
//! Progress tracking for long-running, multi-step jobs.
//!
//! A job driver registers a job with its step catalog and then reports free
//! text status messages through the [`Tracker`]. Every update is classified
//! onto the catalog, applied to the job's progress record and persisted to a
//! [`ProgressStore`]. Readers poll snapshots through the [`Registry`] without
//! taking part in the job.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use waypoint_core::domain::catalog::StepCatalog;
//! use waypoint_tracker::{MemoryStore, Registry, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let tracker = Tracker::new(store.clone());
//!     let registry = Registry::new(store);
//!
//!     let catalog = StepCatalog::from_names(["fetch", "analyze", "report"])?;
//!     let job = tracker.register("job1", catalog).await?;
//!     job.advance("starting fetch").await?;
//!
//!     let snapshot = registry.lookup("job1").await?.expect("job is tracked");
//!     println!("{}%", snapshot.progress_percentage);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use error::{Result, TrackerError};
pub use service::{JobHandle, MAX_JOB_ID_LEN, Registry, Tracker};
pub use store::{FileStore, MemoryStore, ProgressStore, StoreError, StoreResult};

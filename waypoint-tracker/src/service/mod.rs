//! Service layer
//!
//! Business logic of progress tracking: the tracker mutates and persists
//! records for job drivers, the registry serves snapshots to readers.

mod registry;
mod tracker;

pub use registry::Registry;
pub use tracker::{JobHandle, MAX_JOB_ID_LEN, Tracker};

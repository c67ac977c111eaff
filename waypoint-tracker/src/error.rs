//! Error types for the tracker

use thiserror::Error;
use waypoint_core::ConfigurationError;
use waypoint_core::domain::progress::JobStatus;

use crate::store::StoreError;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur when tracking or reading job progress
///
/// A lookup that finds nothing is not an error; it is `Ok(None)`.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The step catalog is unusable for this job
    #[error("Invalid step catalog: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Job id is blank or too long to store
    #[error("Invalid job id: '{0}'")]
    InvalidJobId(String),

    /// Update for a job that was never registered
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// The job already has a creation context in this tracker
    #[error("Job already registered: {0}")]
    AlreadyRegistered(String),

    /// Mutation attempted after the job reached a terminal status
    #[error("Job {job_id} is already {status}")]
    JobAlreadyTerminal {
        /// Job identifier
        job_id: String,
        /// Terminal status the job ended in
        status: JobStatus,
    },

    /// The progress store could not be read or written
    #[error("Progress storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}

impl TrackerError {
    pub(crate) fn already_terminal(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self::JobAlreadyTerminal {
            job_id: job_id.into(),
            status,
        }
    }

    /// Check if this error is caused by the caller rather than the store
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::StorageUnavailable(_))
    }
}

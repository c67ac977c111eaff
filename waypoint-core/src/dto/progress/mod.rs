//! Progress snapshot DTOs for readers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::progress::{JobStatus, ProgressRecord, StepTiming};

/// Immutable copy of a job's progress as seen by a reader
///
/// Time-derived fields (`elapsed_seconds`, `remaining_seconds`) are computed
/// when the snapshot is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub current_step_index: usize,
    pub total_steps: usize,
    pub current_step_name: String,
    pub current_step_description: String,
    pub progress_percentage: u8,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub step_started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: f64,
    pub step_elapsed_seconds: f64,
    pub remaining_seconds: f64,
    pub estimated_total_seconds: f64,
    pub step_history: Vec<StepTiming>,
    pub result: Option<serde_json::Value>,
}

impl ProgressSnapshot {
    /// Takes a snapshot of `record` as seen at `now`
    pub fn at(record: &ProgressRecord, now: DateTime<Utc>) -> Self {
        Self {
            job_id: record.job_id.clone(),
            status: record.status,
            current_step_index: record.current_step_index,
            total_steps: record.total_steps,
            current_step_name: record.current_step_name.clone(),
            current_step_description: record.current_step_description.clone(),
            progress_percentage: record.progress_percentage(),
            last_message: record.last_message.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            step_started_at: record.step_started_at,
            completed_at: record.completed_at,
            elapsed_seconds: record.elapsed_seconds_at(now),
            step_elapsed_seconds: record.step_elapsed_seconds_at(now),
            remaining_seconds: record.remaining_seconds_at(now),
            estimated_total_seconds: record.estimated_total_seconds,
            step_history: record.step_history.clone(),
            result: record.result.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<ProgressRecord> for ProgressSnapshot {
    fn from(record: ProgressRecord) -> Self {
        Self::at(&record, Utc::now())
    }
}

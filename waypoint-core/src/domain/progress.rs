//! Progress record domain types
//!
//! A `ProgressRecord` is the whole tracking state of one job. It is created
//! on the job's first update, mutated only by the tracker and persisted as a
//! unit after every update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::catalog::StepCatalog;

/// Job tracking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs accept no further updates
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome supplied by the job driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Completed,
    Failed,
}

impl From<Terminal> for JobStatus {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Completed => JobStatus::Completed,
            Terminal::Failed => JobStatus::Failed,
        }
    }
}

/// Time spent in one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    pub index: usize,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

impl StepTiming {
    fn open(index: usize, name: &str, now: DateTime<Utc>) -> Self {
        Self {
            index,
            name: name.to_string(),
            started_at: now,
            finished_at: None,
            duration_seconds: None,
        }
    }

    fn close(&mut self, now: DateTime<Utc>) {
        if self.finished_at.is_none() {
            self.finished_at = Some(now);
            self.duration_seconds = Some(seconds_between(self.started_at, now));
        }
    }
}

/// Outcome of offering a classified step index to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMove {
    Advanced { from: usize, to: usize },
    Unchanged,
    /// The classified step lies behind the current one and was ignored
    Regressed { current: usize, classified: usize },
}

/// Tracking state of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub current_step_index: usize,
    pub total_steps: usize,
    pub current_step_name: String,
    pub current_step_description: String,
    pub last_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub step_started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds since creation as of `updated_at`; frozen once terminal
    pub elapsed_seconds: f64,
    pub estimated_total_seconds: f64,
    pub step_history: Vec<StepTiming>,
    pub result: Option<serde_json::Value>,
}

impl ProgressRecord {
    /// Creates a pending record positioned on the first step of `catalog`
    pub fn new(job_id: impl Into<String>, catalog: &StepCatalog, now: DateTime<Utc>) -> Self {
        let (name, description) = catalog
            .get(0)
            .map(|s| (s.name.clone(), s.description.clone()))
            .unwrap_or_default();

        Self {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            current_step_index: 0,
            total_steps: catalog.len(),
            current_step_name: name,
            current_step_description: description,
            last_message: String::new(),
            created_at: now,
            updated_at: now,
            step_started_at: now,
            completed_at: None,
            elapsed_seconds: 0.0,
            estimated_total_seconds: catalog.estimated_total_seconds(),
            step_history: Vec::new(),
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending -> Running; opens the timing entry of the current step
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.status != JobStatus::Pending {
            return;
        }
        self.status = JobStatus::Running;
        self.step_started_at = now;
        self.step_history.push(StepTiming::open(
            self.current_step_index,
            &self.current_step_name,
            now,
        ));
    }

    /// Moves forward to `index` if it lies ahead of the current step
    ///
    /// The step index never decreases; a lower index is reported back as
    /// `StepMove::Regressed` and leaves the record untouched.
    pub fn observe_step(
        &mut self,
        index: usize,
        catalog: &StepCatalog,
        now: DateTime<Utc>,
    ) -> StepMove {
        let current = self.current_step_index;
        if index < current {
            return StepMove::Regressed {
                current,
                classified: index,
            };
        }
        if index == current {
            return StepMove::Unchanged;
        }
        let Some(step) = catalog.get(index) else {
            return StepMove::Unchanged;
        };

        if let Some(open) = self.step_history.last_mut() {
            open.close(now);
        }
        self.current_step_index = index;
        self.current_step_name = step.name.clone();
        self.current_step_description = step.description.clone();
        self.step_started_at = now;
        self.step_history
            .push(StepTiming::open(index, &step.name, now));

        StepMove::Advanced {
            from: current,
            to: index,
        }
    }

    /// Records the latest raw message and refreshes the running clock
    pub fn touch(&mut self, message: &str, now: DateTime<Utc>) {
        self.last_message = message.to_string();
        self.updated_at = now;
        if !self.is_terminal() {
            self.elapsed_seconds = seconds_between(self.created_at, now);
        }
    }

    /// Moves the record into a terminal state and freezes its clock
    ///
    /// A completed job always ends on the last step.
    pub fn finish(&mut self, terminal: Terminal, catalog: &StepCatalog, now: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        if terminal == Terminal::Completed && !catalog.is_empty() {
            self.observe_step(catalog.last_index(), catalog, now);
        }
        if let Some(open) = self.step_history.last_mut() {
            open.close(now);
        }
        self.status = terminal.into();
        self.updated_at = now;
        self.completed_at = Some(now);
        self.elapsed_seconds = seconds_between(self.created_at, now);
    }

    /// Percentage of steps reached, counting the current one
    pub fn progress_percentage(&self) -> u8 {
        progress_percentage(self.current_step_index, self.total_steps)
    }

    /// Elapsed seconds as seen at `now`; terminal records report the frozen value
    pub fn elapsed_seconds_at(&self, now: DateTime<Utc>) -> f64 {
        if self.is_terminal() {
            self.elapsed_seconds
        } else {
            seconds_between(self.created_at, now)
        }
    }

    /// Estimated seconds left as seen at `now`
    pub fn remaining_seconds_at(&self, now: DateTime<Utc>) -> f64 {
        if self.is_terminal() {
            return 0.0;
        }
        (self.estimated_total_seconds - self.elapsed_seconds_at(now)).max(0.0)
    }

    /// Seconds spent in the current step as seen at `now`
    pub fn step_elapsed_seconds_at(&self, now: DateTime<Utc>) -> f64 {
        let until = self.completed_at.unwrap_or(now);
        seconds_between(self.step_started_at, until)
    }
}

/// `round(100 * (index + 1) / total)`, clamped to `[0, 100]`
pub fn progress_percentage(current_step_index: usize, total_steps: usize) -> u8 {
    if total_steps == 0 {
        return 0;
    }
    let pct = 100.0 * (current_step_index as f64 + 1.0) / total_steps as f64;
    pct.round().clamp(0.0, 100.0) as u8
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = to.signed_duration_since(from).num_milliseconds();
    (millis as f64 / 1000.0).max(0.0)
}

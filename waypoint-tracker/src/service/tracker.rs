//! Tracker service
//!
//! The mutation side of progress tracking. Job drivers register a job with its
//! step catalog, then report status messages; each update is classified,
//! applied to the job's record and persisted with a single store write.
//!
//! Locking is per job: the tracker-wide map is only held to look up a job's
//! slot, so a slow store write for one job never blocks another job.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use waypoint_core::ConfigurationError;
use waypoint_core::classifier::matching_rule;
use waypoint_core::domain::catalog::StepCatalog;
use waypoint_core::domain::progress::{JobStatus, ProgressRecord, StepMove, Terminal};

use crate::error::{Result, TrackerError};
use crate::store::ProgressStore;

/// Longest accepted job id, in bytes
pub const MAX_JOB_ID_LEN: usize = 128;

/// Creation context and last persisted record of one job
struct JobSlot {
    catalog: StepCatalog,
    record: Mutex<Option<ProgressRecord>>,
}

/// Service accepting progress updates from job drivers
///
/// Cloning is cheap; clones share registrations and the store.
#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn ProgressStore>,
    jobs: Arc<RwLock<HashMap<String, Arc<JobSlot>>>>,
}

impl Tracker {
    /// Creates a tracker persisting to `store`
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers the creation context of a job
    ///
    /// Nothing is persisted until the first update. If the store already
    /// holds a record for `job_id` the job resumes from it, provided the
    /// catalog has the same number of steps and the job is not terminal.
    /// Ids must be non-blank and at most [`MAX_JOB_ID_LEN`] bytes.
    pub async fn register(
        &self,
        job_id: impl Into<String>,
        catalog: StepCatalog,
    ) -> Result<JobHandle> {
        let job_id = job_id.into();
        if job_id.trim().is_empty() || job_id.len() > MAX_JOB_ID_LEN {
            return Err(TrackerError::InvalidJobId(job_id));
        }

        let existing = self.store.get(&job_id).await?;
        if let Some(record) = &existing {
            if record.is_terminal() {
                return Err(TrackerError::already_terminal(&job_id, record.status));
            }
            if record.total_steps != catalog.len() {
                return Err(ConfigurationError::CatalogMismatch {
                    expected: record.total_steps,
                    actual: catalog.len(),
                }
                .into());
            }
        }

        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job_id) {
            return Err(TrackerError::AlreadyRegistered(job_id));
        }

        match &existing {
            Some(record) => info!(
                "Resuming job {} at step {}/{}",
                job_id,
                record.current_step_index + 1,
                record.total_steps
            ),
            None => info!("Registered job {} with {} steps", job_id, catalog.len()),
        }

        jobs.insert(
            job_id.clone(),
            Arc::new(JobSlot {
                catalog,
                record: Mutex::new(existing),
            }),
        );

        Ok(JobHandle {
            tracker: self.clone(),
            job_id,
        })
    }

    /// Reports a status message for a job
    ///
    /// The message is classified onto the job's catalog; a step ahead of the
    /// current one advances the job, anything else only refreshes
    /// `last_message`. Passing `terminal` ends the job.
    pub async fn update(
        &self,
        job_id: &str,
        message: &str,
        terminal: Option<Terminal>,
    ) -> Result<()> {
        self.apply(job_id, message, terminal, None).await
    }

    /// Marks a job completed, storing its final output
    pub async fn complete(
        &self,
        job_id: &str,
        message: &str,
        result: Option<serde_json::Value>,
    ) -> Result<()> {
        self.apply(job_id, message, Some(Terminal::Completed), result)
            .await
    }

    /// Marks a job failed at its current step
    pub async fn fail(&self, job_id: &str, message: &str) -> Result<()> {
        self.apply(job_id, message, Some(Terminal::Failed), None)
            .await
    }

    /// Drops the creation context of a terminal job
    ///
    /// Returns false if the job is unknown or still in progress.
    pub async fn release(&self, job_id: &str) -> bool {
        let Some(slot) = self.slot(job_id).await else {
            return false;
        };

        let finished = slot
            .record
            .lock()
            .await
            .as_ref()
            .is_some_and(ProgressRecord::is_terminal);
        if finished && self.remove_slot(job_id, &slot).await {
            debug!("Released job {}", job_id);
        }
        finished
    }

    /// Drops the contexts of jobs whose stored record has expired
    ///
    /// Jobs that were registered but never updated have nothing stored yet
    /// and are kept. Returns how many contexts were dropped.
    pub async fn evict_expired(&self) -> Result<usize> {
        let slots: Vec<(String, Arc<JobSlot>)> = self
            .jobs
            .read()
            .await
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect();

        let mut evicted = 0;
        for (job_id, slot) in slots {
            // Held until the slot is gone so no update slips in between
            let record = slot.record.lock().await;
            if record.is_none() || self.store.get(&job_id).await?.is_some() {
                continue;
            }
            if self.remove_slot(&job_id, &slot).await {
                info!("Evicted expired job {}", job_id);
                evicted += 1;
            }
        }
        Ok(evicted)
    }

    /// Whether `job_id` has a creation context in this tracker
    pub async fn is_registered(&self, job_id: &str) -> bool {
        self.jobs.read().await.contains_key(job_id)
    }

    /// Handle for a registered job
    pub async fn handle(&self, job_id: &str) -> Option<JobHandle> {
        self.is_registered(job_id).await.then(|| JobHandle {
            tracker: self.clone(),
            job_id: job_id.to_string(),
        })
    }

    async fn slot(&self, job_id: &str) -> Option<Arc<JobSlot>> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Removes `slot` unless the id has been registered again meanwhile
    async fn remove_slot(&self, job_id: &str, slot: &Arc<JobSlot>) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get(job_id) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                jobs.remove(job_id);
                true
            }
            _ => false,
        }
    }

    /// Error for an update without creation context
    async fn missing_context(&self, job_id: &str) -> TrackerError {
        match self.store.get(job_id).await {
            Ok(Some(record)) if record.is_terminal() => {
                TrackerError::already_terminal(job_id, record.status)
            }
            Ok(_) => TrackerError::UnknownJob(job_id.to_string()),
            Err(e) => e.into(),
        }
    }

    async fn apply(
        &self,
        job_id: &str,
        message: &str,
        terminal: Option<Terminal>,
        result: Option<serde_json::Value>,
    ) -> Result<()> {
        let Some(slot) = self.slot(job_id).await else {
            let err = self.missing_context(job_id).await;
            warn!("Rejected update for job {}: {}", job_id, err);
            return Err(err);
        };

        let mut current = slot.record.lock().await;
        let now = Utc::now();

        let mut record = match current.as_ref() {
            Some(record) if record.is_terminal() => {
                return Err(TrackerError::already_terminal(job_id, record.status));
            }
            Some(record) => record.clone(),
            None => ProgressRecord::new(job_id, &slot.catalog, now),
        };

        if record.status == JobStatus::Pending {
            record.start(now);
            info!("Job {} started", job_id);
        }

        match matching_rule(message, &slot.catalog) {
            Some((index, pattern)) => {
                debug!(
                    "Job {}: message matched step {} via {:?}",
                    job_id, index, pattern
                );
                match record.observe_step(index, &slot.catalog, now) {
                    StepMove::Advanced { from, to } => info!(
                        "Job {} advanced from step {} to {} ({})",
                        job_id, from, to, record.current_step_name
                    ),
                    StepMove::Unchanged => {}
                    StepMove::Regressed {
                        current,
                        classified,
                    } => warn!(
                        "Job {}: ignoring step {} behind current step {}",
                        job_id, classified, current
                    ),
                }
            }
            None => debug!("Job {}: no step matched message", job_id),
        }

        record.touch(message, now);

        if let Some(terminal) = terminal {
            record.finish(terminal, &slot.catalog, now);
            if result.is_some() {
                record.result = result;
            }
            info!(
                "Job {} {} after {:.1}s",
                job_id, record.status, record.elapsed_seconds
            );
        }

        if let Err(e) = self.store.set(&record).await {
            error!("Failed to persist progress of job {}: {}", job_id, e);
            return Err(e.into());
        }

        *current = Some(record);
        Ok(())
    }
}

/// Handle bound to one registered job
///
/// Cheap to clone; hand it to the job driver instead of passing ids around.
#[derive(Clone)]
pub struct JobHandle {
    tracker: Tracker,
    job_id: String,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub async fn update(&self, message: &str, terminal: Option<Terminal>) -> Result<()> {
        self.tracker.update(&self.job_id, message, terminal).await
    }

    /// Reports a non-terminal status message
    pub async fn advance(&self, message: &str) -> Result<()> {
        self.update(message, None).await
    }

    pub async fn complete(&self, message: &str, result: Option<serde_json::Value>) -> Result<()> {
        self.tracker.complete(&self.job_id, message, result).await
    }

    pub async fn fail(&self, message: &str) -> Result<()> {
        self.tracker.fail(&self.job_id, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn scenario_catalog() -> StepCatalog {
        StepCatalog::from_names(["fetch", "analyze", "report"]).unwrap()
    }

    fn tracker() -> (Tracker, MemoryStore) {
        let store = MemoryStore::new();
        (Tracker::new(Arc::new(store.clone())), store)
    }

    /// Store wrapper whose writes can be switched off
    struct FlakyStore {
        inner: MemoryStore,
        down: AtomicBool,
    }

    #[async_trait]
    impl ProgressStore for FlakyStore {
        async fn get(&self, job_id: &str) -> StoreResult<Option<ProgressRecord>> {
            self.inner.get(job_id).await
        }

        async fn set(&self, record: &ProgressRecord) -> StoreResult<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("connection refused".into()));
            }
            self.inner.set(record).await
        }

        async fn remove(&self, job_id: &str) -> StoreResult<bool> {
            self.inner.remove(job_id).await
        }

        async fn list(&self) -> StoreResult<Vec<ProgressRecord>> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_register_does_not_persist() {
        let (tracker, store) = tracker();
        tracker.register("job1", scenario_catalog()).await.unwrap();

        assert!(store.get("job1").await.unwrap().is_none());
        assert!(tracker.is_registered("job1").await);
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        let (tracker, _) = tracker();
        tracker.register("job1", scenario_catalog()).await.unwrap();

        let err = tracker
            .register("job1", scenario_catalog())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TrackerError::AlreadyRegistered(id) if id == "job1"));
    }

    #[tokio::test]
    async fn test_first_update_creates_running_record() {
        let (tracker, store) = tracker();
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("warming up").await.unwrap();

        let record = store.get("job1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Running);
        assert_eq!(record.current_step_index, 0);
        assert_eq!(record.last_message, "warming up");
        assert_eq!(record.step_history.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_job_fails() {
        let (tracker, _) = tracker();
        let err = tracker.update("ghost", "hello", None).await.err().unwrap();
        assert!(matches!(err, TrackerError::UnknownJob(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_regressing_message_is_ignored() {
        let (tracker, store) = tracker();
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("report draft").await.unwrap();
        job.advance("fetch more").await.unwrap();

        let record = store.get("job1").await.unwrap().unwrap();
        assert_eq!(record.current_step_index, 2);
        assert_eq!(record.last_message, "fetch more");
    }

    #[tokio::test]
    async fn test_repeated_step_only_touches_message() {
        let (tracker, store) = tracker();
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("now analyze data").await.unwrap();
        let first = store.get("job1").await.unwrap().unwrap();

        job.advance("still analyze data").await.unwrap();
        let second = store.get("job1").await.unwrap().unwrap();

        assert_eq!(second.current_step_index, first.current_step_index);
        assert_eq!(second.step_started_at, first.step_started_at);
        assert_eq!(second.step_history, first.step_history);
        assert_eq!(second.last_message, "still analyze data");
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_complete_stores_result_and_blocks_updates() {
        let (tracker, store) = tracker();
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("starting fetch").await.unwrap();
        job.complete("done", Some(serde_json::json!({"decision": "buy"})))
            .await
            .unwrap();

        let record = store.get("job1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.current_step_index, 2);
        assert_eq!(record.result, Some(serde_json::json!({"decision": "buy"})));

        let err = job.advance("anything").await.err().unwrap();
        assert!(matches!(
            err,
            TrackerError::JobAlreadyTerminal {
                status: JobStatus::Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fail_keeps_current_step() {
        let (tracker, store) = tracker();
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("now analyze data").await.unwrap();
        job.fail("model quota exceeded").await.unwrap();

        let record = store.get("job1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.current_step_index, 1);
        assert_eq!(record.last_message, "model quota exceeded");
    }

    #[tokio::test]
    async fn test_release_only_drops_terminal_jobs() {
        let (tracker, _) = tracker();
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("starting fetch").await.unwrap();
        assert!(!tracker.release("job1").await);

        job.complete("report ready", None).await.unwrap();
        assert!(tracker.release("job1").await);
        assert!(!tracker.is_registered("job1").await);

        // The stored record still marks the job as finished
        let err = tracker.update("job1", "again", None).await.err().unwrap();
        assert!(matches!(err, TrackerError::JobAlreadyTerminal { .. }));

        let err = tracker
            .register("job1", scenario_catalog())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TrackerError::JobAlreadyTerminal { .. }));
    }

    #[tokio::test]
    async fn test_register_rejects_unusable_ids() {
        let (tracker, _) = tracker();

        for id in [String::new(), "   ".to_string(), "x".repeat(MAX_JOB_ID_LEN + 1)] {
            let err = tracker
                .register(id.clone(), scenario_catalog())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, TrackerError::InvalidJobId(ref bad) if *bad == id));
            assert!(!tracker.is_registered(&id).await);
        }

        let longest = "x".repeat(MAX_JOB_ID_LEN);
        assert!(tracker.register(longest, scenario_catalog()).await.is_ok());
    }

    #[tokio::test]
    async fn test_release_does_not_block_other_jobs() {
        let (tracker, _) = tracker();
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("starting fetch").await.unwrap();
        let other = tracker.register("job2", scenario_catalog()).await.unwrap();

        // An update of job1 is in flight while job1 is being released
        let slot = tracker.slot("job1").await.unwrap();
        let guard = slot.record.lock().await;
        let releasing = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.release("job1").await }
        });
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            other.advance("starting fetch"),
        )
        .await
        .expect("job2 update stalled behind job1")
        .unwrap();

        drop(guard);
        assert!(!releasing.await.unwrap());
        assert!(tracker.is_registered("job1").await);
    }

    #[tokio::test]
    async fn test_expired_jobs_free_context_and_memory() {
        let store = MemoryStore::new().with_retention(Some(std::time::Duration::ZERO));
        let tracker = Tracker::new(Arc::new(store.clone()));

        for i in 0..20 {
            let job = tracker
                .register(format!("job{}", i), scenario_catalog())
                .await
                .unwrap();
            job.advance("starting fetch").await.unwrap();
        }
        // Registered but never updated; nothing stored to expire yet
        tracker.register("idle", scenario_catalog()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(tracker.evict_expired().await.unwrap(), 20);
        assert_eq!(store.purge_expired().await.unwrap(), 20);
        assert_eq!(store.len().await, 0);

        assert!(!tracker.is_registered("job0").await);
        assert!(tracker.is_registered("idle").await);
        let err = tracker.update("job0", "late", None).await.err().unwrap();
        assert!(matches!(err, TrackerError::UnknownJob(_)));
    }

    #[tokio::test]
    async fn test_register_resumes_stored_job() {
        let store = MemoryStore::new();
        let first = Tracker::new(Arc::new(store.clone()));
        first
            .register("job1", scenario_catalog())
            .await
            .unwrap()
            .advance("now analyze data")
            .await
            .unwrap();

        // A new process picks the job up where it stopped
        let second = Tracker::new(Arc::new(store.clone()));
        let job = second.register("job1", scenario_catalog()).await.unwrap();
        job.advance("fetch again").await.unwrap();

        let record = store.get("job1").await.unwrap().unwrap();
        assert_eq!(record.current_step_index, 1);
        assert_eq!(record.step_history.len(), 2);

        let err = Tracker::new(Arc::new(store.clone()))
            .register("job1", StepCatalog::from_names(["a", "b"]).unwrap())
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            TrackerError::Configuration(ConfigurationError::CatalogMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_state_unchanged() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            down: AtomicBool::new(false),
        });
        let tracker = Tracker::new(store.clone());
        let job = tracker.register("job1", scenario_catalog()).await.unwrap();
        job.advance("starting fetch").await.unwrap();

        store.down.store(true, Ordering::SeqCst);
        let err = job.advance("now analyze data").await.err().unwrap();
        assert!(matches!(err, TrackerError::StorageUnavailable(_)));
        assert!(!err.is_caller_error());

        store.down.store(false, Ordering::SeqCst);
        let record = store.get("job1").await.unwrap().unwrap();
        assert_eq!(record.current_step_index, 0);

        // A failed write is not a terminal transition; the job goes on
        job.complete("report ready", None).await.unwrap();
        let record = store.get("job1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_jobs_update_concurrently() {
        let (tracker, store) = tracker();
        let mut tasks = Vec::new();
        for i in 0..8 {
            let job = tracker
                .register(format!("job{}", i), scenario_catalog())
                .await
                .unwrap();
            tasks.push(tokio::spawn(async move {
                job.advance("starting fetch").await?;
                job.advance("now analyze data").await?;
                job.complete("report ready", None).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 8);
        assert!(records.iter().all(|r| r.status == JobStatus::Completed));
    }
}

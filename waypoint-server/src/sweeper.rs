//! Expiry Sweeper
//!
//! Periodically drops expired progress records from the store and the
//! contexts of their jobs from the tracker. Abandoned jobs stay `running`
//! until retention expires them; this is what frees them afterwards.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use waypoint_tracker::{ProgressStore, Tracker};

/// Counts from one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub purged_records: usize,
    pub evicted_jobs: usize,
}

/// Runs a single sweep
pub async fn sweep_once(
    store: &Arc<dyn ProgressStore>,
    tracker: &Tracker,
) -> waypoint_tracker::Result<SweepReport> {
    // Evicting relies on expired records reading as absent, purged or not
    let evicted_jobs = tracker.evict_expired().await?;
    let purged_records = store.purge_expired().await?;

    Ok(SweepReport {
        purged_records,
        evicted_jobs,
    })
}

/// Spawns the sweep loop; the first sweep runs immediately
pub fn spawn(store: Arc<dyn ProgressStore>, tracker: Tracker, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match sweep_once(&store, &tracker).await {
                Ok(report) if report != SweepReport::default() => tracing::info!(
                    "Purged {} expired records, evicted {} jobs",
                    report.purged_records,
                    report.evicted_jobs
                ),
                Ok(_) => tracing::debug!("Sweep found nothing expired"),
                Err(e) => tracing::warn!("Expiry sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::domain::catalog::StepCatalog;
    use waypoint_tracker::MemoryStore;

    #[tokio::test]
    async fn test_sweep_frees_abandoned_jobs() {
        let memory = MemoryStore::new().with_retention(Some(Duration::ZERO));
        let store: Arc<dyn ProgressStore> = Arc::new(memory.clone());
        let tracker = Tracker::new(store.clone());

        for i in 0..5 {
            let catalog = StepCatalog::from_names(["fetch", "report"]).unwrap();
            let job = tracker.register(format!("job{}", i), catalog).await.unwrap();
            job.advance("starting fetch").await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = sweep_once(&store, &tracker).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                purged_records: 5,
                evicted_jobs: 5
            }
        );
        assert!(memory.is_empty().await);
        assert!(!tracker.is_registered("job0").await);
    }

    #[tokio::test]
    async fn test_spawned_sweeper_runs_on_its_own() {
        let memory = MemoryStore::new().with_retention(Some(Duration::ZERO));
        let store: Arc<dyn ProgressStore> = Arc::new(memory.clone());
        let tracker = Tracker::new(store.clone());

        let catalog = StepCatalog::from_names(["fetch", "report"]).unwrap();
        let job = tracker.register("job1", catalog).await.unwrap();
        job.advance("starting fetch").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let handle = spawn(store, tracker.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(memory.is_empty().await);
        assert!(!tracker.is_registered("job1").await);
    }
}

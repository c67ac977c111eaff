//! File-backed progress store
//!
//! One JSON document per job in a single directory. Writes go to a temporary
//! file that is renamed over the target, so a concurrent reader sees either
//! the previous record or the new one. Several processes can share the
//! directory: a job driver writes while a CLI or dashboard reads.

use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};
use waypoint_core::domain::progress::ProgressRecord;

use super::{ProgressStore, StoreResult, is_expired};

const RECORD_EXTENSION: &str = "json";

/// Directory-backed implementation of ProgressStore
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    retention: Option<Duration>,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!("Opened progress store at {}", dir.display());
        Ok(Self {
            dir,
            retention: None,
        })
    }

    /// Expires records whose last write is older than `retention`
    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", urlencoding::encode(job_id), RECORD_EXTENSION))
    }

    async fn read_record(path: &Path) -> StoreResult<Option<ProgressRecord>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Paths of every record file currently in the directory
    async fn record_paths(&self) -> StoreResult<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl ProgressStore for FileStore {
    async fn get(&self, job_id: &str) -> StoreResult<Option<ProgressRecord>> {
        let record = Self::read_record(&self.path_for(job_id)).await?;
        let now = Utc::now();
        Ok(record.filter(|r| !is_expired(r.updated_at, self.retention, now)))
    }

    async fn set(&self, record: &ProgressRecord) -> StoreResult<()> {
        let target = self.path_for(&record.job_id);
        let tmp = self
            .dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));

        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, job_id: &str) -> StoreResult<bool> {
        match fs::remove_file(self.path_for(job_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> StoreResult<Vec<ProgressRecord>> {
        let now = Utc::now();
        let mut records = Vec::new();
        for path in self.record_paths().await? {
            match Self::read_record(&path).await {
                Ok(Some(record)) if !is_expired(record.updated_at, self.retention, now) => {
                    records.push(record)
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable progress file {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        if self.retention.is_none() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut removed = 0;
        for path in self.record_paths().await? {
            let Ok(Some(record)) = Self::read_record(&path).await else {
                continue;
            };
            if is_expired(record.updated_at, self.retention, now) {
                match fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::domain::catalog::StepCatalog;

    fn record(job_id: &str, age_secs: i64) -> ProgressRecord {
        let catalog = StepCatalog::from_names(["fetch", "report"]).unwrap();
        let then = Utc::now() - chrono::Duration::seconds(age_secs);
        ProgressRecord::new(job_id, &catalog, then)
    }

    #[tokio::test]
    async fn test_round_trip_through_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let mut rec = record("job1", 0);
        rec.last_message = "starting fetch".to_string();
        store.set(&rec).await.unwrap();

        let found = store.get("job1").await.unwrap().unwrap();
        assert_eq!(found, rec);

        // A second store on the same directory sees the same data
        let reader = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reader.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert!(store.get("nope").await.unwrap().is_none());
        assert!(!store.remove("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_job_ids_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.set(&record("../escape/me", 0)).await.unwrap();
        assert!(store.get("../escape/me").await.unwrap().is_some());
        assert!(!dir.path().parent().unwrap().join("escape").exists());
        assert!(store.remove("../escape/me").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let mut rec = record("job1", 0);
        store.set(&rec).await.unwrap();
        rec.current_step_index = 1;
        store.set(&rec).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["job1.json".to_string()]);
        assert_eq!(store.get("job1").await.unwrap().unwrap().current_step_index, 1);
    }

    #[tokio::test]
    async fn test_retention_hides_and_purges_old_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path())
            .await
            .unwrap()
            .with_retention(Some(Duration::from_secs(60)));

        store.set(&record("old", 600)).await.unwrap();
        store.set(&record("fresh", 0)).await.unwrap();

        assert!(store.get("old").await.unwrap().is_none());
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(!store.remove("old").await.unwrap());
    }
}

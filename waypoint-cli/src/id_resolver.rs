//! ID resolver module
//!
//! Resolves job id prefixes to full job ids by reading the registry, so users
//! can type a short, unambiguous prefix of a generated id.

use anyhow::{Context, Result, anyhow};
use waypoint_tracker::Registry;

/// Resolve a job id or prefix to a full job id
///
/// An exact id wins even when it is also a prefix of other ids.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - The store cannot be read
pub async fn resolve_job_id(registry: &Registry, id_or_prefix: &str) -> Result<String> {
    // If it's already a full id, return it
    if registry
        .lookup(id_or_prefix)
        .await
        .context("Failed to read job")?
        .is_some()
    {
        return Ok(id_or_prefix.to_string());
    }

    let jobs = registry
        .list()
        .await
        .context("Failed to list jobs for ID resolution")?;
    let ids: Vec<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();

    match_prefix(&ids, id_or_prefix)
}

/// Pick the single id starting with `prefix` (case-insensitive)
fn match_prefix(ids: &[&str], prefix: &str) -> Result<String> {
    let prefix = prefix.to_lowercase();
    let matches: Vec<&str> = ids
        .iter()
        .copied()
        .filter(|id| id.to_lowercase().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(id.to_string()),
        _ => Err(anyhow!(
            "Ambiguous prefix '{}' matches multiple jobs: {}",
            prefix,
            matches.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use waypoint_core::domain::catalog::StepCatalog;
    use waypoint_tracker::{MemoryStore, Tracker};

    #[test]
    fn test_match_prefix() {
        let ids = ["3f2a91", "3f7c00", "b81d44"];

        assert_eq!(match_prefix(&ids, "b8").unwrap(), "b81d44");
        assert_eq!(match_prefix(&ids, "3F2").unwrap(), "3f2a91");
        assert!(match_prefix(&ids, "3f").unwrap_err().to_string().contains("Ambiguous"));
        assert!(match_prefix(&ids, "zz").is_err());
    }

    #[tokio::test]
    async fn test_exact_id_beats_longer_ids() {
        let store = Arc::new(MemoryStore::new());
        let tracker = Tracker::new(store.clone());
        let registry = Registry::new(store);

        for id in ["job", "job-2"] {
            let catalog = StepCatalog::from_names(["fetch"]).unwrap();
            tracker.register(id, catalog).await.unwrap();
            tracker.update(id, "fetch", None).await.unwrap();
        }

        assert_eq!(resolve_job_id(&registry, "job").await.unwrap(), "job");
        assert_eq!(resolve_job_id(&registry, "job-").await.unwrap(), "job-2");
    }
}

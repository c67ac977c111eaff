//! Simulate command handler
//!
//! Drives a scripted analysis job through the tracker while a monitor task
//! polls the registry, the same split a real job driver and dashboard use.

use anyhow::{Context, Result, anyhow};
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use waypoint_core::classify;
use waypoint_core::domain::catalog::{AnalysisConfig, Pattern, StepCatalog};
use waypoint_core::dto::progress::ProgressSnapshot;
use waypoint_tracker::{JobHandle, ProgressStore, Registry, Tracker};

use super::catalog::format_duration;
use super::job::{print_outcome, print_progress_line};
use crate::config::Config;

/// Options of a simulated run
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub analysis: AnalysisConfig,
    pub step_delay_ms: u64,
    /// 1-based step number at which the job fails
    pub fail_at: Option<usize>,
}

/// Scripted status message and the step it is expected to land on
#[derive(Debug, Clone, PartialEq)]
struct ScriptLine {
    step: usize,
    message: String,
}

/// Run a simulated job against the configured store
pub async fn run(options: SimulateOptions, config: &Config) -> Result<()> {
    let store = config.open_store().await?;

    let snapshot = execute(&options, store).await?;
    print_outcome(&snapshot);

    Ok(())
}

async fn execute(
    options: &SimulateOptions,
    store: Arc<dyn ProgressStore>,
) -> Result<ProgressSnapshot> {
    let catalog = StepCatalog::build(&options.analysis)?;
    let tracker = Tracker::new(store.clone());
    let registry = Registry::new(store);

    let job_id = format!("sim-{}", Uuid::new_v4());
    let job = tracker.register(job_id.clone(), catalog.clone()).await?;

    println!(
        "{}",
        format!(
            "Simulating job {} ({} steps, estimated {})",
            job_id,
            catalog.len(),
            format_duration(catalog.estimated_total_seconds())
        )
        .bold()
    );
    tracing::info!("Simulation {} started with {:?}", job_id, options.analysis);

    let poll = Duration::from_millis((options.step_delay_ms / 2).max(50));
    let monitor = tokio::spawn(monitor(registry.clone(), job_id.clone(), poll));

    let lines = script(&catalog, &job_id);
    if let Err(e) = drive(&job, &catalog, &lines, options).await {
        monitor.abort();
        return Err(e).context("Simulated job driver failed");
    }

    monitor.await.context("Monitor task panicked")??;

    registry
        .lookup(&job_id)
        .await?
        .ok_or_else(|| anyhow!("Job {} disappeared from the store", job_id))
}

/// Feeds the scripted messages to the tracker
async fn drive(
    job: &JobHandle,
    catalog: &StepCatalog,
    lines: &[ScriptLine],
    options: &SimulateOptions,
) -> waypoint_tracker::Result<()> {
    let delay = Duration::from_millis(options.step_delay_ms);

    for line in lines {
        if options.fail_at == Some(line.step + 1) {
            let name = catalog
                .get(line.step)
                .map(|s| s.name.as_str())
                .unwrap_or("unknown step");
            return job
                .fail(&format!("Simulated failure during {}", name))
                .await;
        }

        job.advance(&line.message).await?;
        tokio::time::sleep(delay).await;
    }

    let result = serde_json::json!({
        "job_id": job.job_id(),
        "analysts": options.analysis.analysts,
        "research_depth": options.analysis.research_depth,
        "decision": "hold",
    });
    job.complete("Analysis complete", Some(result)).await
}

/// Polls the registry and prints each observed change until the job ends
async fn monitor(registry: Registry, job_id: String, poll: Duration) -> Result<()> {
    let mut interval = tokio::time::interval(poll);
    let mut last_seen = None;

    loop {
        interval.tick().await;

        let Some(snapshot) = registry.lookup(&job_id).await? else {
            continue;
        };

        if last_seen != Some(snapshot.updated_at) {
            print_progress_line(&snapshot);
            last_seen = Some(snapshot.updated_at);
        }

        if snapshot.is_terminal() {
            return Ok(());
        }
    }
}

/// Builds one message per step in the style of the analysis pipeline logs
///
/// A message is kept only if it classifies onto its own step, and an
/// unrecognised chatter line follows the first step.
fn script(catalog: &StepCatalog, job_id: &str) -> Vec<ScriptLine> {
    let mut lines = Vec::new();

    for (step, definition) in catalog.iter().enumerate() {
        let Some(pattern) = definition.matches.first() else {
            continue;
        };
        let message = match pattern {
            Pattern::Prefix(text) => format!("{} for {}", text, job_id),
            Pattern::Contains(text) => format!("[module start] {} - {}", text, job_id),
        };

        if classify(&message, catalog) == Some(step) {
            lines.push(ScriptLine { step, message });
        } else {
            tracing::debug!("Skipping script line that does not reach step {}", step);
        }

        if step == 0 {
            lines.push(ScriptLine {
                step,
                message: "waiting for upstream quote service".to_string(),
            });
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::domain::catalog::Analyst;
    use waypoint_core::domain::progress::JobStatus;
    use waypoint_tracker::MemoryStore;

    fn options(fail_at: Option<usize>) -> SimulateOptions {
        SimulateOptions {
            analysis: AnalysisConfig::new(vec![Analyst::Market, Analyst::News], 2),
            step_delay_ms: 0,
            fail_at,
        }
    }

    #[test]
    fn test_script_walks_steps_in_order() {
        let catalog = StepCatalog::build(&options(None).analysis).unwrap();
        let lines = script(&catalog, "sim-1");

        let steps: Vec<usize> = lines.iter().map(|l| l.step).collect();
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(steps.last(), Some(&catalog.last_index()));
        assert!(lines.iter().any(|l| classify(&l.message, &catalog).is_none()));
    }

    #[tokio::test]
    async fn test_simulation_completes() {
        let store = Arc::new(MemoryStore::new());
        let snapshot = execute(&options(None), store).await.unwrap();

        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress_percentage, 100);
        assert_eq!(snapshot.current_step_index, snapshot.total_steps - 1);
        assert!(snapshot.result.is_some());
    }

    #[tokio::test]
    async fn test_simulation_fails_at_requested_step() {
        let store = Arc::new(MemoryStore::new());
        let snapshot = execute(&options(Some(3)), store).await.unwrap();

        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.current_step_index, 1);
        assert!(snapshot.last_message.contains("Simulated failure"));
    }
}

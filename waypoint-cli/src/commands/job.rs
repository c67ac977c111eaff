//! Job command handlers
//!
//! Handles the read-side commands: showing, listing and following jobs, and
//! purging expired records.

use anyhow::{Result, anyhow};
use colored::*;
use std::time::Duration;
use waypoint_core::domain::progress::JobStatus;
use waypoint_core::dto::progress::ProgressSnapshot;
use waypoint_tracker::Registry;

use super::catalog::format_duration;
use crate::config::Config;
use crate::id_resolver::resolve_job_id;

const BAR_WIDTH: usize = 30;

/// Get and display a single job
pub async fn show_job(config: &Config, id: &str) -> Result<()> {
    let registry = Registry::new(config.open_store().await?);
    let job_id = resolve_job_id(&registry, id).await?;

    let snapshot = registry
        .lookup(&job_id)
        .await?
        .ok_or_else(|| anyhow!("Job {} not found", job_id))?;

    print_job_details(&snapshot);

    Ok(())
}

/// List tracked jobs, newest first
pub async fn list_jobs(config: &Config, active_only: bool) -> Result<()> {
    let registry = Registry::new(config.open_store().await?);
    let jobs = if active_only {
        registry.list_active().await?
    } else {
        registry.list().await?
    };

    let label = if active_only { "active job" } else { "job" };
    if jobs.is_empty() {
        println!("{}", format!("No {}s found.", label).yellow());
    } else {
        println!("{}", format!("Found {} {}(s):", jobs.len(), label).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

/// Poll a job and print every change until it reaches a terminal status
pub async fn watch_job(config: &Config, id: &str, interval_ms: u64) -> Result<()> {
    let registry = Registry::new(config.open_store().await?);
    let job_id = resolve_job_id(&registry, id).await?;
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(50)));
    let mut last: Option<(usize, JobStatus, String)> = None;

    println!("{}", format!("Watching job {}", job_id).bold());

    loop {
        interval.tick().await;

        let Some(snapshot) = registry.lookup(&job_id).await? else {
            return Err(anyhow!("Job {} not found or expired", job_id));
        };

        let state = (
            snapshot.current_step_index,
            snapshot.status,
            snapshot.last_message.clone(),
        );
        if last.as_ref() != Some(&state) {
            print_progress_line(&snapshot);
            last = Some(state);
        }

        if snapshot.is_terminal() {
            print_outcome(&snapshot);
            return Ok(());
        }
    }
}

/// Remove expired records from the store
pub async fn purge(config: &Config) -> Result<()> {
    let store = config.open_store().await?;
    let removed = store.purge_expired().await?;

    if removed == 0 {
        println!("{}", "No expired records.".yellow());
    } else {
        println!("{} Removed {} expired record(s)", "✓".green(), removed);
    }

    Ok(())
}

/// Print a one-line job summary
fn print_job_summary(job: &ProgressSnapshot) {
    println!("  {} Job {}", "▸".cyan(), job.job_id.dimmed());
    println!("    Status:   {}", colorize_status(job.status));
    println!(
        "    Step:     {}/{} {} ({}%)",
        job.current_step_index + 1,
        job.total_steps,
        job.current_step_name,
        job.progress_percentage
    );
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &ProgressSnapshot) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.job_id.cyan());
    println!("  Status:      {}", colorize_status(job.status));
    println!(
        "  Progress:    {} {}%",
        progress_bar(job.progress_percentage),
        job.progress_percentage
    );
    println!(
        "  Step:        {}/{} {}",
        job.current_step_index + 1,
        job.total_steps,
        job.current_step_name
    );
    if !job.current_step_description.is_empty() {
        println!("               {}", job.current_step_description.dimmed());
    }
    println!("  Last:        {}", job.last_message);
    println!("  Created:     {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:     {}", job.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Elapsed:     {}", format_duration(job.elapsed_seconds));

    match job.completed_at {
        Some(completed) => {
            println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"))
        }
        None => println!("  Remaining:   ~{}", format_duration(job.remaining_seconds)),
    }

    if !job.step_history.is_empty() {
        println!("\n{}", "Steps:".bold());
        for timing in &job.step_history {
            let duration = match timing.duration_seconds {
                Some(seconds) => format_duration(seconds),
                None => "in progress".to_string(),
            };
            println!(
                "  {:>2}. {} {}",
                timing.index + 1,
                timing.name,
                duration.dimmed()
            );
        }
    }

    if let Some(result) = &job.result {
        println!("\n{}", "Result:".bold());
        if let Ok(pretty) = serde_json::to_string_pretty(result) {
            println!("{}", pretty);
        } else {
            println!("{:?}", result);
        }
    }
}

/// Print the compact progress line used while following a job
pub fn print_progress_line(job: &ProgressSnapshot) {
    println!(
        "{} {} {:>3}% {} {}",
        job.updated_at.format("%H:%M:%S").to_string().dimmed(),
        progress_bar(job.progress_percentage),
        job.progress_percentage,
        format!(
            "[{}/{}] {}",
            job.current_step_index + 1,
            job.total_steps,
            job.current_step_name
        )
        .cyan(),
        job.last_message.dimmed()
    );
}

/// Print how a finished job ended
pub fn print_outcome(job: &ProgressSnapshot) {
    match job.status {
        JobStatus::Completed => println!(
            "{} Job {} completed in {}",
            "✓".green(),
            job.job_id,
            format_duration(job.elapsed_seconds)
        ),
        JobStatus::Failed => println!(
            "{} Job {} failed at step {}: {}",
            "✗".red(),
            job.job_id,
            job.current_step_name,
            job.last_message.red()
        ),
        JobStatus::Pending | JobStatus::Running => {}
    }
}

fn progress_bar(percentage: u8) -> String {
    let filled = usize::from(percentage.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> colored::ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}

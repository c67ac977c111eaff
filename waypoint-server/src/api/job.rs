//! Job API Handlers
//!
//! HTTP endpoints for registering jobs, reporting their progress and reading
//! snapshots back.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use waypoint_core::domain::progress::Terminal;
use waypoint_core::dto::job::{ProgressUpdate, RegisterJob, RegisteredJob};
use waypoint_core::dto::progress::ProgressSnapshot;
use waypoint_tracker::TrackerError;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /jobs
/// Register a job and return its step catalog
pub async fn register_job(
    State(state): State<AppState>,
    Json(req): Json<RegisterJob>,
) -> ApiResult<(StatusCode, Json<RegisteredJob>)> {
    let catalog = req.catalog().map_err(TrackerError::from)?;
    let job_id = req
        .job_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::info!("Registering job {} with {} steps", job_id, catalog.len());

    let registered = RegisteredJob::new(&job_id, &catalog);
    state.tracker.register(job_id, catalog).await?;

    Ok((StatusCode::CREATED, Json(registered)))
}

/// POST /jobs/{id}/progress
/// Report a status message; returns the resulting snapshot
pub async fn report_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ProgressUpdate>,
) -> ApiResult<Json<ProgressSnapshot>> {
    tracing::debug!("Progress for {}: {}", id, update.message);

    if update.result.is_some() && update.terminal != Some(Terminal::Completed) {
        tracing::warn!("Rejected result for job {} without completion", id);
        return Err(ApiError::BadRequest(
            "A result can only be sent with terminal \"completed\"".to_string(),
        ));
    }

    match update.terminal {
        Some(Terminal::Completed) => {
            state
                .tracker
                .complete(&id, &update.message, update.result)
                .await?
        }
        Some(Terminal::Failed) => state.tracker.fail(&id, &update.message).await?,
        None => state.tracker.update(&id, &update.message, None).await?,
    }

    // Terminal jobs no longer need their catalog in memory
    if update.terminal.is_some() {
        state.tracker.release(&id).await;
    }

    let snapshot = state
        .registry
        .lookup(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    Ok(Json(snapshot))
}

// =============================================================================
// Job Query Endpoints
// =============================================================================

/// GET /jobs/{id}
/// Get the progress snapshot of a job
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProgressSnapshot>> {
    tracing::debug!("Getting job: {}", id);

    state
        .registry
        .lookup(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))
}

/// GET /jobs
/// List every live job, newest first
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<ProgressSnapshot>>> {
    Ok(Json(state.registry.list().await?))
}

/// GET /jobs/active
/// List jobs that are still pending or running
pub async fn list_active_jobs(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProgressSnapshot>>> {
    Ok(Json(state.registry.list_active().await?))
}

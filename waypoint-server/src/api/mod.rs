//! API Module
//!
//! HTTP API layer for the progress server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use waypoint_tracker::{Registry, Tracker};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub tracker: Tracker,
    pub registry: Registry,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/jobs", post(job::register_job))
        .route("/jobs", get(job::list_jobs))
        .route("/jobs/active", get(job::list_active_jobs))
        .route("/jobs/{id}", get(job::get_job))
        .route("/jobs/{id}/progress", post(job::report_progress))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

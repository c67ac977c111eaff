use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypoint_tracker::config::Config;
use waypoint_tracker::{ProgressStore, Registry, Tracker};

pub mod api;
pub mod db;
pub mod repository;
pub mod sweeper;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "waypoint_server=debug,waypoint_tracker=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Waypoint server...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    let store: Arc<dyn ProgressStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(&database_url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Arc::new(repository::PgProgressStore::new(pool).with_retention(config.retention))
        }
        Err(_) => {
            tracing::info!("Using {:?} progress store", config.store);
            config.open_store().await?
        }
    };

    let tracker = Tracker::new(store.clone());

    // Expired records and abandoned job contexts are dropped in the background
    sweeper::spawn(store.clone(), tracker.clone(), config.sweep_interval);

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        tracker,
        registry: Registry::new(store),
    });

    // Get bind address
    let addr = std::env::var("WAYPOINT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

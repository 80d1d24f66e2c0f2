//! umr-ri library interface
//!
//! Exposes the application state, router construction, and the pipeline
//! internals for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::services::recognition::RecognitionProvider;
use crate::services::staging::StagingArea;

/// Upload bodies carry base64 image payloads; allow up to 50 MB
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// External image→number recognition capability
    pub recognition: Arc<dyn RecognitionProvider>,
    /// Scratch directory for images staged during ingestion
    pub staging: StagingArea,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        recognition: Arc<dyn RecognitionProvider>,
        staging: StagingArea,
    ) -> Self {
        Self {
            db,
            recognition,
            staging,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::readings_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

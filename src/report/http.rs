//! Read-only HTTP view of the latest run.
//!
//! `SharedReport` is a reporter that keeps the most recent `RunReport` in
//! memory; `report_routes` serves it as JSON.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::error::ReportError;
use crate::pipeline::types::{BucketName, Reporter, RunReport};

/// Latest run report, shared between the pipeline and HTTP handlers.
#[derive(Clone, Default)]
pub struct SharedReport {
    latest: Arc<RwLock<Option<RunReport>>>,
}

impl SharedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the latest report, if any run has finished.
    pub async fn latest(&self) -> Option<RunReport> {
        self.latest.read().await.clone()
    }
}

#[async_trait]
impl Reporter for SharedReport {
    fn name(&self) -> &str {
        "shared"
    }

    async fn report(&self, report: &RunReport) -> Result<(), ReportError> {
        *self.latest.write().await = Some(report.clone());
        debug!(run_id = %report.run_id, "Published run report");
        Ok(())
    }
}

/// Build the Axum router for the report endpoints.
pub fn report_routes(shared: SharedReport) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api/report", get(get_report))
        .route("/api/buckets", get(list_buckets))
        .route("/api/buckets/{name}", get(get_bucket))
        .layer(CorsLayer::permissive())
        .with_state(shared)
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn home() -> &'static str {
    "Welcome to the Email Emotion Organizer!"
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_report(State(shared): State<SharedReport>) -> Response {
    match shared.latest().await {
        Some(report) => Json(report).into_response(),
        None => no_run_yet(),
    }
}

async fn list_buckets(State(shared): State<SharedReport>) -> Response {
    match shared.latest().await {
        Some(report) => Json(report.buckets).into_response(),
        None => no_run_yet(),
    }
}

async fn get_bucket(State(shared): State<SharedReport>, Path(name): Path<String>) -> Response {
    let Some(bucket) = BucketName::from_label(&name) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown bucket '{name}'") })),
        )
            .into_response();
    };
    match shared.latest().await {
        Some(report) => Json(report.buckets.bucket(bucket).to_vec()).into_response(),
        None => no_run_yet(),
    }
}

fn no_run_yet() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "no pipeline run has completed yet" })),
    )
        .into_response()
}

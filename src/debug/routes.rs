//! REST endpoints over the debug console.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;

use super::console::DebugConsole;
use crate::dispatcher::{DispatchOutcome, TriggerOutcome};

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /api/guide/progress
///
/// Full engine snapshot: progress, panel, tooltip, manual triggers.
async fn get_progress(State(console): State<DebugConsole>) -> impl IntoResponse {
    Json(console.engine().snapshot().await)
}

/// GET /api/guide/steps
async fn get_steps(State(console): State<DebugConsole>) -> impl IntoResponse {
    Json(console.engine().catalog().steps().to_vec())
}

/// POST /api/guide/steps/{n}/click
async fn click_step(
    State(console): State<DebugConsole>,
    Path(step): Path<u32>,
) -> impl IntoResponse {
    let outcome = console.simulate_step_click(step).await;
    let status = match outcome {
        DispatchOutcome::UnknownStep => StatusCode::NOT_FOUND,
        DispatchOutcome::Dispatched { .. } => StatusCode::OK,
    };
    (status, Json(outcome))
}

/// POST /api/guide/steps/{n}/complete
async fn complete_step(
    State(console): State<DebugConsole>,
    Path(step): Path<u32>,
) -> impl IntoResponse {
    if console.engine().complete_step(step).await {
        (StatusCode::OK, Json(json!({ "step": step, "status": "completed" })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No step {step}") })),
        )
    }
}

/// POST /api/guide/steps/{n}/features/{id}/trigger
async fn trigger_feature(
    State(console): State<DebugConsole>,
    Path((step, feature)): Path<(u32, String)>,
) -> impl IntoResponse {
    let outcome = console.engine().trigger_feature(step, &feature).await;
    let status = match outcome {
        TriggerOutcome::UnknownStep | TriggerOutcome::UnknownFeature => StatusCode::NOT_FOUND,
        TriggerOutcome::PrerequisitesUnmet { .. } => StatusCode::CONFLICT,
        TriggerOutcome::Triggered { .. } => StatusCode::OK,
    };
    (status, Json(outcome))
}

/// GET /api/guide/diagnose
async fn diagnose(State(console): State<DebugConsole>) -> impl IntoResponse {
    Json(console.quick_diagnose().await)
}

/// POST /api/guide/logs/export
///
/// Export failure is reported in the body, never as a server error.
async fn export_logs(State(console): State<DebugConsole>) -> impl IntoResponse {
    match console.export_logs().await {
        Some(path) => Json(json!({ "exported": true, "path": path })),
        None => Json(json!({ "exported": false, "path": null })),
    }
}

/// POST /api/guide/diagnose-and-export
async fn diagnose_and_export(State(console): State<DebugConsole>) -> impl IntoResponse {
    Json(console.diagnose_and_export().await)
}

/// Build the debug REST routes.
pub fn debug_routes(console: DebugConsole) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/guide/progress", get(get_progress))
        .route("/api/guide/steps", get(get_steps))
        .route("/api/guide/steps/{n}/click", post(click_step))
        .route("/api/guide/steps/{n}/complete", post(complete_step))
        .route(
            "/api/guide/steps/{n}/features/{id}/trigger",
            post(trigger_feature),
        )
        .route("/api/guide/diagnose", get(diagnose))
        .route("/api/guide/logs/export", post(export_logs))
        .route("/api/guide/diagnose-and-export", post(diagnose_and_export))
        .layer(CorsLayer::permissive())
        .with_state(console)
}

//! Shared handler state and operational endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use binthere_accounts::AccountService;
use binthere_classifier::Classifier;
use binthere_session::SessionTracker;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<SessionTracker>,
    pub accounts: Arc<AccountService>,
    pub classifier: Arc<dyn Classifier>,
    pub node_id: String,
    pub start_time: Instant,
    pub trust_forwarded_for: bool,
    pub max_upload_bytes: usize,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

#[derive(Serialize, ToSchema)]
pub struct RouteNotFound {
    pub error: String,
}

/// GET /api/health — Health check endpoint.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Operations",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe.
/// Returns 503 once a shutdown signal has been received, while the server drains.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Accepting traffic"),
        (status = 503, description = "Shutting down"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.tracker.is_running() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found() -> (StatusCode, Json<RouteNotFound>) {
    (
        StatusCode::NOT_FOUND,
        Json(RouteNotFound {
            error: "Route not found".to_string(),
        }),
    )
}

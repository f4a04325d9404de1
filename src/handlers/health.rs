use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub database: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub uptime_secs: u64,
    pub timestamp: String,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

/// Readiness probe: pings the database
#[utoipa::path(
    get,
    path = "/api/v1/health",
    summary = "Health check",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let db_result = crate::db::check_connection(state.db.as_ref()).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (code, database, error) = match db_result {
        Ok(()) => (StatusCode::OK, ComponentStatus::Up, None),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ComponentStatus::Down,
                Some("Database unavailable".to_string()),
            )
        }
    };

    (
        code,
        Json(HealthResponse {
            status: database,
            database,
            error,
            latency_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    summary = "Service status",
    responses((status = 200, description = "Version and uptime", body = StatusResponse)),
    tag = "health"
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        uptime_secs: get_uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

//! System and health endpoints.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{HealthResponse, PingResponse};

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/v1/ping",
    responses(
        (status = 200, description = "Server is reachable", body = PingResponse),
    ),
    tag = "System"
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        response: "pong".to_owned(),
    })
}

/// Check server health.
///
/// Returns server status, version, uptime and whether the store is file-backed.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse),
    ),
    tag = "System"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        persistent: state.persistent(),
        uptime_seconds: state.uptime_secs(),
    })
}

/// Prometheus-compatible metrics endpoint.
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let totals = state.totals().await?;
    let body = state.metrics().render(totals, state.uptime_secs());

    Ok((
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    ))
}

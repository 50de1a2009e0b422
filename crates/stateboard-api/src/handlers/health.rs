//! Liveness and readiness. Both are mounted outside the auth guard.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use stateboard_core::epoch_secs;

use crate::AppState;
use crate::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub timestamp: u64,
}

/// GET / and GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.settings.service_name.clone(),
        timestamp: epoch_secs(),
    })
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
}

/// GET /ready: succeeds once the store answers a one-key listing.
pub async fn ready(State(state): State<AppState>) -> ApiResult<Json<ReadyResponse>> {
    state.store.raw().list("", 1, None)?;
    Ok(Json(ReadyResponse { status: "ready" }))
}

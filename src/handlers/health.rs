use axum::{extract::State, http::StatusCode, Json};
use crate::types::health::{HealthResponse, StatusResponse};
use crate::types::AppState;

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

pub async fn status(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    (
        StatusCode::OK,
        Json(StatusResponse {
            service: "EAP-AKA".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            active_sessions: state.session_store.len().await,
            tracked_subscribers: state.session_store.tracked_subscribers().await,
        }),
    )
}

//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - Gate console routes (view, manual submit, camera toggle, dismiss)
//! - Read-only day/ticket listings
//! - Health check and WebSocket stream

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let api_reachable = state.validation.health_check().await;
    let camera_running = state.scanner.status().await.running;

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        api_reachable,
        camera_running,
    };

    Json(response)
}

use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::debug;

use crate::models::HealthResponse;
use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        service: app_state.config.service_name.clone(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    // Memory-resident: ready as soon as the directory exists.
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        service: app_state.config.service_name.clone(),
    })
}

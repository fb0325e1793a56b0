//! Health check handler

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    plugins: Vec<String>,
    authentication: bool,
}

/// Liveness check with the list of enabled plugins
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: "healthy",
            plugins: state.plugins.list().await,
            authentication: state.auth.is_some(),
        }),
    )
}

//! Selling strategy and action simulator HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;

use crate::models::SimulatorInput;
use crate::services::strategy::{simulate, YieldInput};
use crate::AppState;

/// Three selling strategies for an expected yield
pub async fn calculate_yield_strategy(
    State(state): State<AppState>,
    Json(input): Json<YieldInput>,
) -> impl IntoResponse {
    match state.strategy().calculate(&input, Utc::now().date_naive()) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn simulate_action(Json(input): Json<SimulatorInput>) -> impl IntoResponse {
    (StatusCode::OK, Json(simulate(&input)))
}

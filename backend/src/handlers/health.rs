//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub market_data: bool,
    pub leaf_classifier: bool,
    pub disease_localizer: bool,
    pub risk_model: bool,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Check database connectivity
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(_) => "disconnected".to_string(),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        market_data: state.market.history.as_ref().is_some_and(|h| !h.is_empty()),
        leaf_classifier: state.classifier.is_some(),
        disease_localizer: state.localizer.is_some(),
        risk_model: state.risk_model.is_some(),
    })
}

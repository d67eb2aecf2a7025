//! Cultivation engine HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::error::AppError;
use crate::middleware::{resolve_farm_id, CurrentUser};
use crate::models::{EnvironmentalReading, ReadingInput};
use crate::services::cultivation::{aggregate, AggregateInput};
use crate::AppState;

/// Run the engine on a manually entered reading
pub async fn evaluate_reading(
    State(state): State<AppState>,
    Json(input): Json<ReadingInput>,
) -> impl IntoResponse {
    let reading = match EnvironmentalReading::try_from(input) {
        Ok(reading) => reading,
        Err(e) => return AppError::from(e).into_response(),
    };

    match state.cultivation().evaluate(&reading).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Average a batch of raw readings
pub async fn aggregate_readings(Json(input): Json<AggregateInput>) -> impl IntoResponse {
    match aggregate(input) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Run the engine on the farm's latest stored reading
pub async fn latest_cultivation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);

    let reading = match state.readings().latest(&farm_id).await {
        Ok(Some(reading)) => reading,
        Ok(None) => return AppError::NotFound("IoT reading".to_string()).into_response(),
        Err(e) => return e.into_response(),
    };

    match state.cultivation().evaluate(&reading).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Smart alert for the farm's latest reading
pub async fn smart_alert(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);

    let latest = state.readings().latest(&farm_id).await.unwrap_or_else(|e| {
        tracing::warn!("Smart alert without reading for {}: {}", farm_id, e);
        None
    });

    match state.cultivation().smart_alert(latest.as_ref()) {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => e.into_response(),
    }
}

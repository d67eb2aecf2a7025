//! Farm sensor reading HTTP handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use shared::average_readings;

use crate::error::AppError;
use crate::middleware::{resolve_farm_id, AuthUser, CurrentUser};
use crate::models::{EnvironmentalReading, Factor, FarmAverages, ReadingInput};
use crate::services::readings::{daily_metrics, sensor_series, AVERAGES_WINDOW, SERIES_WINDOW};
use crate::AppState;

/// Store a validated reading for the farm
pub async fn store_reading(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ReadingInput>,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);
    let reading = match EnvironmentalReading::try_from(input) {
        Ok(reading) => reading,
        Err(e) => return AppError::from(e).into_response(),
    };

    match state.readings().insert(&farm_id, reading).await {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Averages of the latest readings
pub async fn farm_averages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);

    let readings = match state.readings().recent(&farm_id, AVERAGES_WINDOW).await {
        Ok(readings) if readings.is_empty() => {
            return AppError::NotFound("Sensor data".to_string()).into_response()
        }
        Ok(readings) => readings,
        Err(e) => return e.into_response(),
    };

    match average_readings(&readings) {
        Ok(averages) => (StatusCode::OK, Json(FarmAverages::from(&averages))).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

async fn factor_series(state: &AppState, user: &AuthUser, factor: Factor) -> Response {
    let farm_id = resolve_farm_id(user, &state.config.auth);

    match state.readings().recent(&farm_id, SERIES_WINDOW).await {
        Ok(readings) => (StatusCode::OK, Json(sensor_series(&readings, factor))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Soil moisture chart, oldest first
pub async fn soil_moisture_series(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    factor_series(&state, &user, Factor::SoilMoisture).await
}

/// Temperature chart, oldest first
pub async fn temperature_series(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    factor_series(&state, &user, Factor::Temperature).await
}

/// Weekday averages over the last seven days
pub async fn farm_daily_metrics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);
    let since = Utc::now() - Duration::days(7);

    match state.readings().since(&farm_id, since).await {
        Ok(readings) => (StatusCode::OK, Json(daily_metrics(&readings))).into_response(),
        Err(e) => e.into_response(),
    }
}

//! Market intelligence HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::models::PriceForecastInput;
use crate::AppState;

pub async fn market_kpis(State(state): State<AppState>) -> impl IntoResponse {
    match state.market_service().kpis() {
        Ok(kpis) => (StatusCode::OK, Json(kpis)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Primary market price chart with trend forecast overlay
pub async fn price_series(State(state): State<AppState>) -> impl IntoResponse {
    match state.market_service().price_series() {
        Ok(series) => (StatusCode::OK, Json(series)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn demand_volatility(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.market_service().demand_volatility()))
}

pub async fn location_price_summary(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.market_service().location_summary()))
}

/// Signal card with optional enriched commentary
pub async fn market_insight(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.market_service().insight().await))
}

/// One-off forecast for a submitted price history
pub async fn price_forecast(
    State(state): State<AppState>,
    Json(input): Json<PriceForecastInput>,
) -> impl IntoResponse {
    match state.market_service().forecast(&input.price_history) {
        Ok(forecast) => (StatusCode::OK, Json(forecast)).into_response(),
        Err(e) => e.into_response(),
    }
}

//! Action plan HTTP handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::middleware::{resolve_farm_id, CurrentUser};
use crate::services::action_plan::HistoryQuery;
use crate::AppState;

/// Build and store a plan from everything known about the farm
pub async fn generate_action_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);

    match state.action_plans().generate(&farm_id).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn action_plan_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);

    match state.action_plans().history(&farm_id, &query).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => e.into_response(),
    }
}

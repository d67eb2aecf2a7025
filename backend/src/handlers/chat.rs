//! Farm assistant chat HTTP handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::middleware::{resolve_farm_id, CurrentUser};
use crate::services::chat::ChatRequest;
use crate::AppState;

pub async fn chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);

    match state.chat().chat(&farm_id, &request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

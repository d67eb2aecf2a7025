//! Leaf quality scan HTTP handler

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{AppError, AppResult};
use crate::middleware::{resolve_farm_id, CurrentUser};
use crate::AppState;

/// Pull the `file` part out of a multipart upload
async fn read_upload(mut multipart: Multipart) -> AppResult<(Option<String>, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidImage(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidImage(e.to_string()))?;
        return Ok((filename, bytes.to_vec()));
    }

    Err(AppError::MissingField("file".to_string()))
}

/// Grade an uploaded leaf photo and store the scan
pub async fn scan_leaf(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> impl IntoResponse {
    let farm_id = resolve_farm_id(&user, &state.config.auth);

    let (filename, bytes) = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => return e.into_response(),
    };

    match state.leaf_quality().scan(&farm_id, filename, &bytes).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

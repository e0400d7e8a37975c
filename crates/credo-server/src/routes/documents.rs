//! Document-bundle upload route.

use axum::Json;
use axum::extract::{Multipart, State};
use serde::Serialize;
use tracing::error;

use crate::error::ApiError;
use crate::ingest::StoredDocument;
use crate::state::AppState;

use super::AuthedUser;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub stored: Vec<StoredDocument>,
    pub message: String,
}

pub async fn upload(
    State(state): State<AppState>,
    AuthedUser(_principal): AuthedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut members = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed upload: {err}")))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|err| {
            error!(member = %name, error = %err, "failed to read upload member");
            ApiError::bad_request(format!("failed to read member {name}: {err}"))
        })?;
        members.push((name, bytes.to_vec()));
    }

    if members.is_empty() {
        return Err(ApiError::bad_request("upload contains no files"));
    }

    let stored = state
        .documents
        .store_bundle(members)
        .await
        .map_err(|err| match err {
            err if err.is_validation() => ApiError::bad_request(err.to_string()),
            err => ApiError::from(err),
        })?;
    let message = format!("Successfully processed {} files", stored.len());
    Ok(Json(UploadResponse { stored, message }))
}

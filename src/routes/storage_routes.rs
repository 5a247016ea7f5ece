use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

/// `GET /api/storage/*key` - referencias públicas de blobs (avatares)
pub async fn get_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let object = state
        .blobs
        .get(&key)
        .await?
        .ok_or_else(|| not_found_error("Blob", &key))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::ETAG, format!("\"{}\"", object.etag)),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        object.data,
    )
        .into_response())
}

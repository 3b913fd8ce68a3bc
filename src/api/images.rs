use axum::{
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState};

/// `GET /images/{*filename}`
///
/// The wildcard captures nested paths so that traversal attempts reach the
/// sanitizer instead of the router; anything that does not name a stored
/// file is a 404.
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if filename.contains('/') || filename.contains('\\') {
        return Err(ApiError::NotFound("Image not found".to_string()));
    }

    let (bytes, mime) = state.images().read(&filename).await.map_err(|e| match e {
        crate::services::UploadError::InvalidFilename(_) => {
            ApiError::NotFound("Image not found".to_string())
        }
        other => other.into(),
    })?;

    let mut response = bytes.into_response();
    if let Ok(value) = HeaderValue::from_str(&mime) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    Ok(response)
}

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::media::{MediaStorageError, mime_for_name};
use crate::server::AppState;
use crate::server::response::ApiError;

/// Streams a stored object by name.
///
/// This is the public-URL surface: knowing an object's name grants access
/// to its bytes, the same tier as an unlisted link. Metadata stays behind
/// the permission evaluator.
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.media.get(&name).await {
        Ok((reader, size)) => {
            let stream = ReaderStream::new(reader);
            Response::builder()
                .header(header::CONTENT_TYPE, mime_for_name(&name))
                .header(header::CONTENT_LENGTH, size)
                .header(header::CACHE_CONTROL, "public, max-age=3600")
                .body(Body::from_stream(stream))
                .unwrap_or_else(|_| ApiError::internal("Storage error").into_response())
        }
        Err(MediaStorageError::NotFound) => {
            ApiError::not_found("Object not found").into_response()
        }
        Err(MediaStorageError::InvalidName) => {
            ApiError::bad_request("Invalid object name").into_response()
        }
        Err(e) => {
            tracing::error!("Failed to read object {name}: {e}");
            ApiError::internal("Storage error").into_response()
        }
    }
}

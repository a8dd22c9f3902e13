use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ImageData, TransformImageRequest, TransformImageResponse};
use crate::server::response::ApiError;
use crate::server::validation::{validate_image_payload, validate_prompt, validate_visibility};
use crate::transform::{check_monthly_limit, transform_stored_image};

/// Applies a generative edit.
///
/// With a `sourceImageId` the server runs the full pipeline: load the
/// stored source, transform, store the result and record its provenance.
/// Without one this is a pure transformation of the supplied bytes and
/// persisting is the caller's business.
pub async fn transform_image(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransformImageRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let prompt = validate_prompt(&req.prompt)?;
    check_monthly_limit(store, state.settings.monthly_transformation_limit)?;

    if let Some(source_id) = &req.source_image_id {
        let visibility = match req.visibility.as_deref() {
            Some(value) => validate_visibility(Some(value))?,
            None => state.settings.derived_visibility,
        };

        let (record, transformed) = transform_stored_image(
            store,
            &state.media,
            &state.transformer,
            source_id,
            prompt,
            &auth.user,
            visibility,
        )
        .await?;

        let image = ImageData::from_record(&record, state.public_base_url.as_deref())
            .with_provenance(&record);

        return Ok::<_, ApiError>(Json(TransformImageResponse {
            image_data: STANDARD.encode(&transformed.data),
            mime_type: transformed.mime_type,
            image: Some(image),
        }));
    }

    let (data, mime_type): (Bytes, String) = if let Some(image_base64) = &req.image_base64 {
        validate_image_payload(image_base64)?;
        let bytes = STANDARD
            .decode(image_base64)
            .map_err(|_| ApiError::bad_request("Invalid base64 image payload"))?;
        let mime_type = req
            .mime_type
            .clone()
            .unwrap_or_else(|| "image/png".to_string());
        (Bytes::from(bytes), mime_type)
    } else if let Some(image_url) = &req.image_url {
        state.transformer.fetch_image(image_url).await?
    } else {
        return Err(ApiError::bad_request("imageBase64 or imageUrl is required"));
    };

    let transformed = state.transformer.transform(&data, &mime_type, prompt).await?;

    Ok::<_, ApiError>(Json(TransformImageResponse {
        image_data: STANDARD.encode(&transformed.data),
        mime_type: transformed.mime_type,
        image: None,
    }))
}

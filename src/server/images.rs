use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::auth::{OptionalUser, RequireUser};
use crate::media::extension_for_mime;
use crate::permissions;
use crate::provenance;
use crate::server::AppState;
use crate::server::dto::{
    AncestryResponse, DerivativesResponse, ImageData, ImageDetail, ImageDetailResponse,
    ListImagesParams, TreeResponse, UpdateVisibilityRequest, UploadImageRequest, media_url,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};
use crate::server::validation::{validate_image_payload, validate_prompt, validate_visibility};
use crate::transform;

/// Public gallery: public images only, newest first.
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListImagesParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let images = store
        .list_public_images(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list images")?;

    let (images, next_cursor, has_more) = paginate(images, DEFAULT_PAGE_SIZE as usize, |image| {
        image.created_at.to_rfc3339()
    });

    let base_url = state.public_base_url.as_deref();
    let data: Vec<ImageData> = images
        .iter()
        .map(|image| ImageData::from_record(image, base_url))
        .collect();

    Ok::<_, ApiError>(Json(PaginatedResponse::new(data, next_cursor, has_more)))
}

/// The requester's own images, any visibility, newest first.
pub async fn list_my_images(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListImagesParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let images = store
        .list_user_images(&auth.user.id, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list images")?;

    let (images, next_cursor, has_more) = paginate(images, DEFAULT_PAGE_SIZE as usize, |image| {
        image.created_at.to_rfc3339()
    });

    let image_ids: Vec<String> = images.iter().map(|image| image.id.clone()).collect();
    let liked_ids = store
        .list_user_liked_image_ids(&auth.user.id, &image_ids)
        .api_err("Failed to list likes")?;

    let base_url = state.public_base_url.as_deref();
    let data: Vec<ImageData> = images
        .iter()
        .map(|image| {
            ImageData::from_record(image, base_url)
                .with_provenance(image)
                .with_user_liked(liked_ids.contains(&image.id))
        })
        .collect();

    Ok::<_, ApiError>(Json(PaginatedResponse::new(data, next_cursor, has_more)))
}

/// Stores uploaded image bytes and inserts the record: a root for plain
/// uploads, or a derivative when a source and prompt are supplied.
pub async fn upload_image(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadImageRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_image_payload(&req.image_base64)?;
    let data = STANDARD
        .decode(&req.image_base64)
        .map_err(|_| ApiError::bad_request("Invalid base64 image payload"))?;

    let mime_type = req.mime_type.as_deref().unwrap_or("image/png");
    if extension_for_mime(mime_type).is_none() {
        return Err(ApiError::bad_request("Unsupported image type"));
    }

    let source = match (&req.source_image_id, &req.transformation_prompt) {
        (Some(source_id), Some(prompt)) => Some((source_id.as_str(), validate_prompt(prompt)?)),
        (None, None) => None,
        _ => {
            return Err(ApiError::bad_request(
                "sourceImageId and transformationPrompt must be provided together",
            ));
        }
    };

    let visibility = match req.visibility.as_deref() {
        Some(value) => validate_visibility(Some(value))?,
        None if source.is_some() => state.settings.derived_visibility,
        None => state.settings.upload_visibility,
    };

    let record = transform::persist_image(
        store,
        &state.media,
        &data,
        mime_type,
        &auth.user,
        source,
        visibility,
    )
    .await?;

    let payload = ImageData::from_record(&record, state.public_base_url.as_deref())
        .with_provenance(&record);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(payload))))
}

pub async fn get_image_detail(
    OptionalUser(user): OptionalUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let view = permissions::check_view_permission(store, &id, user.as_ref())?;
    let record = view.record;

    let user_liked = match &user {
        Some(user) => store
            .get_like(&record.id, &user.id)
            .api_err("Failed to check like")?
            .is_some(),
        None => false,
    };

    let comments = store
        .list_comments(&record.id)
        .api_err("Failed to list comments")?;

    let detail = ImageDetail {
        id: record.id.clone(),
        name: record.name.clone(),
        url: media_url(state.public_base_url.as_deref(), &record.name),
        likes_count: record.likes_count,
        comments_count: record.comments_count,
        user_liked,
        visibility: record.visibility,
        is_owner: view.is_owner,
        transformation_prompt: record.transformation_prompt.clone(),
    };

    Ok::<_, ApiError>(Json(ImageDetailResponse {
        image: detail,
        comments: comments.into_iter().map(Into::into).collect(),
    }))
}

pub async fn update_visibility(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateVisibilityRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let visibility = validate_visibility(req.visibility.as_deref())?;

    let mut record = permissions::check_modify_permission(store, &id, Some(&auth.user))?;

    store.update_image_visibility(&record.id, visibility)?;
    record.visibility = visibility;

    let data = ImageData::from_record(&record, state.public_base_url.as_deref());

    Ok::<_, ApiError>(Json(ApiResponse::success(data)))
}

/// Removes the record and its storage object. Descendants are left in
/// place: their `source_image_id` now dangles and readers tolerate it.
pub async fn delete_image(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let record = permissions::check_modify_permission(store, &id, Some(&auth.user))?;

    if let Err(e) = state.media.delete(&record.name).await {
        tracing::warn!("Failed to delete object {}: {e}", record.name);
    }

    store
        .delete_image(&record.id)
        .api_err("Failed to delete image")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// Direct children of the image, newest first.
pub async fn list_image_derivatives(
    OptionalUser(user): OptionalUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let view = permissions::check_view_permission(store, &id, user.as_ref())?;
    let derivatives = provenance::get_derivatives(store, &view.record.id)?;

    let base_url = state.public_base_url.as_deref();
    let derivatives = derivatives
        .iter()
        .map(|record| ImageData::from_record(record, base_url).with_provenance(record))
        .collect();

    Ok::<_, ApiError>(Json(DerivativesResponse { derivatives }))
}

/// The full derivation tree the image belongs to, as a flat list ordered
/// for single-pass tree building (depth, then creation time).
pub async fn get_image_tree(
    OptionalUser(user): OptionalUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let view = permissions::check_view_permission(store, &id, user.as_ref())?;
    let query = provenance::get_tree(store, &view.record.id)?;

    let base_url = state.public_base_url.as_deref();
    let tree = query
        .tree
        .iter()
        .map(|record| ImageData::from_record(record, base_url).with_provenance(record))
        .collect();

    Ok::<_, ApiError>(Json(TreeResponse {
        root_image_id: query.root_image_id,
        tree,
    }))
}

/// The image's ancestry chain, root first.
pub async fn get_image_provenance(
    OptionalUser(user): OptionalUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let view = permissions::check_view_permission(store, &id, user.as_ref())?;
    let chain = provenance::get_ancestry(store, &view.record.id)?;

    let base_url = state.public_base_url.as_deref();
    let ancestry = chain
        .iter()
        .map(|record| ImageData::from_record(record, base_url).with_provenance(record))
        .collect();

    Ok::<_, ApiError>(Json(AncestryResponse { ancestry }))
}

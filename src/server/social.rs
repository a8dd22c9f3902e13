use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{OptionalUser, RequireUser};
use crate::permissions;
use crate::server::AppState;
use crate::server::dto::{
    CommentResponse, CommentsResponse, CreateCommentRequest, LikeStatusResponse,
    LikeToggleResponse,
};
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_comment_text;
use crate::types::{CommentRecord, LikeRecord};

pub async fn get_likes(
    OptionalUser(user): OptionalUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let view = permissions::check_view_permission(store, &id, user.as_ref())?;

    let user_liked = match &user {
        Some(user) => store
            .get_like(&view.record.id, &user.id)
            .api_err("Failed to check like")?
            .is_some(),
        None => false,
    };

    Ok::<_, ApiError>(Json(LikeStatusResponse {
        like_count: view.record.likes_count,
        user_liked,
    }))
}

/// Toggles the requester's like. The counter moves by an atomic increment
/// alongside the like row; it is never recomputed from the likes table.
pub async fn toggle_like(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let view = permissions::check_view_permission(store, &id, Some(&auth.user))?;
    let image_id = view.record.id;

    let liked = if store
        .get_like(&image_id, &auth.user.id)
        .api_err("Failed to check like")?
        .is_some()
    {
        store
            .delete_like(&image_id, &auth.user.id)
            .api_err("Failed to remove like")?;
        store
            .adjust_likes_count(&image_id, -1)
            .api_err("Failed to update like count")?;
        false
    } else {
        let like = LikeRecord {
            id: Uuid::new_v4().to_string(),
            image_id: image_id.clone(),
            user_id: auth.user.id.clone(),
            created_at: Utc::now(),
        };
        store.create_like(&like).api_err("Failed to create like")?;
        store
            .adjust_likes_count(&image_id, 1)
            .api_err("Failed to update like count")?;
        true
    };

    let like_count = store
        .get_image(&image_id)
        .api_err("Failed to get image")?
        .map_or(0, |record| record.likes_count);

    Ok::<_, ApiError>(Json(LikeToggleResponse { liked, like_count }))
}

pub async fn list_comments(
    OptionalUser(user): OptionalUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let view = permissions::check_view_permission(store, &id, user.as_ref())?;

    let comments = store
        .list_comments(&view.record.id)
        .api_err("Failed to list comments")?;

    Ok::<_, ApiError>(Json(CommentsResponse {
        comments: comments.into_iter().map(Into::into).collect(),
    }))
}

pub async fn create_comment(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let text = validate_comment_text(&req.text)?;

    let view = permissions::check_view_permission(store, &id, Some(&auth.user))?;

    let comment = CommentRecord {
        id: Uuid::new_v4().to_string(),
        image_id: view.record.id.clone(),
        user_id: auth.user.id.clone(),
        username: auth.user.username.clone(),
        text: text.to_string(),
        created_at: Utc::now(),
    };

    store
        .create_comment(&comment)
        .api_err("Failed to create comment")?;
    store
        .adjust_comments_count(&view.record.id, 1)
        .api_err("Failed to update comment count")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(CommentResponse {
            comment: comment.into(),
        }),
    ))
}

/// Authors may delete their own comments only.
pub async fn delete_comment(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let comment = store
        .get_comment(&id)
        .api_err("Failed to get comment")?
        .or_not_found("Comment not found")?;

    if comment.user_id != auth.user.id {
        return Err(ApiError::forbidden("Forbidden"));
    }

    store
        .delete_comment(&comment.id)
        .api_err("Failed to delete comment")?;
    store
        .adjust_comments_count(&comment.image_id, -1)
        .api_err("Failed to update comment count")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::provenance;
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, ListImagesParams, SyncResponse,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_username;
use crate::types::{Token, User};

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users", post(create_user))
        .route("/users/{id}/tokens", post(create_user_token))
        .route("/tokens/{id}", delete(delete_token))
        .route("/sync", post(sync_images))
}

async fn list_users(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListImagesParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = store
        .list_users(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |user| user.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

async fn create_user(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_username(&req.username)?;

    if store
        .get_user_by_username(&req.username)
        .api_err("Failed to check username")?
        .is_some()
    {
        return Err(ApiError::conflict("Username already exists"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        created_at: now,
        updated_at: now,
    };

    store.create_user(&user).api_err("Failed to create user")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

async fn create_user_token(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let user = store
        .get_user(&id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    let generator = TokenGenerator::new();
    let (raw_token, lookup, hash) = generator
        .generate()
        .map_err(|_| ApiError::internal("Failed to generate token"))?;

    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        is_admin: false,
        user_id: Some(user.id),
        created_at: Utc::now(),
        expires_at: req
            .expires_in_seconds
            .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        last_used_at: None,
    };

    store.create_token(&token).api_err("Failed to create token")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: token,
        })),
    ))
}

async fn delete_token(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_token(&id)
        .api_err("Failed to delete token")?;

    if !deleted {
        return Err(ApiError::not_found("Token not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// Reconciles storage with the database: any stored object without an
/// images row gets an ownerless root record. This is where legacy records
/// with no owner come from.
async fn sync_images(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let names = state
        .media
        .list_names()
        .await
        .map_err(|e| {
            tracing::error!("Failed to list stored objects: {e}");
            ApiError::internal("Storage error")
        })?;

    let mut synced = 0;
    for name in names {
        if store
            .get_image_by_name(&name)
            .api_err("Failed to check image")?
            .is_some()
        {
            continue;
        }

        // Object names are "<uuid>.<ext>"; reuse the uuid as the record id
        // when it parses, otherwise mint a new one.
        let stem = name.split('.').next().unwrap_or(&name);
        let id = Uuid::parse_str(stem)
            .map(|uuid| uuid.to_string())
            .unwrap_or_else(|_| Uuid::new_v4().to_string());

        provenance::create_root_image(store, &id, &name, None, state.settings.upload_visibility)?;
        synced += 1;
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(SyncResponse { synced })))
}

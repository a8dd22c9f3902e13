use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommentRecord, ImageRecord, Token, Visibility};

// ---------------------------------------------------------------------------
// Requests

#[derive(Debug, Default, Deserialize)]
pub struct ListImagesParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageRequest {
    pub image_base64: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Present together with `transformation_prompt` for derivatives.
    #[serde(default)]
    pub source_image_id: Option<String>,
    #[serde(default)]
    pub transformation_prompt: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateVisibilityRequest {
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformImageRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// When set, the server runs the whole pipeline against the stored
    /// source image and persists the result.
    #[serde(default)]
    pub source_image_id: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

// ---------------------------------------------------------------------------
// Responses

/// Provenance block of an image payload, present on lineage-aware
/// endpoints (tree, derivatives, ancestry, uploads) and omitted elsewhere.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceData {
    pub source_image_id: Option<String>,
    pub transformation_prompt: Option<String>,
    pub root_image_id: String,
    pub generation_depth: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub id: String,
    pub name: String,
    pub url: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_liked: Option<bool>,
    // A flattened None serializes to nothing, so basic payloads carry no
    // provenance keys at all.
    #[serde(flatten)]
    pub provenance: Option<ProvenanceData>,
}

impl ImageData {
    #[must_use]
    pub fn from_record(record: &ImageRecord, base_url: Option<&str>) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            url: media_url(base_url, &record.name),
            likes_count: record.likes_count,
            comments_count: record.comments_count,
            visibility: record.visibility,
            created_at: record.created_at,
            user_liked: None,
            provenance: None,
        }
    }

    #[must_use]
    pub fn with_provenance(mut self, record: &ImageRecord) -> Self {
        self.provenance = Some(ProvenanceData {
            source_image_id: record.source_image_id.clone(),
            transformation_prompt: record.transformation_prompt.clone(),
            root_image_id: record.root_image_id.clone(),
            generation_depth: record.generation_depth,
        });
        self
    }

    #[must_use]
    pub fn with_user_liked(mut self, liked: bool) -> Self {
        self.user_liked = Some(liked);
        self
    }
}

/// Resolves the public URL for a stored object name.
#[must_use]
pub fn media_url(base_url: Option<&str>, name: &str) -> String {
    match base_url {
        Some(base) => format!("{}/media/{name}", base.trim_end_matches('/')),
        None => format!("/media/{name}"),
    }
}

#[derive(Debug, Serialize)]
pub struct ImageDetail {
    pub id: String,
    pub name: String,
    pub url: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub user_liked: bool,
    pub visibility: Visibility,
    pub is_owner: bool,
    pub transformation_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageDetailResponse {
    pub image: ImageDetail,
    pub comments: Vec<CommentData>,
}

#[derive(Debug, Serialize)]
pub struct CommentData {
    pub id: String,
    pub text: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

impl From<CommentRecord> for CommentData {
    fn from(comment: CommentRecord) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            username: comment.username,
            created_at: comment.created_at,
            user_id: comment.user_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentData>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: CommentData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatusResponse {
    pub like_count: i64,
    pub user_liked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggleResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
pub struct DerivativesResponse {
    pub derivatives: Vec<ImageData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    pub root_image_id: String,
    pub tree: Vec<ImageData>,
}

#[derive(Debug, Serialize)]
pub struct AncestryResponse {
    pub ancestry: Vec<ImageData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformImageResponse {
    pub image_data: String,
    pub mime_type: String,
    /// The persisted derivative, present when the request named a stored
    /// source image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageData>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: Token,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub synced: usize,
}

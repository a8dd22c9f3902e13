use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Visibility;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// One row per stored image, original upload or AI-transformed derivative.
///
/// The provenance fields record how the image came to exist. A root record
/// (an original upload) has `source_image_id == None`,
/// `transformation_prompt == None`, `generation_depth == 0` and
/// `root_image_id == id`. A derivative points at its source, carries the
/// prompt that produced it, inherits the source's `root_image_id` and sits
/// one generation deeper. All four fields are set by the same insert and
/// never patched afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    /// Creator identity. `None` for legacy records reconciled from storage
    /// before authentication existed; nobody but the system may modify those.
    pub owner_id: Option<String>,
    /// Storage object name; resolves to the public media URL.
    pub name: String,
    pub visibility: Visibility,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub source_image_id: Option<String>,
    pub transformation_prompt: Option<String>,
    pub root_image_id: String,
    pub generation_depth: i64,
}

impl ImageRecord {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.source_image_id.is_none()
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub image_id: String,
    pub user_id: String,
    /// Display-name snapshot taken when the comment was written.
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRecord {
    pub id: String,
    pub image_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

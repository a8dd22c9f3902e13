mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Image operations
    fn create_image(&self, image: &ImageRecord) -> Result<()>;
    fn get_image(&self, id: &str) -> Result<Option<ImageRecord>>;
    fn get_image_by_name(&self, name: &str) -> Result<Option<ImageRecord>>;
    fn list_public_images(&self, cursor: &str, limit: i32) -> Result<Vec<ImageRecord>>;
    fn list_user_images(&self, owner_id: &str, cursor: &str, limit: i32)
    -> Result<Vec<ImageRecord>>;
    fn update_image_visibility(&self, id: &str, visibility: Visibility) -> Result<()>;
    fn delete_image(&self, id: &str) -> Result<bool>;

    // Provenance queries
    /// Walks `source_image_id` pointers upward from `id` using a recursive
    /// query and returns the chain root-first. `max_hops` bounds the walk;
    /// a result longer than `max_hops` means the forest is corrupted and the
    /// caller must treat it as an integrity failure.
    fn list_ancestry(&self, id: &str, max_hops: i64) -> Result<Vec<ImageRecord>>;
    /// All records sharing `root_image_id`, ordered by generation_depth
    /// ascending then created_at ascending. The ordering is load-bearing:
    /// consumers build the tree in a single pass relying on parents sorting
    /// before their children.
    fn list_lineage(&self, root_image_id: &str) -> Result<Vec<ImageRecord>>;
    /// Direct children only, newest first.
    fn list_derivatives(&self, source_image_id: &str) -> Result<Vec<ImageRecord>>;
    fn count_derived_since(&self, since: DateTime<Utc>) -> Result<i64>;

    // Like operations
    fn create_like(&self, like: &LikeRecord) -> Result<()>;
    fn get_like(&self, image_id: &str, user_id: &str) -> Result<Option<LikeRecord>>;
    fn delete_like(&self, image_id: &str, user_id: &str) -> Result<bool>;
    fn list_user_liked_image_ids(&self, user_id: &str, image_ids: &[String]) -> Result<Vec<String>>;
    fn adjust_likes_count(&self, image_id: &str, delta: i64) -> Result<()>;

    // Comment operations
    fn create_comment(&self, comment: &CommentRecord) -> Result<()>;
    fn get_comment(&self, id: &str) -> Result<Option<CommentRecord>>;
    fn list_comments(&self, image_id: &str) -> Result<Vec<CommentRecord>>;
    fn delete_comment(&self, id: &str) -> Result<bool>;
    fn adjust_comments_count(&self, image_id: &str, delta: i64) -> Result<()>;

    fn close(&self) -> Result<()>;
}

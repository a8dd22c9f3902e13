use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and throwaway tooling.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Unknown visibility values in the database are treated as private so a
/// bad row never widens access.
fn parse_visibility(s: &str) -> Visibility {
    s.parse().unwrap_or_else(|_| {
        tracing::error!("Invalid visibility in database: '{}'", s);
        Visibility::Private
    })
}

const IMAGE_FIELDS: &str = "id, owner_id, name, visibility, likes_count, comments_count, \
     created_at, source_image_id, transformation_prompt, root_image_id, generation_depth";

fn image_from_row(row: &Row) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        visibility: parse_visibility(&row.get::<_, String>(3)?),
        likes_count: row.get(4)?,
        comments_count: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        source_image_id: row.get(7)?,
        transformation_prompt: row.get(8)?,
        root_image_id: row.get(9)?,
        generation_depth: row.get(10)?,
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        image_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        text: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, username, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id,
                user.username,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, created_at, updated_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, created_at, updated_at FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, created_at, updated_at
             FROM users WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
                updated_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    is_admin: row.get(3)?,
                    user_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tokens WHERE is_admin = 1)",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // Image operations

    fn create_image(&self, image: &ImageRecord) -> Result<()> {
        // The four provenance fields travel in the same insert so a record
        // can never be observed with a partial provenance snapshot.
        self.conn().execute(
            "INSERT INTO images (id, owner_id, name, visibility, likes_count, comments_count,
                                 created_at, source_image_id, transformation_prompt,
                                 root_image_id, generation_depth)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                image.id,
                image.owner_id,
                image.name,
                image.visibility.as_str(),
                image.likes_count,
                image.comments_count,
                format_datetime(&image.created_at),
                image.source_image_id,
                image.transformation_prompt,
                image.root_image_id,
                image.generation_depth,
            ],
        )?;
        Ok(())
    }

    fn get_image(&self, id: &str) -> Result<Option<ImageRecord>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IMAGE_FIELDS} FROM images WHERE id = ?1"),
            params![id],
            image_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_image_by_name(&self, name: &str) -> Result<Option<ImageRecord>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IMAGE_FIELDS} FROM images WHERE name = ?1"),
            params![name],
            image_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_public_images(&self, cursor: &str, limit: i32) -> Result<Vec<ImageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {IMAGE_FIELDS} FROM images
             WHERE visibility = 'public' AND (?1 = '' OR created_at < ?1)
             ORDER BY created_at DESC LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], image_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_images(
        &self,
        owner_id: &str,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<ImageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {IMAGE_FIELDS} FROM images
             WHERE owner_id = ?1 AND (?2 = '' OR created_at < ?2)
             ORDER BY created_at DESC LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![owner_id, cursor, limit], image_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_image_visibility(&self, id: &str, visibility: Visibility) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE images SET visibility = ?1 WHERE id = ?2",
            params![visibility.as_str(), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_image(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM images WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Provenance queries

    fn list_ancestry(&self, id: &str, max_hops: i64) -> Result<Vec<ImageRecord>> {
        let conn = self.conn();
        // hops counts edges walked from the starting record. The recursion
        // is allowed one row past max_hops so the caller can detect a chain
        // that is longer than the starting record's generation_depth admits.
        let mut stmt = conn.prepare(
            "WITH RECURSIVE ancestry AS (
                 SELECT id, owner_id, name, visibility, likes_count, comments_count,
                        created_at, source_image_id, transformation_prompt,
                        root_image_id, generation_depth, 0 AS hops
                 FROM images WHERE id = ?1
                 UNION ALL
                 SELECT i.id, i.owner_id, i.name, i.visibility, i.likes_count, i.comments_count,
                        i.created_at, i.source_image_id, i.transformation_prompt,
                        i.root_image_id, i.generation_depth, a.hops + 1
                 FROM images i JOIN ancestry a ON i.id = a.source_image_id
                 WHERE a.hops < ?2
             )
             SELECT id, owner_id, name, visibility, likes_count, comments_count,
                    created_at, source_image_id, transformation_prompt,
                    root_image_id, generation_depth
             FROM ancestry ORDER BY hops DESC",
        )?;

        let rows = stmt.query_map(params![id, max_hops], image_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_lineage(&self, root_image_id: &str) -> Result<Vec<ImageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {IMAGE_FIELDS} FROM images
             WHERE root_image_id = ?1
             ORDER BY generation_depth ASC, created_at ASC"
        ))?;

        let rows = stmt.query_map(params![root_image_id], image_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_derivatives(&self, source_image_id: &str) -> Result<Vec<ImageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {IMAGE_FIELDS} FROM images
             WHERE source_image_id = ?1
             ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![source_image_id], image_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_derived_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM images
             WHERE source_image_id IS NOT NULL AND created_at >= ?1",
            params![format_datetime(&since)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Like operations

    fn create_like(&self, like: &LikeRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO likes (id, image_id, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                like.id,
                like.image_id,
                like.user_id,
                format_datetime(&like.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_like(&self, image_id: &str, user_id: &str) -> Result<Option<LikeRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, image_id, user_id, created_at
             FROM likes WHERE image_id = ?1 AND user_id = ?2",
            params![image_id, user_id],
            |row| {
                Ok(LikeRecord {
                    id: row.get(0)?,
                    image_id: row.get(1)?,
                    user_id: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_like(&self, image_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM likes WHERE image_id = ?1 AND user_id = ?2",
            params![image_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn list_user_liked_image_ids(&self, user_id: &str, image_ids: &[String]) -> Result<Vec<String>> {
        if image_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let placeholders = vec!["?"; image_ids.len()].join(", ");
        let sql = format!(
            "SELECT image_id FROM likes WHERE user_id = ? AND image_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;

        let bindings = std::iter::once(user_id.to_string()).chain(image_ids.iter().cloned());
        let rows = stmt.query_map(params_from_iter(bindings), |row| row.get::<_, String>(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn adjust_likes_count(&self, image_id: &str, delta: i64) -> Result<()> {
        // Atomic at the datastore level; callers never read-modify-write.
        self.conn().execute(
            "UPDATE images SET likes_count = MAX(0, likes_count + ?1) WHERE id = ?2",
            params![delta, image_id],
        )?;
        Ok(())
    }

    // Comment operations

    fn create_comment(&self, comment: &CommentRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO comments (id, image_id, user_id, username, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                comment.id,
                comment.image_id,
                comment.user_id,
                comment.username,
                comment.text,
                format_datetime(&comment.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_comment(&self, id: &str) -> Result<Option<CommentRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, image_id, user_id, username, text, created_at
             FROM comments WHERE id = ?1",
            params![id],
            comment_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_comments(&self, image_id: &str) -> Result<Vec<CommentRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, image_id, user_id, username, text, created_at
             FROM comments WHERE image_id = ?1 ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![image_id], comment_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_comment(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn adjust_comments_count(&self, image_id: &str, delta: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE images SET comments_count = MAX(0, comments_count + ?1) WHERE id = ?2",
            params![delta, image_id],
        )?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub const SCHEMA: &str = r#"
-- Users own images; tokens are just auth credentials for users
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,  -- admin tokens only access /api/v1/admin/* routes

    -- User binding (required for non-admin tokens, NULL only for admin tokens)
    user_id TEXT REFERENCES users(id) ON DELETE CASCADE,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Images: one row per stored object, upload or derivative.
-- Provenance lives in this relation; forest integrity is enforced by the
-- provenance engine, not by foreign keys. source_image_id intentionally has
-- no FK: deleting a source leaves the pointer dangling and readers must
-- tolerate that.
CREATE TABLE IF NOT EXISTS images (
    id TEXT PRIMARY KEY,
    owner_id TEXT REFERENCES users(id),   -- NULL = ownerless legacy record
    name TEXT NOT NULL UNIQUE,            -- storage object name
    visibility TEXT NOT NULL DEFAULT 'unlisted',

    -- Denormalized engagement counters, maintained by atomic increments
    likes_count INTEGER NOT NULL DEFAULT 0,
    comments_count INTEGER NOT NULL DEFAULT 0,

    created_at TEXT DEFAULT (datetime('now')),

    -- Provenance
    source_image_id TEXT,                 -- NULL = root record
    transformation_prompt TEXT,           -- NULL iff source_image_id is NULL
    root_image_id TEXT NOT NULL,          -- equals id for root records
    generation_depth INTEGER NOT NULL DEFAULT 0
);

-- Likes, unique per (image, user)
CREATE TABLE IF NOT EXISTS likes (
    id TEXT PRIMARY KEY,
    image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(image_id, user_id)
);

-- Comments carry a display-name snapshot taken at write time
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    username TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_images_owner ON images(owner_id);
CREATE INDEX IF NOT EXISTS idx_images_visibility_created ON images(visibility, created_at);
CREATE INDEX IF NOT EXISTS idx_images_source ON images(source_image_id);
CREATE INDEX IF NOT EXISTS idx_images_root ON images(root_image_id);
CREATE INDEX IF NOT EXISTS idx_likes_image ON likes(image_id);
CREATE INDEX IF NOT EXISTS idx_comments_image ON comments(image_id);
"#;

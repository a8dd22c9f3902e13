#![allow(dead_code)]

use chrono::Utc;
use uuid::Uuid;

use mememaker::provenance;
use mememaker::store::{SqliteStore, Store};
use mememaker::types::{ImageRecord, User, Visibility};

pub fn open_store() -> SqliteStore {
    let store = SqliteStore::in_memory().expect("open in-memory store");
    store.initialize().expect("initialize schema");
    store
}

pub fn create_user(store: &dyn Store, username: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user).expect("create user");
    user
}

/// Inserts a root record the way an upload would.
pub fn upload_root(store: &dyn Store, owner: &User, visibility: Visibility) -> ImageRecord {
    let id = Uuid::new_v4().to_string();
    let name = format!("{id}.png");
    provenance::create_root_image(store, &id, &name, Some(owner), visibility)
        .expect("create root image")
}

/// Inserts a derivative record the way a completed transformation would.
pub fn derive(store: &dyn Store, source: &ImageRecord, prompt: &str, owner: &User) -> ImageRecord {
    let id = Uuid::new_v4().to_string();
    let name = format!("{id}.png");
    provenance::record_transformation(
        store,
        &source.id,
        &id,
        &name,
        prompt,
        owner,
        Visibility::Unlisted,
    )
    .expect("record transformation")
}

pub fn ids(records: &[ImageRecord]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}

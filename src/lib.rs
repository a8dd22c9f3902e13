//! # Mememaker
//!
//! A social image-sharing and AI-editing server, usable both as a standalone
//! binary and as a library. Uploaded images can be transformed through a
//! generative model; every result is recorded as a derivative of its source,
//! forming derivation trees that can be browsed, liked and commented on with
//! per-image visibility control.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! mememaker = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use mememaker::config::AppSettings;
//! use mememaker::media::MediaStorage;
//! use mememaker::server::{AppState, create_router};
//! use mememaker::store::{SqliteStore, Store};
//! use mememaker::transform::GenerativeImageClient;
//!
//! let data_dir = PathBuf::from("./data");
//! let store = SqliteStore::new(data_dir.join("mememaker.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let settings = AppSettings::default();
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     media: MediaStorage::new(&data_dir),
//!     transformer: GenerativeImageClient::new(
//!         settings.transform.api_url.clone(),
//!         settings.resolved_api_key().unwrap_or_default(),
//!     ),
//!     public_base_url: None,
//!     settings,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod permissions;
pub mod provenance;
pub mod server;
pub mod store;
pub mod transform;
pub mod types;

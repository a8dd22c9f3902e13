mod server;

pub use server::{AppSettings, ServerConfig, TransformSettings};

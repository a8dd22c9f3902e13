use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::transform::DEFAULT_API_URL;
use crate::types::Visibility;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://memes.example.com").
    /// Used for generating media URLs. If not set, URLs are served relative.
    pub public_base_url: Option<String>,
    pub settings: AppSettings,
}

/// Application settings from `<data_dir>/mememaker.toml`. Everything has a
/// default so the file is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// Default visibility for plain uploads.
    pub upload_visibility: Visibility,
    /// Default visibility for AI-derived images.
    pub derived_visibility: Visibility,
    /// Calendar-month cap on transformations, to control API spend.
    /// Absent = unlimited.
    pub monthly_transformation_limit: Option<i64>,
    pub transform: TransformSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformSettings {
    pub api_url: String,
    /// Falls back to the GEMINI_API_KEY environment variable when unset.
    pub api_key: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            upload_visibility: Visibility::Public,
            derived_visibility: Visibility::Unlisted,
            monthly_transformation_limit: Some(1000),
            transform: TransformSettings::default(),
        }
    }
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
        }
    }
}

impl AppSettings {
    /// Loads settings from `path`, or defaults when the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        self.transform
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address: {e}")))
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("mememaker.db")
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("mememaker.toml")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            settings: AppSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.upload_visibility, Visibility::Public);
        assert_eq!(settings.derived_visibility, Visibility::Unlisted);
        assert_eq!(settings.monthly_transformation_limit, Some(1000));
        assert_eq!(settings.transform.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_settings_parse() {
        let settings: AppSettings = toml::from_str(
            r#"
            upload_visibility = "unlisted"
            derived_visibility = "private"
            monthly_transformation_limit = 50

            [transform]
            api_url = "https://example.com/generate"
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(settings.upload_visibility, Visibility::Unlisted);
        assert_eq!(settings.derived_visibility, Visibility::Private);
        assert_eq!(settings.monthly_transformation_limit, Some(50));
        assert_eq!(settings.transform.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_settings_reject_unknown_keys() {
        let result: std::result::Result<AppSettings, _> = toml::from_str("unknown_key = 1");
        assert!(result.is_err());
    }
}

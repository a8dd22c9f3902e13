use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("object not found")]
    NotFound,
    #[error("invalid object name")]
    InvalidName,
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaStorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// A stored object. `id` doubles as the image record id; `name` is the
/// on-disk object name the public URL is derived from.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub id: String,
    pub name: String,
}

/// Disk-backed object storage for image bytes.
///
/// Objects are written to a temp file and renamed into place, sharded by
/// the first two characters of the object name.
pub struct MediaStorage {
    base_path: PathBuf,
}

impl MediaStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("media"),
        }
    }

    fn object_path(&self, name: &str) -> PathBuf {
        let prefix = &name[0..2];
        self.base_path.join("objects").join(prefix).join(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn exists(&self, name: &str) -> Result<bool, MediaStorageError> {
        validate_object_name(name)?;
        Ok(self.object_path(name).exists())
    }

    pub async fn get(&self, name: &str) -> Result<(BufReader<File>, i64), MediaStorageError> {
        validate_object_name(name)?;
        let path = self.object_path(name);
        let file = File::open(&path)
            .await
            .map_err(MediaStorageError::from_io)?;

        let metadata = file.metadata().await?;
        let size = metadata.len() as i64;

        Ok((BufReader::new(file), size))
    }

    /// Stores `data` under a freshly minted id and returns the object
    /// handle. The id is never reused, even after deletion.
    pub async fn put(&self, data: &[u8], mime_type: &str) -> Result<StoredObject, MediaStorageError> {
        let ext = extension_for_mime(mime_type)
            .ok_or_else(|| MediaStorageError::UnsupportedMediaType(mime_type.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let name = format!("{id}.{ext}");

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        let final_path = self.object_path(&name);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&temp_path, &final_path).await?;

        Ok(StoredObject { id, name })
    }

    pub async fn delete(&self, name: &str) -> Result<bool, MediaStorageError> {
        validate_object_name(name)?;
        let path = self.object_path(name);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MediaStorageError::Io(e)),
        }
    }

    /// Walks the shard directories and returns every stored object name.
    /// Used by the reconcile pass that backfills records for orphaned files.
    pub async fn list_names(&self) -> Result<Vec<String>, MediaStorageError> {
        let objects_dir = self.base_path.join("objects");
        let mut names = Vec::new();

        let mut shards = match fs::read_dir(&objects_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(MediaStorageError::Io(e)),
        };

        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                if let Some(name) = entry.file_name().to_str() {
                    if is_valid_object_name(name) {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

fn validate_object_name(name: &str) -> Result<(), MediaStorageError> {
    if !is_valid_object_name(name) {
        return Err(MediaStorageError::InvalidName);
    }
    Ok(())
}

/// Object names are flat file names: no separators, no leading dot, short
/// enough for any filesystem.
#[must_use]
pub fn is_valid_object_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > 128 {
        return false;
    }
    if name.starts_with('.') || name.starts_with('-') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

#[must_use]
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[must_use]
pub fn mime_for_name(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn test_data() -> Vec<u8> {
        b"not really a png".to_vec()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        let data = test_data();
        let object = storage.put(&data, "image/png").await.unwrap();

        assert_eq!(object.name, format!("{}.png", object.id));
        assert!(storage.exists(&object.name).await.unwrap());

        let (mut reader, size) = storage.get(&object.name).await.unwrap();
        assert_eq!(size, data.len() as i64);

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, data);
    }

    #[tokio::test]
    async fn test_put_mints_fresh_ids() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        let a = storage.put(&test_data(), "image/png").await.unwrap();
        let b = storage.put(&test_data(), "image/png").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.name, b.name);
    }

    #[tokio::test]
    async fn test_unsupported_media_type() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        let result = storage.put(&test_data(), "text/html").await;
        assert!(matches!(
            result,
            Err(MediaStorageError::UnsupportedMediaType(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_name() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        assert!(matches!(
            storage.get("../etc/passwd").await,
            Err(MediaStorageError::InvalidName)
        ));
        assert!(matches!(
            storage.get(".hidden").await,
            Err(MediaStorageError::InvalidName)
        ));
    }

    #[tokio::test]
    async fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        assert!(!storage.exists("missing.png").await.unwrap());
        assert!(matches!(
            storage.get("missing.png").await,
            Err(MediaStorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        let object = storage.put(&test_data(), "image/webp").await.unwrap();
        assert!(storage.delete(&object.name).await.unwrap());
        assert!(!storage.exists(&object.name).await.unwrap());
        assert!(!storage.delete(&object.name).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_names() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path());

        assert!(storage.list_names().await.unwrap().is_empty());

        let a = storage.put(&test_data(), "image/png").await.unwrap();
        let b = storage.put(&test_data(), "image/jpeg").await.unwrap();

        let mut expected = vec![a.name, b.name];
        expected.sort();
        assert_eq!(storage.list_names().await.unwrap(), expected);
    }

    #[test]
    fn test_mime_for_name() {
        assert_eq!(mime_for_name("a1b2.png"), "image/png");
        assert_eq!(mime_for_name("a1b2.jpg"), "image/jpeg");
        assert_eq!(mime_for_name("a1b2"), "application/octet-stream");
    }
}

mod storage;

pub use storage::{MediaStorage, MediaStorageError, StoredObject, extension_for_mime, is_valid_object_name, mime_for_name};

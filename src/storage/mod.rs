//! Storage module for thumbnail and upload objects
//!
//! One `ContentStore` trait, two backends:
//! - `S3Store`: MinIO, Cloudflare R2, Backblaze B2, AWS S3, Synology (path-style)
//! - `LocalStore`: a directory on disk, served back through `/files`
//!
//! The backend is chosen once at startup from `StorageConfig::provider`.

mod local;
mod s3_client;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::StorageError;

pub use local::LocalStore;
pub use s3_client::S3Store;

/// Content types accepted for user image uploads (avatars)
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Object storage keyed by `{user_id}/{folder}/{filename}`
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Write `content` at `key`, replacing any existing object
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Existence probe that never transfers the object body
    async fn file_exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Download an object; `Ok(None)` when the key is absent
    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete an object. A missing key counts as success.
    async fn delete(&self, key: &str) -> bool;

    /// Public URL for a key, or `None` for an empty key
    fn resolve_url(&self, key: &str) -> Option<String>;

    /// Upload raw bytes under `{user_id}/{folder}/{filename}` and return the key.
    ///
    /// Without a filename a random `{uuid}.png` name is generated, which is
    /// only useful when the caller keeps the returned key.
    async fn upload_bytes(
        &self,
        content: Vec<u8>,
        user_id: i64,
        folder: &str,
        filename: Option<&str>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let name = match filename {
            Some(name) => name.to_string(),
            None => generated_filename("png"),
        };
        let key = build_key(user_id, folder, &name);
        self.put_object(&key, content, content_type).await?;
        Ok(key)
    }
}

/// Shared handle to the configured backend
pub type SharedStore = Arc<dyn ContentStore>;

/// Build the backend selected by configuration
pub async fn connect(config: &StorageConfig) -> Result<SharedStore, StorageError> {
    if config.provider.is_s3_compatible() {
        let store = S3Store::connect(config).await?;
        Ok(Arc::new(store))
    } else {
        let store = LocalStore::open(&config.local_root, &config.public_url).await?;
        Ok(Arc::new(store))
    }
}

/// Storage key layout shared by every backend
pub fn build_key(user_id: i64, folder: &str, filename: &str) -> String {
    format!("{}/{}/{}", user_id, folder, filename)
}

/// Random object name with the given extension
pub fn generated_filename(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), extension)
}

pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// Reject keys that could escape a backend root or produce ambiguous paths
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Folder names are a single key segment or a `/`-separated relative path
pub fn validate_folder(folder: &str) -> Result<(), StorageError> {
    validate_key(folder)
}

/// Store a user-supplied image under a generated name (avatar-style upload)
pub async fn upload_image(
    store: &dyn ContentStore,
    content: Vec<u8>,
    content_type: &str,
    original_name: Option<&str>,
    user_id: i64,
    folder: &str,
) -> Result<String, StorageError> {
    if !is_allowed_image_type(content_type) {
        return Err(StorageError::ContentTypeNotAllowed(content_type.to_string()));
    }
    validate_folder(folder)?;

    let extension = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string());

    let filename = generated_filename(&extension);
    store
        .upload_bytes(content, user_id, folder, Some(&filename), content_type)
        .await
}

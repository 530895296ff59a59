//! Local filesystem object storage
//!
//! Objects live at `{root}/{key}`. Writes go to a temporary sibling file and
//! are renamed into place so readers never observe a partial object.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageError;

use super::{validate_key, ContentStore};

/// Filesystem-backed content store
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    public_url: String,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl AsRef<Path>, public_url: &str) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        tracing::info!(root = %root.display(), "Using local object storage");

        Ok(Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        tokio::fs::create_dir_all(parent).await?;

        let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, &content).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(key = %key, size = content.len(), "Stored object");
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let path = match self.object_path(key) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(key = %key, "Refusing to delete: {}", e);
                return false;
            }
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                tracing::error!(key = %key, "Error deleting file: {}", e);
                false
            }
        }
    }

    fn resolve_url(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.public_url, key))
    }
}

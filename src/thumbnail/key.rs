//! Deterministic storage keys for thumbnails

use std::fmt;

use crate::storage::build_key;

/// Storage key of a thumbnail: `{user_id}/{folder}/{basename(pdf_url)}.png`.
///
/// Render width is deliberately absent, so every width maps to the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    user_id: i64,
    folder: String,
    filename: String,
}

impl ThumbnailKey {
    pub fn new(pdf_url: &str, user_id: i64, folder: &str) -> Self {
        Self {
            user_id,
            folder: folder.to_string(),
            filename: thumbnail_filename(pdf_url),
        }
    }

    /// Object name within the folder
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn as_key(&self) -> String {
        build_key(self.user_id, &self.folder, &self.filename)
    }
}

impl fmt::Display for ThumbnailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.folder, self.filename)
    }
}

/// Last path segment of the URL with `.png` appended
pub fn thumbnail_filename(pdf_url: &str) -> String {
    let basename = pdf_url.rsplit('/').next().unwrap_or(pdf_url);
    format!("{}.png", basename)
}

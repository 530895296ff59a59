use thiserror::Error;

use crate::error::StorageError;
use crate::pdf::RenderError;

use super::fetcher::FetchError;

/// A single thumbnail pipeline failure.
///
/// Never leaves the orchestrator: public operations turn it into `None`.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("no public URL for key {0}")]
    Unresolvable(String),
}

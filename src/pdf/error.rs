//! Render error types

use thiserror::Error;

/// Failures while turning PDF bytes into a PNG
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Target width must be positive")]
    InvalidWidth,

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Malformed PDF: {0}")]
    Malformed(String),

    #[error("Image encoding error: {0}")]
    Encode(String),

    #[error("Render timed out after {0} seconds")]
    Timeout(u64),

    #[error("Render task failed: {0}")]
    Join(String),
}

impl From<mupdf::Error> for RenderError {
    fn from(err: mupdf::Error) -> Self {
        RenderError::Malformed(err.to_string())
    }
}

//! First-page thumbnail pipeline
//!
//! `ThumbnailService` turns a PDF URL into a public image URL, caching the
//! rendered PNG in the configured content store under a deterministic key.

mod error;
mod fetcher;
mod key;
mod service;
mod workers;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ThumbnailError;
pub use fetcher::{FetchError, HttpFetcher, PdfFetcher};
pub use key::{thumbnail_filename, ThumbnailKey};
pub use service::{BulkOptions, ThumbnailMode, ThumbnailService};
pub use workers::BackgroundPool;

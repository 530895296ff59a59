//! arXiv API access
//!
//! Query building, the HTTP client and Atom parsing for
//! `http://export.arxiv.org/api/query`.

mod client;
mod parser;
mod types;

use thiserror::Error;

pub use client::ArxivClient;
pub use parser::parse_feed;
pub use types::{split_topics, topic_query, ArxivEntry, PageOptions, SortBy, SortOrder};

#[cfg(test)]
pub(crate) use client::tests::fixture_api;
#[cfg(test)]
pub(crate) use parser::tests::SAMPLE_FEED;

#[derive(Debug, Error)]
pub enum ArxivError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("arXiv returned HTTP {0}")]
    Status(u16),

    #[error("malformed Atom feed: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for ArxivError {
    fn from(err: quick_xml::Error) -> Self {
        ArxivError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ArxivError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ArxivError::Xml(err.to_string())
    }
}

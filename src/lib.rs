//! Arxiver Server Library
//!
//! arXiv search and topic feeds with first-page PDF thumbnails cached on
//! S3-compatible storage. The server binary lives in main.rs; the library is
//! what benchmarks and tests link against.
//!
//! # Modules
//!
//! - `arxiv`: Atom feed client and parser
//! - `thumbnail`: fetch, render and store pipeline plus bulk population
//! - `pdf`: first-page rendering via MuPDF
//! - `storage`: content store backends (S3-compatible, local)

pub mod arxiv;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod thumbnail;

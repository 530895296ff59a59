//! First-page PDF rendering
//!
//! MuPDF does the rasterization; the `image` crate does PNG encoding.
//! Rendering is CPU-bound and always runs on the blocking thread pool.

mod error;
mod renderer;

pub use error::RenderError;
pub use renderer::{
    compute_scale, render_first_page_blocking, MupdfRenderer, PageRenderer, RenderedImage,
    MAX_SCALE, MIN_SCALE,
};

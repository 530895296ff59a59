//! MuPDF first-page renderer

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix};
use tokio::time::timeout;

use super::error::RenderError;

/// Lower bound for the page scale factor
pub const MIN_SCALE: f32 = 0.5;
/// Upper bound for the page scale factor
pub const MAX_SCALE: f32 = 6.0;

/// PNG bytes plus the raster size they encode
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Renders the first page of a PDF to PNG
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_first_page(
        &self,
        pdf: Vec<u8>,
        target_width: u32,
    ) -> Result<RenderedImage, RenderError>;
}

/// Scale that maps `page_width_points` onto `target_width` pixels.
///
/// Clamped to [`MIN_SCALE`, `MAX_SCALE`] so degenerate page sizes or huge
/// targets cannot produce absurd bitmaps.
pub fn compute_scale(target_width: u32, page_width_points: f32) -> f32 {
    let width = if page_width_points.is_finite() {
        page_width_points.max(1.0)
    } else {
        1.0
    };
    (target_width as f32 / width).clamp(MIN_SCALE, MAX_SCALE)
}

/// MuPDF-backed renderer running on the blocking pool
#[derive(Debug, Clone)]
pub struct MupdfRenderer {
    timeout: Duration,
}

impl MupdfRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for MupdfRenderer {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl PageRenderer for MupdfRenderer {
    async fn render_first_page(
        &self,
        pdf: Vec<u8>,
        target_width: u32,
    ) -> Result<RenderedImage, RenderError> {
        if target_width == 0 {
            return Err(RenderError::InvalidWidth);
        }

        // Some PDFs make MuPDF spin for a long time. The blocking thread may
        // keep running after the timeout, but the caller gets its answer.
        let render_result = timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || render_first_page_blocking(&pdf, target_width)),
        )
        .await;

        match render_result {
            Ok(join_result) => {
                join_result.map_err(|e| RenderError::Join(format!("Task join error: {}", e)))?
            }
            Err(_) => Err(RenderError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// Synchronous render of page 0. Call from a blocking context only.
pub fn render_first_page_blocking(
    data: &[u8],
    target_width: u32,
) -> Result<RenderedImage, RenderError> {
    if target_width == 0 {
        return Err(RenderError::InvalidWidth);
    }

    let doc = Document::from_bytes(data, "application/pdf")?;
    if doc.page_count()? <= 0 {
        return Err(RenderError::EmptyDocument);
    }

    let page = doc.load_page(0)?;
    let bounds = page.bounds()?;
    let scale = compute_scale(target_width, bounds.x1 - bounds.x0);

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;

    encode_png(&pixmap)
}

fn encode_pixmap_rgb(pixmap: &mupdf::Pixmap) -> Result<RgbImage, RenderError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    if width == 0 || height == 0 {
        return Err(RenderError::Encode("Empty raster".to_string()));
    }

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| RenderError::Encode("Failed to create image buffer".to_string()))
}

fn encode_png(pixmap: &mupdf::Pixmap) -> Result<RenderedImage, RenderError> {
    let img = encode_pixmap_rgb(pixmap)?;
    let (width, height) = img.dimensions();

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    Ok(RenderedImage {
        data: output,
        width,
        height,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Hand-built PDF with one page of the given size (or no pages)
    pub(crate) fn minimal_pdf(page_size: Option<(f32, f32)>) -> Vec<u8> {
        let mut objects = vec!["<< /Type /Catalog /Pages 2 0 R >>".to_string()];
        match page_size {
            Some((width, height)) => {
                objects.push("<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string());
                objects.push(format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] >>",
                    width, height
                ));
            }
            None => objects.push("<< /Type /Pages /Kids [] /Count 0 >>".to_string()),
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_start = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_start
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_scale_clamps_narrow_pages() {
        // 1024 / 10 would be 102.4
        assert_eq!(compute_scale(1024, 10.0), MAX_SCALE);
    }

    #[test]
    fn test_scale_for_letter_page() {
        let scale = compute_scale(400, 612.0);
        assert!((scale - 400.0 / 612.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_lower_bound_and_degenerate_width() {
        assert_eq!(compute_scale(10, 612.0), MIN_SCALE);
        assert_eq!(compute_scale(3, 0.0), 3.0);
        assert_eq!(compute_scale(1024, -5.0), MAX_SCALE);
        assert_eq!(compute_scale(1024, f32::NAN), MAX_SCALE);
    }

    #[test]
    fn test_render_applies_clamped_scale() {
        let pdf = minimal_pdf(Some((10.0, 20.0)));
        let image = render_first_page_blocking(&pdf, 1024).unwrap();

        assert_eq!(image.width, 60);
        assert_eq!(image.height, 120);

        let decoded = image::load_from_memory(&image.data).unwrap();
        assert_eq!(decoded.width(), 60);
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_render_preserves_aspect_ratio() {
        let pdf = minimal_pdf(Some((612.0, 792.0)));
        let image = render_first_page_blocking(&pdf, 306).unwrap();

        assert_eq!(image.width, 306);
        assert_eq!(image.height, 396);
    }

    #[test]
    fn test_render_rejects_zero_width() {
        let pdf = minimal_pdf(Some((612.0, 792.0)));
        assert!(matches!(
            render_first_page_blocking(&pdf, 0),
            Err(RenderError::InvalidWidth)
        ));
    }

    #[test]
    fn test_render_rejects_garbage() {
        assert!(render_first_page_blocking(b"definitely not a pdf", 400).is_err());
    }

    #[test]
    fn test_render_empty_document() {
        let pdf = minimal_pdf(None);
        assert!(render_first_page_blocking(&pdf, 400).is_err());
    }

    #[tokio::test]
    async fn test_async_renderer_offloads_work() {
        let renderer = MupdfRenderer::default();
        let image = renderer
            .render_first_page(minimal_pdf(Some((200.0, 100.0))), 400)
            .await
            .unwrap();

        assert_eq!((image.width, image.height), (400, 200));
        assert!(!image.is_empty());
    }
}

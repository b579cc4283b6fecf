//! PDF rasterisation via pdfium.
//!
//! pdfium keeps thread-local state and is not async-safe, so every call here
//! runs inside `tokio::task::spawn_blocking`. The document is reopened for
//! each batch; only one batch of decoded images is alive at a time.

use crate::config::ConversionConfig;
use crate::error::PaperShiftError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind pdfium: the configured library path if any, else the system library.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, PaperShiftError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| PaperShiftError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Count the pages of a PDF.
pub async fn page_count(pdf_path: &Path, config: &ConversionConfig) -> Result<usize, PaperShiftError> {
    let path = pdf_path.to_path_buf();
    let library = config.pdfium_library.clone();

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(library.as_deref())?;
        let document = open_document(&pdfium, &path)?;
        let count = document.pages().len() as usize;
        info!("PDF loaded: {} pages", count);
        Ok(count)
    })
    .await
    .map_err(|e| PaperShiftError::Internal(format!("Page-count task panicked: {}", e)))?
}

/// Rasterise the pages at `page_indices` (0-based).
///
/// Returns `(page_index, image)` pairs in the order requested.
pub async fn render_batch(
    pdf_path: &Path,
    config: &ConversionConfig,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, PaperShiftError> {
    let path = pdf_path.to_path_buf();
    let library = config.pdfium_library.clone();
    let dpi = config.effective_dpi();
    let max_height = config.target_height_px;
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        render_batch_blocking(&path, library, dpi, max_height, &indices)
    })
    .await
    .map_err(|e| PaperShiftError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_batch_blocking(
    pdf_path: &Path,
    library: Option<PathBuf>,
    dpi: u32,
    max_height: u32,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, PaperShiftError> {
    let pdfium = bind_pdfium(library.as_deref())?;
    let document = open_document(&pdfium, pdf_path)?;
    let pages = document.pages();

    let mut results = Vec::with_capacity(page_indices.len());
    for &idx in page_indices {
        let page = pages
            .get(idx as u16)
            .map_err(|e| PaperShiftError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let (width, height) = render_size(page.width().value, page.height().value, dpi, max_height);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PaperShiftError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push((idx, image));
    }

    Ok(results)
}

fn open_document<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, PaperShiftError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| PaperShiftError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })
}

/// Pixel size for a page of `width_pt` × `height_pt` points rendered at
/// `dpi`, scaled down so the height does not exceed `max_height`.
pub fn render_size(width_pt: f32, height_pt: f32, dpi: u32, max_height: u32) -> (i32, i32) {
    let scale = dpi as f32 / 72.0;
    let mut width = width_pt * scale;
    let mut height = height_pt * scale;

    if height > max_height as f32 {
        let shrink = max_height as f32 / height;
        width *= shrink;
        height = max_height as f32;
    }

    ((width.round() as i32).max(1), (height.round() as i32).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_at_72_dpi_is_unscaled() {
        assert_eq!(render_size(612.0, 792.0, 72, 2048), (612, 792));
    }

    #[test]
    fn a4_at_300_dpi_is_capped_to_target_height() {
        // A4 is 595 × 842 pt → 2479 × 3508 px at 300 DPI, above the 2048 cap.
        let (w, h) = render_size(595.0, 842.0, 300, 2048);
        assert_eq!(h, 2048);
        assert_eq!(w, (595.0_f32 * 2048.0 / 842.0).round() as i32);
    }

    #[test]
    fn small_render_is_not_enlarged() {
        let (w, h) = render_size(300.0, 400.0, 150, 2048);
        assert_eq!((w, h), (625, 833));
    }

    #[test]
    fn degenerate_page_still_has_one_pixel() {
        assert_eq!(render_size(0.0, 0.0, 300, 2048), (1, 1));
    }
}

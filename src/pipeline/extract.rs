//! PDF content extraction: text layer plus one raster per page, via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread, preventing the Tokio worker threads from stalling during
//! CPU-heavy rendering.
//!
//! ## Why rasterise at all?
//!
//! Answer sheets are mostly handwriting, and question papers carry diagrams
//! and equations the text layer garbles or drops. The page images are the
//! authoritative input for the vision model; the extracted text only speeds
//! up question/answer matching. Every page therefore yields exactly one
//! image even when its text layer is empty.
//!
//! ## Failure policy
//!
//! All-or-nothing: any parse or render failure aborts the whole document
//! with an error naming the offending file. Partial content would silently
//! grade a truncated answer sheet, which is worse than no grade.

use crate::config::EvaluationConfig;
use crate::document::{Document, PdfContent};
use crate::error::EvalError;
use crate::pipeline::encode;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Extract a document's full text and per-page JPEG rasters.
///
/// Pages are processed in order starting at 1. Page texts are joined with a
/// blank line and the final text is trimmed; page rasters are returned in
/// page order, one per page. The pdfium document handle and all bitmaps are
/// scoped to the blocking closure and released before this returns,
/// regardless of outcome.
pub async fn extract_content(
    document: &Document,
    config: &EvaluationConfig,
) -> Result<PdfContent, EvalError> {
    let path = document.path.to_path_buf();
    let name = document.display_name.clone();
    let scale = config.render_scale;
    let max_pixels = config.max_rendered_pixels;
    let quality = config.jpeg_quality;
    let password = config.password.clone();

    let role = document.role;
    let content = tokio::task::spawn_blocking(move || {
        extract_content_blocking(&path, &name, scale, max_pixels, quality, password.as_deref())
    })
    .await
    .map_err(|e| EvalError::Internal(format!("Extraction task panicked: {}", e)))??;

    info!(
        "{}: {} pages, {} chars of text",
        role,
        content.page_count(),
        content.text.len()
    );

    Ok(content)
}

/// Blocking implementation of content extraction.
fn extract_content_blocking(
    pdf_path: &Path,
    display_name: &str,
    scale: f32,
    max_pixels: u32,
    jpeg_quality: u8,
    password: Option<&str>,
) -> Result<PdfContent, EvalError> {
    let pdfium = Pdfium::default();

    let pdf_document =
        pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| EvalError::IngestionFailed {
                name: display_name.to_string(),
                detail: format!("{:?}", e),
            })?;

    let pages = pdf_document.pages();
    let total_pages = pages.len() as usize;
    debug!("'{}' loaded: {} pages", display_name, total_pages);

    // Upscale for legibility, capped so an outsized page cannot exhaust
    // memory; the cap scales the other dimension proportionally.
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut page_texts: Vec<String> = Vec::with_capacity(total_pages);
    let mut page_images = Vec::with_capacity(total_pages);

    for (index, page) in pages.iter().enumerate() {
        // Text layer: fragments joined with single spaces; fragments without
        // a text payload fall out via split_whitespace. A page that errors
        // here simply has no extractable text — the raster still carries it.
        let raw_text = page.text().map(|t| t.all()).unwrap_or_default();
        let page_text = raw_text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !page_text.is_empty() {
            page_texts.push(page_text);
        }

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| EvalError::IngestionFailed {
                    name: display_name.to_string(),
                    detail: format!("page {}: {:?}", index + 1, e),
                })?;

        let image = bitmap.as_image();
        debug!(
            "'{}' page {} → {}x{} px",
            display_name,
            index + 1,
            image.width(),
            image.height()
        );

        let encoded =
            encode::encode_page(&image, jpeg_quality).map_err(|e| EvalError::IngestionFailed {
                name: display_name.to_string(),
                detail: format!("page {} encoding: {}", index + 1, e),
            })?;
        page_images.push(encoded);
    }

    Ok(PdfContent {
        text: page_texts.join("\n\n").trim().to_string(),
        pages: page_images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Extraction against real PDFs is exercised by the gated end-to-end
    // tests; here we pin the text-joining contract on its own.

    #[test]
    fn page_texts_join_with_blank_line_and_trim() {
        let pages = ["  first page  ", "second page"];
        let joined = pages
            .iter()
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n\n")
            .trim()
            .to_string();
        assert_eq!(joined, "first page\n\nsecond page");
    }

    #[test]
    fn whitespace_only_page_contributes_no_text() {
        let normalised = "   \t \n ".split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(normalised.is_empty());
    }
}

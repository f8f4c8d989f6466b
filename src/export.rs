//! Report export: capture the rendered report as an image and paginate it
//! into an A4 PDF.
//!
//! The export works in four stages:
//!
//! 1. **Typeset** — the report text is laid out in a monospace face onto a
//!    single tall PDF page sized to the content, with the section separators
//!    drawn as rules and the theme background filled behind the text.
//! 2. **Capture** — that page is rasterised with pdfium at the capture
//!    scale, producing one tall image of the whole report.
//! 3. **Compress** — the capture is re-encoded as JPEG to bound the output
//!    file size.
//! 4. **Paginate** — the image is embedded into consecutive A4 pages, each
//!    page shifting the image up by one page height so the slices line up
//!    edge to edge.
//!
//! Capturing an image rather than re-flowing text keeps the export pixel
//! faithful to what the report view showed, themes included, at the cost of
//! non-selectable text in the output file.

use crate::config::{ExportOptions, ReportTheme};
use crate::error::EvalError;
use crate::pipeline::encode;
use crate::report::EvaluationReport;
use image::DynamicImage;
use pdfium_render::prelude::*;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Line, Mm,
    PdfDocument, Point, Polygon, Px, Rgb,
};
use std::path::PathBuf;
use tracing::{debug, info};

// A4 portrait.
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

// Typesetting geometry. Courier advances 0.6 em per glyph, so at 10 pt each
// column is 6 pt = 2.1167 mm wide.
const MARGIN_MM: f32 = 14.0;
const FONT_SIZE_PT: f32 = 10.0;
const CHAR_WIDTH_MM: f32 = FONT_SIZE_PT * 0.6 * 25.4 / 72.0;
const LINE_HEIGHT_MM: f32 = 5.0;
const MAX_COLUMNS: usize = ((PAGE_WIDTH_MM - 2.0 * MARGIN_MM) / CHAR_WIDTH_MM) as usize;

// PDF pages are capped at 14 400 pt (200 in) per side. A typeset report
// taller than this cannot be captured in one pass.
const MAX_PAGE_MM: f32 = 5080.0;

const MM_PER_INCH: f32 = 25.4;

/// Export a report to a PDF file at `options.output_path`.
///
/// Runs the capture on the blocking pool; pdfium must not run on async
/// worker threads.
pub async fn export_report(
    report: &EvaluationReport,
    options: &ExportOptions,
) -> Result<PathBuf, EvalError> {
    let report = report.clone();
    let options = options.clone();
    tokio::task::spawn_blocking(move || export_report_blocking(&report, &options))
        .await
        .map_err(|e| EvalError::Internal(format!("Export task panicked: {}", e)))?
}

/// Blocking variant of [`export_report`].
pub fn export_report_blocking(
    report: &EvaluationReport,
    options: &ExportOptions,
) -> Result<PathBuf, EvalError> {
    let bytes = export_to_bytes(report, options)?;
    std::fs::write(&options.output_path, &bytes).map_err(|e| EvalError::OutputWriteFailed {
        path: options.output_path.clone(),
        source: e,
    })?;
    info!(
        "Exported report: {} ({} bytes)",
        options.output_path.display(),
        bytes.len()
    );
    Ok(options.output_path.clone())
}

/// Produce the exported PDF in memory.
pub fn export_to_bytes(
    report: &EvaluationReport,
    options: &ExportOptions,
) -> Result<Vec<u8>, EvalError> {
    if report.is_empty() {
        return Err(EvalError::ReportMissing);
    }

    // Stage 1: typeset the report onto one tall page.
    let tall_pdf = typeset_report(report, options.theme)?;

    // Stage 2: rasterise that page.
    let capture = capture_page(&tall_pdf, options.scale)?;
    debug!(
        "Captured report: {}×{} px",
        capture.width(),
        capture.height()
    );

    // Stage 3: JPEG round-trip at the export quality, like the on-screen
    // capture path this mirrors.
    let jpeg = encode::encode_jpeg_bytes(&capture, options.jpeg_quality)
        .map_err(|e| translate_export_error(format!("JPEG encoding failed: {}", e)))?;
    let compressed = image::load_from_memory(&jpeg)
        .map_err(|e| translate_export_error(format!("JPEG decoding failed: {}", e)))?;

    // Stage 4: paginate into A4 pages.
    let pagination = paginate(compressed.width(), compressed.height());
    assemble_pdf(&compressed, &pagination)
}

// ── Stage 1: typesetting ─────────────────────────────────────────────────

fn theme_colors(theme: ReportTheme) -> (Color, Color) {
    // (background, text) as 0–1 RGB. Light is slate-100 on slate-900 text,
    // dark inverts the pair.
    let slate_100 = Rgb::new(241.0 / 255.0, 245.0 / 255.0, 249.0 / 255.0, None);
    let slate_900 = Rgb::new(15.0 / 255.0, 23.0 / 255.0, 42.0 / 255.0, None);
    match theme {
        ReportTheme::Light => (Color::Rgb(slate_100), Color::Rgb(slate_900)),
        ReportTheme::Dark => (Color::Rgb(slate_900), Color::Rgb(slate_100)),
    }
}

/// Lay the report out on a single page tall enough for every line.
fn typeset_report(report: &EvaluationReport, theme: ReportTheme) -> Result<Vec<u8>, EvalError> {
    let lines = layout_lines(report);

    let content_height = lines.len() as f32 * LINE_HEIGHT_MM;
    let page_height = content_height + 2.0 * MARGIN_MM;
    if page_height > MAX_PAGE_MM {
        return Err(EvalError::CaptureTooLarge {
            detail: format!(
                "typeset report is {:.0}mm tall, beyond the {:.0}mm page limit",
                page_height, MAX_PAGE_MM
            ),
        });
    }

    let (doc, page_idx, layer_idx) = PdfDocument::new(
        "Evaluation Report",
        Mm(PAGE_WIDTH_MM),
        Mm(page_height),
        "Layer 1",
    );
    let layer = doc.get_page(page_idx).get_layer(layer_idx);
    let font = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(|e| translate_export_error(format!("font: {}", e)))?;

    let (background, text_color) = theme_colors(theme);

    // Full-bleed background rectangle.
    layer.set_fill_color(background);
    layer.add_polygon(Polygon {
        rings: vec![vec![
            (Point::new(Mm(0.0), Mm(0.0)), false),
            (Point::new(Mm(PAGE_WIDTH_MM), Mm(0.0)), false),
            (Point::new(Mm(PAGE_WIDTH_MM), Mm(page_height)), false),
            (Point::new(Mm(0.0), Mm(page_height)), false),
        ]],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });

    layer.set_fill_color(text_color.clone());
    layer.set_outline_color(text_color);
    for (i, line) in lines.iter().enumerate() {
        // Baselines descend from the top margin; page origin is bottom-left.
        let y = page_height - MARGIN_MM - (i + 1) as f32 * LINE_HEIGHT_MM;
        match line {
            LayoutLine::Text(text) => {
                if !text.is_empty() {
                    layer.use_text(text.clone(), FONT_SIZE_PT, Mm(MARGIN_MM), Mm(y), &font);
                }
            }
            LayoutLine::Rule => {
                let mid = y + LINE_HEIGHT_MM / 2.0;
                layer.add_line(Line {
                    points: vec![
                        (Point::new(Mm(MARGIN_MM), Mm(mid)), false),
                        (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(mid)), false),
                    ],
                    is_closed: false,
                });
            }
        }
    }

    doc.save_to_bytes()
        .map_err(|e| translate_export_error(format!("document serialisation failed: {}", e)))
}

#[derive(Debug, Clone, PartialEq)]
enum LayoutLine {
    Text(String),
    Rule,
}

/// Word-wrap every section and interleave separator rules, mirroring the
/// report view: each section a block, a horizontal rule between blocks.
fn layout_lines(report: &EvaluationReport) -> Vec<LayoutLine> {
    let mut lines = Vec::new();
    for (i, section) in report.sections().iter().enumerate() {
        if i > 0 {
            lines.push(LayoutLine::Text(String::new()));
            lines.push(LayoutLine::Rule);
            lines.push(LayoutLine::Text(String::new()));
        }
        for raw in section.lines() {
            let clean = sanitize_line(raw);
            for wrapped in wrap_line(&clean, MAX_COLUMNS) {
                lines.push(LayoutLine::Text(wrapped));
            }
        }
    }
    lines
}

/// Replace characters the builtin Courier face cannot encode.
///
/// Builtin PDF fonts are WinAnsi-encoded; emoji and other non-Latin-1 code
/// points would render as garbage bytes. Marker emoji used by the grading
/// format get readable substitutes, anything else exotic becomes `*`.
fn sanitize_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '🔸' => out.push_str(">>"),
            '📝' | '📌' | '📊' => out.push('#'),
            '\t' => out.push_str("    "),
            c if (c as u32) < 256 => out.push(c),
            _ => out.push('*'),
        }
    }
    out
}

/// Wrap a single line to `width` columns, breaking on spaces where possible.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let word_len = word.chars().count();
        let current_len = current.chars().count();
        if current_len == 0 {
            current.push_str(word);
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(word);
        }
        // Hard-break words longer than the line.
        while current.chars().count() > width {
            let head: String = current.chars().take(width).collect();
            let tail: String = current.chars().skip(width).collect();
            out.push(head);
            current = tail;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

// ── Stage 2: capture ─────────────────────────────────────────────────────

/// Rasterise the first page of an in-memory PDF at the given scale.
fn capture_page(pdf_bytes: &[u8], scale: f32) -> Result<DynamicImage, EvalError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| translate_export_error(format!("capture document load failed: {}", e)))?;
    let page = document
        .pages()
        .first()
        .map_err(|e| translate_export_error(format!("capture page missing: {}", e)))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| translate_export_error(format!("capture rendering failed: {}", e)))?;
    Ok(bitmap.as_image())
}

// ── Stage 4: pagination ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Pagination {
    /// DPI at which the capture spans exactly the page width.
    dpi: f32,
    /// Capture height on paper at that DPI.
    scaled_height_mm: f32,
    /// One vertical image offset per output page, in mm from the page
    /// bottom. Page 0 shows the top slice; each later page shifts the image
    /// up by one page height.
    offsets_mm: Vec<f32>,
}

/// Fit a capture of the given pixel size onto consecutive A4 pages.
fn paginate(width_px: u32, height_px: u32) -> Pagination {
    let dpi = width_px as f32 / (PAGE_WIDTH_MM / MM_PER_INCH);
    let scaled_height_mm = height_px as f32 / dpi * MM_PER_INCH;
    let page_count = (scaled_height_mm / PAGE_HEIGHT_MM).ceil().max(1.0) as usize;

    let offsets_mm = (0..page_count)
        .map(|i| (i + 1) as f32 * PAGE_HEIGHT_MM - scaled_height_mm)
        .collect();

    Pagination {
        dpi,
        scaled_height_mm,
        offsets_mm,
    }
}

/// Embed the capture into one A4 page per offset.
fn assemble_pdf(capture: &DynamicImage, pagination: &Pagination) -> Result<Vec<u8>, EvalError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Evaluation Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let rgb = capture.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb.into_raw();

    for (i, offset) in pagination.offsets_mm.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let image = Image::from(ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: pixels.clone(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        });
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(*offset)),
                dpi: Some(pagination.dpi),
                ..Default::default()
            },
        );
    }

    doc.save_to_bytes()
        .map_err(|e| translate_export_error(format!("document serialisation failed: {}", e)))
}

/// Map an export-stage failure onto the user-facing taxonomy. Image-side
/// failures (allocation, encoding, rasterisation) read as the capture being
/// too large; everything else is the generic export failure.
fn translate_export_error(detail: String) -> EvalError {
    let lower = detail.to_lowercase();
    let capture = lower.contains("image")
        || lower.contains("bitmap")
        || lower.contains("jpeg")
        || lower.contains("render")
        || lower.contains("memory")
        || lower.contains("alloc");
    if capture {
        EvalError::CaptureTooLarge { detail }
    } else {
        EvalError::ExportFailed { detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_page_when_capture_fits() {
        // 210 mm wide at ~96 dpi, half a page tall.
        let p = paginate(794, 561);
        assert_eq!(p.offsets_mm.len(), 1);
        assert!(p.scaled_height_mm < PAGE_HEIGHT_MM);
    }

    #[test]
    fn tall_capture_spans_pages_with_page_height_steps() {
        // 2.3 pages worth of content → 3 pages.
        let height_mm = PAGE_HEIGHT_MM * 2.3;
        let width_px = 1240u32;
        let dpi = width_px as f32 / (PAGE_WIDTH_MM / MM_PER_INCH);
        let height_px = (height_mm / MM_PER_INCH * dpi).round() as u32;

        let p = paginate(width_px, height_px);
        assert_eq!(p.offsets_mm.len(), 3);
        // Consecutive pages shift the image up by exactly one page height.
        for pair in p.offsets_mm.windows(2) {
            assert!((pair[1] - pair[0] - PAGE_HEIGHT_MM).abs() < 0.01);
        }
        // First page shows the top of the image: its top edge sits at the
        // page top.
        assert!((p.offsets_mm[0] + p.scaled_height_mm - PAGE_HEIGHT_MM).abs() < 0.5);
    }

    #[test]
    fn wrap_respects_width_and_breaks_long_words() {
        let wrapped = wrap_line("alpha beta gamma delta", 11);
        assert_eq!(wrapped, vec!["alpha beta", "gamma delta"]);

        let long = wrap_line("abcdefghijklmnop", 5);
        assert_eq!(long, vec!["abcde", "fghij", "klmno", "p"]);

        for l in wrap_line("one two three four five six seven", 10) {
            assert!(l.chars().count() <= 10);
        }
    }

    #[test]
    fn sanitize_replaces_non_latin_glyphs() {
        assert_eq!(sanitize_line("🔸 Q1 (5 marks)"), ">> Q1 (5 marks)");
        assert_eq!(sanitize_line("📊 Summary"), "# Summary");
        assert_eq!(sanitize_line("plain ascii"), "plain ascii");
        assert_eq!(sanitize_line("né"), "né");
        assert_eq!(sanitize_line("数"), "*");
    }

    #[test]
    fn separator_rules_between_sections() {
        let report = EvaluationReport::new("First block\n---\nSecond block".to_string());
        let lines = layout_lines(&report);
        assert!(lines.contains(&LayoutLine::Rule));
        assert_eq!(
            lines.iter().filter(|l| matches!(l, LayoutLine::Rule)).count(),
            1
        );
    }

    #[test]
    fn empty_report_is_rejected_before_any_capture() {
        let err = export_to_bytes(
            &EvaluationReport::new("   ".to_string()),
            &ExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::ReportMissing));
    }

    #[test]
    fn oversized_report_maps_to_capture_error() {
        // Enough lines to exceed the maximum PDF page height.
        let lines = (MAX_PAGE_MM / LINE_HEIGHT_MM) as usize + 10;
        let text = vec!["line"; lines].join("\n");
        let err = typeset_report(&EvaluationReport::new(text), ReportTheme::Light).unwrap_err();
        assert!(matches!(err, EvalError::CaptureTooLarge { .. }));
    }
}

//! Image encoding: `DynamicImage` → base64 JPEG wrapped in `ImageData`.
//!
//! Vision APIs accept images as base64 payloads embedded in the JSON request
//! body. JPEG is chosen over PNG because an evaluation ships *every* page of
//! up to three documents in one request — a handwritten answer booklet as
//! lossless PNG blows straight past request-size limits, while JPEG at
//! quality 90 keeps pen strokes legible at a fraction of the size. The
//! payload is pure base64 with no data-URI prefix, tagged `image/jpeg`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rasterised page as a base64 JPEG ready for the model API.
///
/// pdfium bitmaps carry an alpha channel; JPEG has none, so the image is
/// flattened to RGB first.
pub fn encode_page(img: &DynamicImage, quality: u8) -> Result<ImageData, image::ImageError> {
    let rgb = img.to_rgb8();

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/jpeg").with_detail("high"))
}

/// Encode an already-rasterised report capture as JPEG bytes (no base64).
///
/// Used by the exporter, which embeds the raw JPEG into the output PDF
/// rather than a request body.
pub fn encode_jpeg_bytes(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_page(&img, 90).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/jpeg");
        assert!(!data.data.is_empty());
        // Pure base64, no data-URI prefix
        assert!(!data.data.starts_with("data:"));
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, 128, 255])
        }));
        let hi = encode_jpeg_bytes(&img, 95).unwrap();
        let lo = encode_jpeg_bytes(&img, 40).unwrap();
        assert!(lo.len() <= hi.len());
    }
}

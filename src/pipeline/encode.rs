//! Image encoding: `DynamicImage` → base64 payload wrapped in `ImageData`.
//!
//! Normal mode sends lossless PNG with `detail: high`, since blurred glyphs
//! hurt transcription. Fast mode sends JPEG with `detail: low`, which is
//! smaller to upload and cheaper to process.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

const FAST_JPEG_QUALITY: u8 = 80;

/// Encode a rendered page for the given mode.
pub fn encode_page(img: &DynamicImage, fast_mode: bool) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    let (mime_type, detail) = if fast_mode {
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, FAST_JPEG_QUALITY))?;
        ("image/jpeg", "low")
    } else {
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        ("image/png", "high")
    };

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {} image → {} bytes base64", mime_type, b64.len());

    Ok(ImageData::new(b64, mime_type).with_detail(detail))
}

//! Image encoding: `DynamicImage` → base64 PNG.
//!
//! Two consumers share this: the engine embeds the page image in its request
//! as a data URI, and the HTML exporter embeds picture crops inline so the
//! output is self-contained. PNG is chosen over JPEG because it is lossless —
//! text crispness matters far more than file size for transcription accuracy.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as base64 PNG.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(b64)
}

/// Encode an image as a `data:image/png;base64,…` URI.
pub fn encode_png_data_uri(img: &DynamicImage) -> Result<String, image::ImageError> {
    Ok(format!("data:image/png;base64,{}", encode_png_base64(img)?))
}

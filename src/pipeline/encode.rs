//! Image encoding: `DynamicImage` → PNG bytes, and (with the `vision`
//! feature) → base64 PNG wrapped in `ImageData` for VLM requests.
//!
//! PNG is lossless, so text crispness survives both the trip into the
//! package and the trip to a vision model.

use image::DynamicImage;
use std::io::Cursor;

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a rasterised page as a base64 PNG ready for the VLM API.
///
/// ## Why `detail: "high"`?
/// OpenAI's tiling algorithm divides images into 512 px tiles. `detail: "high"`
/// enables up to 10 tiles, so fine print survives; `detail: "low"` forces a
/// single 512 px overview tile.
#[cfg(feature = "vision")]
pub fn encode_image_data(img: &DynamicImage) -> Result<edgequake_llm::ImageData, image::ImageError> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let b64 = STANDARD.encode(encode_png(img)?);
    tracing::debug!("Encoded page image → {} bytes base64", b64.len());
    Ok(edgequake_llm::ImageData::new(b64, "image/png").with_detail("high"))
}

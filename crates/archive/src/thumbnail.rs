//! Cover thumbnails.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use tracing::instrument;

/// Scales an encoded image to fit within `(width, height)`, keeping its aspect
/// ratio, and re-encodes it as JPEG.
///
/// Images already inside the bound are re-encoded at their original size,
/// never enlarged.
#[instrument(level = "debug", skip(image), fields(image_size = image.as_ref().len()))]
pub fn resize(image: impl AsRef<[u8]>, (width, height): (u32, u32)) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(image.as_ref()).or_raise(|| ErrorKind::Image)?;
    let (w, h) = decoded.dimensions();
    let fitted = if w > width || h > height {
        decoded.thumbnail(width, height)
    } else {
        decoded
    };
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(fitted.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg).or_raise(|| ErrorKind::Image)?;
    Ok(buffer.into_inner())
}

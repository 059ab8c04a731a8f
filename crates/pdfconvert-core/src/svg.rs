//! SVG rasterisation
//!
//! Vector uploads are rendered to an RGBA bitmap that fits inside
//! [`MAX_RASTER_WIDTH`] x [`MAX_RASTER_HEIGHT`] and then go through the
//! normal image path. Smaller drawings keep their own size.

use image::{DynamicImage, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::error::ConvertError;

pub const MAX_RASTER_WIDTH: u32 = 800;
pub const MAX_RASTER_HEIGHT: u32 = 600;

/// True when `bytes` look like an SVG document rather than a bitmap
pub fn is_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    ["<?xml", "<svg", "<!--", "<!DOCTYPE"]
        .iter()
        .any(|prefix| text.starts_with(prefix))
        && text.contains("<svg")
}

/// Pixel size of the raster for a drawing of `width` x `height` user
/// units: scaled down to fit the bound, never enlarged, at least 1x1
pub fn raster_size(width: f32, height: f32) -> (u32, u32) {
    let scale = (MAX_RASTER_WIDTH as f32 / width)
        .min(MAX_RASTER_HEIGHT as f32 / height)
        .min(1.0);
    let side = |v: f32| ((v * scale).round() as u32).max(1);
    (side(width), side(height))
}

/// Render SVG source to a bitmap
pub fn rasterize_svg(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| ConvertError::ImageError(format!("Failed to convert SVG: {}", e)))?;

    let size = tree.size();
    let (width, height) = raster_size(size.width(), size.height());
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        ConvertError::ImageError(format!("Failed to create pixmap {}x{}", width, height))
    })?;

    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // Pixmap samples are premultiplied
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }

    RgbaImage::from_raw(width, height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| ConvertError::ImageError("Failed to create image buffer".into()))
}

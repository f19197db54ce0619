use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::capture::VideoFrame;
use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Backing raster size for a `width`x`height` source.
pub fn scaled_dimensions(width: u32, height: u32, factor: u32) -> (u32, u32) {
    let factor = factor.max(1);
    (width.saturating_mul(factor), height.saturating_mul(factor))
}

/// Rendered PNG and its pixel size.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub png: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Upscales, sharpens and contrast-adjusts a frame, then encodes it as PNG.
/// CPU bound; run it on a blocking worker.
pub fn render_screenshot(frame: &VideoFrame, config: &CaptureConfig) -> Result<RenderedImage, CaptureError> {
    let source = RgbaImage::from_raw(frame.width(), frame.height(), frame.rgba().to_vec()).ok_or(
        CaptureError::MalformedFrame {
            width: frame.width(),
            height: frame.height(),
            len: frame.rgba().len(),
        },
    )?;

    let (width, height) = scaled_dimensions(frame.width(), frame.height(), config.upscale);
    let scaled = imageops::resize(&source, width, height, FilterType::CatmullRom);
    let sharpened = imageops::unsharpen(&scaled, config.sharpen_sigma, config.sharpen_threshold);
    let adjusted = imageops::contrast(&sharpened, config.contrast);

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(adjusted).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(RenderedImage {
        png: Bytes::from(png),
        width,
        height,
    })
}

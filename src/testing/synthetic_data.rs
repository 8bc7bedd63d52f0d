//! Generated still images for synthetic cameras

use crate::synth::encode_data_uri;
use crate::types::CameraDefinition;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// PNG bytes of a `width`x`height` gradient.
///
/// Each pixel encodes its position, so scaled or cropped output is easy to
/// tell apart from the source image.
pub fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });

    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("in-memory PNG encoding");
    out.into_inner()
}

/// `data:image/png;base64,...` URI of a gradient PNG.
pub fn synthetic_data_uri(width: u32, height: u32) -> String {
    encode_data_uri("image/png", &synthetic_png(width, height))
}

/// Camera definition backed by a gradient PNG of the given size.
pub fn synthetic_camera(name: &str, width: u32, height: u32) -> CameraDefinition {
    CameraDefinition::new(name, synthetic_data_uri(width, height))
}

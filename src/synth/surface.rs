use crate::errors::CameraError;
use crate::media::{PixelFormat, VideoFrame};
use crate::timing::FrameClock;
use crate::types::TrackSettings;
use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Fixed-size RGBA drawing surface a synthetic track captures from.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    pub fn new(width: u32, height: u32, max_dimension: u32) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::SynthesisFailure(format!(
                "cannot create a {}x{} surface",
                width, height
            )));
        }
        if width > max_dimension || height > max_dimension {
            return Err(CameraError::SynthesisFailure(format!(
                "surface {}x{} exceeds the {} pixel limit",
                width, height, max_dimension
            )));
        }
        Ok(Self {
            pixels: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Blit `source` at (0,0), scaled to the surface size.
    pub fn draw(&mut self, source: &RgbaImage) {
        if source.dimensions() == self.pixels.dimensions() {
            self.pixels.copy_from_slice(source.as_raw());
        } else {
            let scaled = imageops::resize(source, self.width(), self.height(), FilterType::Triangle);
            imageops::replace(&mut self.pixels, &scaled, 0, 0);
        }
    }

    /// Snapshot the current surface contents as a frame.
    pub fn capture(&self, sequence: u64, clock: &FrameClock) -> VideoFrame {
        VideoFrame::new(
            Bytes::copy_from_slice(self.pixels.as_raw()),
            self.width(),
            self.height(),
            PixelFormat::Rgba8,
        )
        .with_sequence(sequence)
        .with_timestamp_us(clock.timestamp_us())
    }

    /// Settings of a live track captured from this surface at `frame_rate`.
    pub fn capture_settings(&self, frame_rate: u32) -> TrackSettings {
        TrackSettings {
            device_id: None,
            group_id: None,
            width: Some(self.width()),
            height: Some(self.height()),
            frame_rate: Some(frame_rate as f64),
            aspect_ratio: Some(self.width() as f64 / self.height() as f64),
            resize_mode: Some("none".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_surface_rejects_bad_sizes() {
        assert!(matches!(Surface::new(0, 10, 100), Err(CameraError::SynthesisFailure(_))));
        assert!(matches!(Surface::new(101, 10, 100), Err(CameraError::SynthesisFailure(_))));
        assert!(Surface::new(100, 100, 100).is_ok());
    }

    #[test]
    fn test_draw_same_size_copies_pixels() {
        let source = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut surface = Surface::new(3, 2, 64).unwrap();
        surface.draw(&source);
        assert_eq!(surface.pixels(), &source);
    }

    #[test]
    fn test_draw_scales_to_surface() {
        let source = RgbaImage::from_pixel(8, 8, Rgba([200, 0, 0, 255]));
        let mut surface = Surface::new(4, 2, 64).unwrap();
        surface.draw(&source);
        assert_eq!(surface.pixels().get_pixel(3, 1), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn test_capture_frame_geometry() {
        let surface = Surface::new(5, 4, 64).unwrap();
        let frame = surface.capture(3, &FrameClock::new());
        assert_eq!((frame.width, frame.height, frame.sequence), (5, 4, 3));
        assert!(frame.is_valid());
    }

    #[test]
    fn test_capture_settings() {
        let surface = Surface::new(640, 480, 4096).unwrap();
        let settings = surface.capture_settings(30);
        assert_eq!(settings.width, Some(640));
        assert_eq!(settings.frame_rate, Some(30.0));
        assert!(settings.device_id.is_none());
    }
}

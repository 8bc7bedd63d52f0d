use crate::errors::CameraError;
use crate::types::{TrackKind, TrackSettings};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// One delivered video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub sequence: u64,
    pub timestamp_us: u64,
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
}

impl VideoFrame {
    pub fn new(data: Bytes, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            sequence: 0,
            timestamp_us: 0,
            captured_at: Utc::now(),
            width,
            height,
            format,
            data,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_timestamp_us(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// Whether the buffer length matches the declared geometry
    pub fn is_valid(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Copy the frame into an RGBA image.
    pub fn to_rgba_image(&self) -> Result<image::RgbaImage, CameraError> {
        let invalid = || {
            CameraError::SynthesisFailure(format!(
                "frame buffer of {} bytes does not match {}x{} {:?}",
                self.data.len(),
                self.width,
                self.height,
                self.format
            ))
        };
        match self.format {
            PixelFormat::Rgba8 => {
                image::RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
                    .ok_or_else(invalid)
            }
            PixelFormat::Rgb8 => {
                let rgb = image::RgbImage::from_raw(self.width, self.height, self.data.to_vec())
                    .ok_or_else(invalid)?;
                Ok(image::DynamicImage::ImageRgb8(rgb).to_rgba8())
            }
        }
    }

    /// Encode the frame to an image file; the format follows the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();
        self.to_rgba_image()?.save(path).map_err(|e| {
            CameraError::SynthesisFailure(format!("Failed to save frame to {:?}: {}", path, e))
        })
    }
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    settings: TrackSettings,
    frames: watch::Receiver<Option<VideoFrame>>,
    stop: CancellationToken,
    // Dropping the last handle to the track stops its producer.
    _release: DropGuard,
}

/// A live track handed to the caller.
///
/// Clones share the same underlying track. The producer behind it (render
/// loop or device pump) runs until `stop()` is called or the last clone is
/// dropped.
#[derive(Clone)]
pub struct MediaStreamTrack {
    inner: Arc<TrackInner>,
}

impl MediaStreamTrack {
    pub fn new(
        kind: TrackKind,
        label: impl Into<String>,
        settings: TrackSettings,
        frames: watch::Receiver<Option<VideoFrame>>,
        stop: CancellationToken,
    ) -> Self {
        let release = stop.clone().drop_guard();
        Self {
            inner: Arc::new(TrackInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                label: label.into(),
                settings,
                frames,
                stop,
                _release: release,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Metadata accessor
    pub fn get_settings(&self) -> TrackSettings {
        self.inner.settings.clone()
    }

    /// Receiver of the most recent frame; `None` until the first frame lands.
    pub fn frames(&self) -> watch::Receiver<Option<VideoFrame>> {
        self.inner.frames.clone()
    }

    pub fn latest_frame(&self) -> Option<VideoFrame> {
        self.inner.frames.borrow().clone()
    }

    /// Wait for the next frame published after this call.
    ///
    /// Returns `None` once the track has ended.
    pub async fn next_frame(&self) -> Option<VideoFrame> {
        let mut rx = self.inner.frames.clone();
        rx.borrow_and_update();
        tokio::select! {
            _ = self.inner.stop.cancelled() => None,
            changed = rx.changed() => match changed {
                Ok(()) => rx.borrow().clone(),
                Err(_) => None,
            },
        }
    }

    pub fn stop(&self) {
        if !self.inner.stop.is_cancelled() {
            log::debug!("Stopping track {} ({})", self.inner.id, self.inner.label);
        }
        self.inner.stop.cancel();
    }

    pub fn is_live(&self) -> bool {
        !self.inner.stop.is_cancelled()
    }

    /// Resolves once the track has been stopped.
    pub async fn ended(&self) {
        self.inner.stop.cancelled().await
    }
}

impl fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStreamTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("settings", &self.inner.settings)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Result of an acquisition call
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaStreamTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaStreamTrack>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaStreamTrack] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> Vec<&MediaStreamTrack> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == TrackKind::Video)
            .collect()
    }

    pub fn audio_tracks(&self) -> Vec<&MediaStreamTrack> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == TrackKind::Audio)
            .collect()
    }

    pub fn first_video_track(&self) -> Option<&MediaStreamTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    /// A stream is active while any of its tracks is live.
    pub fn active(&self) -> bool {
        self.tracks.iter().any(MediaStreamTrack::is_live)
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_track() -> (MediaStreamTrack, watch::Sender<Option<VideoFrame>>, CancellationToken) {
        let (tx, rx) = watch::channel(None);
        let stop = CancellationToken::new();
        let track = MediaStreamTrack::new(
            TrackKind::Video,
            "test",
            TrackSettings::default(),
            rx,
            stop.clone(),
        );
        (track, tx, stop)
    }

    #[test]
    fn test_stop_cancels_token() {
        let (track, _tx, stop) = idle_track();
        assert!(track.is_live());
        track.stop();
        assert!(!track.is_live());
        assert!(stop.is_cancelled());
    }

    #[test]
    fn test_drop_of_last_clone_cancels_token() {
        let (track, _tx, stop) = idle_track();
        let clone = track.clone();
        drop(track);
        assert!(!stop.is_cancelled());
        drop(clone);
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn test_next_frame_waits_for_new_frame() {
        let (track, tx, _stop) = idle_track();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            let frame = VideoFrame::new(Bytes::from(vec![0u8; 4]), 1, 1, PixelFormat::Rgba8)
                .with_sequence(7);
            tx.send_replace(Some(frame));
            // keep the sender alive until the receiver has looked
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });
        let got = track.next_frame().await.unwrap();
        assert_eq!(got.sequence, 7);
        assert_eq!(track.latest_frame().unwrap().sequence, 7);
    }

    #[tokio::test]
    async fn test_next_frame_returns_none_after_stop() {
        let (track, _tx, _stop) = idle_track();
        track.stop();
        assert!(track.next_frame().await.is_none());
    }

    #[test]
    fn test_stream_track_filters() {
        let (video, _tx, _stop) = idle_track();
        let stream = MediaStream::new(vec![video]);
        assert_eq!(stream.video_tracks().len(), 1);
        assert!(stream.audio_tracks().is_empty());
        assert!(stream.active());
        stream.stop();
        assert!(!stream.active());
    }

    #[test]
    fn test_frame_validity() {
        let frame = VideoFrame::new(Bytes::from(vec![0u8; 12]), 2, 2, PixelFormat::Rgb8);
        assert!(frame.is_valid());
        assert_eq!(frame.to_rgba_image().unwrap().dimensions(), (2, 2));
        let short = VideoFrame::new(Bytes::from(vec![0u8; 3]), 2, 2, PixelFormat::Rgba8);
        assert!(!short.is_valid());
        assert!(short.to_rgba_image().is_err());
    }
}

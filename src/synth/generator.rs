use super::decode::decode_image_async;
use super::surface::Surface;
use crate::assert_invariant;
use crate::config::SyntheticConfig;
use crate::errors::CameraError;
use crate::invariant_ppt::{TRACK_IN_SYNTHETIC_GROUP, TRACK_MATCHES_IMAGE};
use crate::media::{MediaStreamTrack, VideoFrame};
use crate::timing::FrameClock;
use crate::types::{CameraDefinition, SyntheticDeviceId, TrackKind, TrackSettings, SYNTHETIC_GROUP_ID};
use image::RgbaImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Turns a camera definition's still image into a live video track.
#[derive(Debug, Clone, Default)]
pub struct SyntheticStreamGenerator {
    config: SyntheticConfig,
}

impl SyntheticStreamGenerator {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Build a live track rendering `definition`'s image.
    ///
    /// The track reports `requested_id` as its device id (`fake-camera-0`
    /// when none was requested) and the image's natural size as its
    /// dimensions. A render loop keeps redrawing the image until the track is
    /// stopped or dropped.
    pub async fn synthesize(
        &self,
        definition: &CameraDefinition,
        requested_id: Option<&str>,
    ) -> Result<MediaStreamTrack, CameraError> {
        let source = decode_image_async(definition.image.clone()).await?;
        let (width, height) = source.dimensions();

        let mut surface = Surface::new(width, height, self.config.max_surface_dimension)?;
        let device_id = requested_id
            .map(str::to_string)
            .unwrap_or_else(|| SyntheticDeviceId::new(0).to_string());

        let settings = TrackSettings {
            device_id: Some(device_id),
            group_id: Some(SYNTHETIC_GROUP_ID.to_string()),
            width: Some(surface.width()),
            height: Some(surface.height()),
            ..surface.capture_settings(self.config.frame_rate)
        };
        assert_invariant!(
            settings.width == Some(width) && settings.height == Some(height),
            TRACK_MATCHES_IMAGE,
            "synth::generator"
        );
        assert_invariant!(
            settings.group_id.as_deref() == Some(SYNTHETIC_GROUP_ID),
            TRACK_IN_SYNTHETIC_GROUP,
            "synth::generator"
        );

        let clock = FrameClock::new();
        surface.draw(&source);
        let (frames, rx) = watch::channel(Some(surface.capture(0, &clock)));
        let stop = CancellationToken::new();
        let track = MediaStreamTrack::new(
            TrackKind::Video,
            definition.name.clone(),
            settings,
            rx,
            stop.clone(),
        );

        log::info!(
            "Synthesized {}x{} track '{}' for {}",
            width,
            height,
            definition.name,
            requested_id.unwrap_or("default request")
        );

        let render = RenderLoop {
            label: definition.name.clone(),
            surface,
            source,
            frames,
            stop,
            clock,
            refresh: self.config.refresh_interval(),
            capture: self.config.capture_interval(),
        };
        tokio::spawn(render.run());

        Ok(track)
    }
}

struct RenderLoop {
    label: String,
    surface: Surface,
    source: Arc<RgbaImage>,
    frames: watch::Sender<Option<VideoFrame>>,
    stop: CancellationToken,
    clock: FrameClock,
    refresh: Duration,
    capture: Duration,
}

impl RenderLoop {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately; frame 0 is already published.
        ticker.tick().await;

        // Accept a capture up to half a refresh early so tick jitter does not
        // drop every other frame when the rates divide evenly.
        let capture_due = self.capture.saturating_sub(self.refresh / 2);
        let mut sequence = 0u64;
        let mut last_capture = Instant::now();
        let stop = self.stop.clone();

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    self.surface.draw(&self.source);
                    if last_capture.elapsed() >= capture_due {
                        sequence += 1;
                        last_capture = Instant::now();
                        self.frames
                            .send_replace(Some(self.surface.capture(sequence, &self.clock)));
                    }
                    if self.frames.is_closed() {
                        break;
                    }
                }
            }
        }

        log::debug!(
            "Render loop for '{}' stopped after {} frame(s)",
            self.label,
            sequence
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_camera;

    #[tokio::test]
    async fn test_default_device_id_and_dimensions() {
        let generator = SyntheticStreamGenerator::default();
        let track = generator
            .synthesize(&synthetic_camera("Desk", 64, 48), None)
            .await
            .unwrap();

        let settings = track.get_settings();
        assert_eq!(settings.device_id.as_deref(), Some("fake-camera-0"));
        assert_eq!(settings.group_id.as_deref(), Some("fake-cameras-group"));
        assert_eq!((settings.width, settings.height), (Some(64), Some(48)));
        assert_eq!(settings.frame_rate, Some(30.0));
        assert_eq!(track.label(), "Desk");
        track.stop();
    }

    #[tokio::test]
    async fn test_requested_id_is_reported() {
        let generator = SyntheticStreamGenerator::default();
        let track = generator
            .synthesize(&synthetic_camera("Door", 16, 16), Some("fake-camera-3"))
            .await
            .unwrap();
        assert_eq!(track.get_settings().device_id.as_deref(), Some("fake-camera-3"));
    }

    #[tokio::test]
    async fn test_first_frame_is_available_immediately() {
        let generator = SyntheticStreamGenerator::default();
        let track = generator
            .synthesize(&synthetic_camera("Desk", 10, 6), None)
            .await
            .unwrap();
        let frame = track.latest_frame().unwrap();
        assert_eq!((frame.width, frame.height), (10, 6));
        assert_eq!(frame.sequence, 0);
        assert!(frame.is_valid());
    }

    #[tokio::test]
    async fn test_decode_failure_is_reported() {
        let generator = SyntheticStreamGenerator::default();
        let broken = CameraDefinition::new("Broken", "data:image/png;base64,AAAA");
        let err = generator.synthesize(&broken, None).await.unwrap_err();
        assert!(matches!(err, CameraError::ImageDecode(_)));
    }

    #[tokio::test]
    async fn test_oversized_surface_is_synthesis_failure() {
        let generator = SyntheticStreamGenerator::new(SyntheticConfig {
            max_surface_dimension: 8,
            ..SyntheticConfig::default()
        });
        let err = generator
            .synthesize(&synthetic_camera("Wide", 9, 4), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::SynthesisFailure(_)));
    }
}

//! Real cameras through nokhwa
//!
//! Device ids are the backend's camera indices ("0", "1", ...). Each acquired
//! track owns one opened camera on a blocking thread that pumps RGB frames
//! until the track is stopped or dropped.

use crate::errors::CameraError;
use crate::media::{MediaDevices, MediaStream, MediaStreamTrack, PixelFormat, VideoFrame};
use crate::timing::FrameClock;
use crate::types::{
    MediaDeviceInfo, MediaDeviceKind, MediaStreamConstraints, TrackKind, TrackSettings,
};
use async_trait::async_trait;
use bytes::Bytes;
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, CameraInfo, RequestedFormat, RequestedFormatType},
    Camera,
};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Back-off after a failed frame read.
const FRAME_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeMediaDevices;

impl NativeMediaDevices {
    pub fn new() -> Self {
        Self
    }
}

struct OpenedCamera {
    label: String,
    width: u32,
    height: u32,
    frame_rate: u32,
}

fn device_info(camera: &CameraInfo) -> MediaDeviceInfo {
    MediaDeviceInfo::new(camera.index().to_string(), MediaDeviceKind::VideoInput)
        .with_group_id(format!("native-{}", camera.index()))
        .with_label(camera.human_name())
}

fn requested_index(constraints: &MediaStreamConstraints) -> Result<u32, CameraError> {
    match constraints.video.device_id().value() {
        Some(id) => id.parse::<u32>().map_err(|_| {
            CameraError::UpstreamAcquisition(format!("Requested device not found: {}", id))
        }),
        None => Ok(0),
    }
}

#[async_trait]
impl MediaDevices for NativeMediaDevices {
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CameraError> {
        if !constraints.video.is_requested() {
            return Err(CameraError::UpstreamAcquisition(
                "Audio capture is not available on this backend".to_string(),
            ));
        }
        if constraints.audio.is_requested() {
            log::warn!("Audio requested alongside video, returning video only");
        }

        let index = requested_index(constraints)?;
        let (frames_tx, frames_rx) = watch::channel(None);
        let (opened_tx, opened_rx) = oneshot::channel();
        let stop = CancellationToken::new();

        let pump_stop = stop.clone();
        tokio::task::spawn_blocking(move || pump(index, frames_tx, opened_tx, pump_stop));

        let opened = opened_rx.await.map_err(|_| {
            CameraError::UpstreamAcquisition(format!("Camera {} thread exited early", index))
        })??;
        log::info!(
            "Opened camera {} ({}) at {}x{}@{}",
            index,
            opened.label,
            opened.width,
            opened.height,
            opened.frame_rate
        );

        let settings = TrackSettings {
            device_id: Some(index.to_string()),
            group_id: Some(format!("native-{}", index)),
            width: Some(opened.width),
            height: Some(opened.height),
            frame_rate: Some(opened.frame_rate as f64),
            aspect_ratio: (opened.height > 0).then(|| opened.width as f64 / opened.height as f64),
            resize_mode: None,
        };
        let track = MediaStreamTrack::new(TrackKind::Video, opened.label, settings, frames_rx, stop);
        Ok(MediaStream::new(vec![track]))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CameraError> {
        let cameras = tokio::task::spawn_blocking(|| query(ApiBackend::Auto))
            .await
            .map_err(|e| CameraError::UpstreamEnumeration(format!("Task join error: {}", e)))?
            .map_err(|e| {
                CameraError::UpstreamEnumeration(format!("Failed to query cameras: {}", e))
            })?;

        log::debug!("Found {} native camera(s)", cameras.len());
        Ok(cameras.iter().map(device_info).collect())
    }
}

/// Open camera `index` and publish frames until `stop` fires or every
/// receiver is gone. Runs on a blocking thread.
fn pump(
    index: u32,
    frames: watch::Sender<Option<VideoFrame>>,
    opened: oneshot::Sender<Result<OpenedCamera, CameraError>>,
    stop: CancellationToken,
) {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let camera = Camera::new(CameraIndex::Index(index), requested).and_then(|mut camera| {
        camera.open_stream()?;
        Ok(camera)
    });
    let mut camera = match camera {
        Ok(camera) => camera,
        Err(e) => {
            let _ = opened.send(Err(CameraError::UpstreamAcquisition(format!(
                "Failed to open camera {}: {}",
                index, e
            ))));
            return;
        }
    };

    let resolution = camera.resolution();
    let info = OpenedCamera {
        label: camera.info().human_name(),
        width: resolution.width_x,
        height: resolution.height_y,
        frame_rate: camera.frame_rate(),
    };
    if opened.send(Ok(info)).is_err() {
        // Caller went away before the camera finished opening.
        stop.cancel();
    }

    let clock = FrameClock::new();
    let mut sequence = 0u64;
    while !stop.is_cancelled() && !frames.is_closed() {
        match camera.frame().and_then(|buffer| buffer.decode_image::<RgbFormat>()) {
            Ok(image) => {
                let (width, height) = image.dimensions();
                let frame = VideoFrame::new(
                    Bytes::from(image.into_raw()),
                    width,
                    height,
                    PixelFormat::Rgb8,
                )
                .with_sequence(sequence)
                .with_timestamp_us(clock.timestamp_us());
                frames.send_replace(Some(frame));
                sequence += 1;
            }
            Err(e) => {
                log::warn!("Failed to read frame from camera {}: {}", index, e);
                std::thread::sleep(FRAME_RETRY_DELAY);
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        log::warn!("Failed to stop camera {}: {}", index, e);
    }
    log::info!("Released camera {} after {} frame(s)", index, sequence);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceIdConstraint;

    #[test]
    fn test_requested_index() {
        assert_eq!(requested_index(&MediaStreamConstraints::video()).unwrap(), 0);
        let c = MediaStreamConstraints::video_device(DeviceIdConstraint::exact("2"));
        assert_eq!(requested_index(&c).unwrap(), 2);
        let c = MediaStreamConstraints::video_device(DeviceIdConstraint::exact("front"));
        assert!(matches!(
            requested_index(&c),
            Err(CameraError::UpstreamAcquisition(_))
        ));
    }

    #[tokio::test]
    async fn test_audio_only_is_rejected() {
        let err = NativeMediaDevices::new()
            .get_user_media(&MediaStreamConstraints::audio_only())
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::UpstreamAcquisition(_)));
    }
}

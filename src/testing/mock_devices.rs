//! Scriptable stand-in for the real media-device API

use crate::errors::CameraError;
use crate::media::{MediaDevices, MediaStream, MediaStreamTrack, PixelFormat, VideoFrame};
use crate::types::{
    MediaDeviceInfo, MediaDeviceKind, MediaStreamConstraints, TrackKind, TrackSettings,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Group id reported by every mock device.
pub const MOCK_GROUP_ID: &str = "mock-group";

/// Fake "real" host API.
///
/// Records every call, serves streams whose tracks report the requested
/// device, and can be told to fail acquisitions or the next N enumerations.
#[derive(Default)]
pub struct MockMediaDevices {
    devices: Mutex<Vec<MediaDeviceInfo>>,
    acquisitions: Mutex<Vec<MediaStreamConstraints>>,
    enumerations: AtomicUsize,
    failing_enumerations: AtomicUsize,
    fail_acquisitions: AtomicBool,
}

impl MockMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock with `count` video inputs named `mock-camera-<i>`.
    pub fn with_cameras(count: usize) -> Self {
        let devices = (0..count)
            .map(|i| {
                MediaDeviceInfo::new(format!("mock-camera-{}", i), MediaDeviceKind::VideoInput)
                    .with_group_id(MOCK_GROUP_ID)
                    .with_label(format!("Mock Camera {}", i))
            })
            .collect();
        Self::with_devices(devices)
    }

    pub fn with_devices(devices: Vec<MediaDeviceInfo>) -> Self {
        Self {
            devices: Mutex::new(devices),
            ..Self::default()
        }
    }

    pub fn set_fail_acquisitions(&self, fail: bool) {
        self.fail_acquisitions.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` enumeration calls fail.
    pub fn fail_next_enumerations(&self, count: usize) {
        self.failing_enumerations.store(count, Ordering::SeqCst);
    }

    /// Constraints of every acquisition call received, in order.
    pub fn acquisition_calls(&self) -> Vec<MediaStreamConstraints> {
        self.acquisitions.lock().expect("lock poisoned").clone()
    }

    pub fn enumeration_calls(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    fn mock_track(kind: TrackKind, label: &str, settings: TrackSettings) -> MediaStreamTrack {
        let frame = match kind {
            TrackKind::Video => Some(
                VideoFrame::new(Bytes::from(vec![0u8; 2 * 2 * 4]), 2, 2, PixelFormat::Rgba8),
            ),
            TrackKind::Audio => None,
        };
        let (_tx, rx) = watch::channel(frame);
        MediaStreamTrack::new(kind, label, settings, rx, CancellationToken::new())
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CameraError> {
        self.acquisitions
            .lock()
            .expect("lock poisoned")
            .push(constraints.clone());

        if self.fail_acquisitions.load(Ordering::SeqCst) {
            return Err(CameraError::UpstreamAcquisition(
                "mock acquisition failure".to_string(),
            ));
        }

        let mut tracks = Vec::new();
        if constraints.video.is_requested() {
            let devices = self.devices.lock().expect("lock poisoned");
            let device = match constraints.video.device_id().value() {
                Some(id) => devices.iter().find(|d| d.device_id == id),
                None => devices
                    .iter()
                    .find(|d| d.kind == MediaDeviceKind::VideoInput),
            }
            .ok_or_else(|| {
                CameraError::UpstreamAcquisition("Requested device not found".to_string())
            })?;

            let settings = TrackSettings {
                device_id: Some(device.device_id.clone()),
                group_id: Some(device.group_id.clone()),
                width: Some(2),
                height: Some(2),
                ..TrackSettings::default()
            };
            tracks.push(Self::mock_track(TrackKind::Video, &device.label, settings));
        }
        if constraints.audio.is_requested() {
            tracks.push(Self::mock_track(
                TrackKind::Audio,
                "Mock Microphone",
                TrackSettings::default(),
            ));
        }
        if tracks.is_empty() {
            return Err(CameraError::UpstreamAcquisition(
                "At least one of audio and video must be requested".to_string(),
            ));
        }
        Ok(MediaStream::new(tracks))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CameraError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_enumerations.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_enumerations.store(failing - 1, Ordering::SeqCst);
            return Err(CameraError::UpstreamEnumeration(
                "mock enumeration failure".to_string(),
            ));
        }

        Ok(self.devices.lock().expect("lock poisoned").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceIdConstraint;

    #[tokio::test]
    async fn test_mock_serves_requested_device() {
        let mock = MockMediaDevices::with_cameras(2);
        let stream = mock
            .get_user_media(&MediaStreamConstraints::video_device(DeviceIdConstraint::exact(
                "mock-camera-1",
            )))
            .await
            .unwrap();
        let settings = stream.first_video_track().unwrap().get_settings();
        assert_eq!(settings.device_id.as_deref(), Some("mock-camera-1"));
        assert_eq!(mock.acquisition_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_unknown_device_fails() {
        let mock = MockMediaDevices::with_cameras(1);
        let err = mock
            .get_user_media(&MediaStreamConstraints::video_device(DeviceIdConstraint::exact(
                "nope",
            )))
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::UpstreamAcquisition(_)));
    }

    #[tokio::test]
    async fn test_mock_enumeration_failures_are_counted_down() {
        let mock = MockMediaDevices::with_cameras(1);
        mock.fail_next_enumerations(1);
        assert!(mock.enumerate_devices().await.is_err());
        assert_eq!(mock.enumerate_devices().await.unwrap().len(), 1);
        assert_eq!(mock.enumeration_calls(), 2);
    }
}

//! Host media-device API
//!
//! `MediaDevices` is the seam the shim wraps: the acquisition entry point and
//! the enumeration entry point. Anything that implements it (a native camera
//! backend, a test double, or the shim itself) can stand in for the host API.

pub mod stream;

pub use stream::{MediaStream, MediaStreamTrack, PixelFormat, VideoFrame};

use crate::errors::CameraError;
use crate::types::{MediaDeviceInfo, MediaStreamConstraints};
use async_trait::async_trait;

#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquisition entry point
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CameraError>;

    /// Enumeration entry point
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CameraError>;
}

/// Stand-in for a host that exposes no device API at all.
///
/// Acquisition always rejects and enumeration reports no devices, so the shim
/// still has a real path to fall back to.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableMediaDevices;

#[async_trait]
impl MediaDevices for UnavailableMediaDevices {
    async fn get_user_media(
        &self,
        _constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CameraError> {
        Err(CameraError::UpstreamAcquisition(
            "getUserMedia is not implemented on this host".to_string(),
        ))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CameraError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_host() {
        let host = UnavailableMediaDevices;
        let err = host
            .get_user_media(&MediaStreamConstraints::video())
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::UpstreamAcquisition(_)));
        assert!(host.enumerate_devices().await.unwrap().is_empty());
    }
}

use crate::assert_invariant;
use crate::errors::CameraError;
use crate::invariant_ppt::REAL_DEVICES_FIRST;
use crate::media::MediaDevices;
use crate::registry::RegistryClient;
use crate::types::{MediaDeviceInfo, RegistrySnapshot};
use std::sync::Arc;

/// Synthetic descriptors for `snapshot`, in registry order.
pub fn synthetic_devices(snapshot: &RegistrySnapshot) -> Vec<MediaDeviceInfo> {
    snapshot
        .device_ids()
        .zip(snapshot.iter())
        .map(|(id, definition)| MediaDeviceInfo::synthetic(id, definition))
        .collect()
}

/// `merged` is `real` unchanged, followed by one synthetic descriptor per
/// camera of `snapshot` in registry order.
fn real_devices_first(
    real: &[MediaDeviceInfo],
    merged: &[MediaDeviceInfo],
    snapshot: &RegistrySnapshot,
) -> bool {
    if merged.len() != real.len() + snapshot.len() || merged[..real.len()] != *real {
        return false;
    }
    merged[real.len()..]
        .iter()
        .zip(snapshot.device_ids())
        .all(|(device, id)| device.is_synthetic() && device.device_id == id.to_string())
}

/// Wraps the enumeration entry point, appending one synthetic device per
/// registry entry after the real devices.
pub struct EnumerationInterceptor {
    real: Arc<dyn MediaDevices>,
    registry: Arc<RegistryClient>,
}

impl EnumerationInterceptor {
    pub fn new(real: Arc<dyn MediaDevices>, registry: Arc<RegistryClient>) -> Self {
        Self { real, registry }
    }

    pub async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CameraError> {
        match self.real.enumerate_devices().await {
            Ok(real) => {
                let snapshot = self.registry.snapshot();
                let mut devices = real.clone();
                devices.extend(synthetic_devices(&snapshot));
                assert_invariant!(
                    real_devices_first(&real, &devices, &snapshot),
                    REAL_DEVICES_FIRST,
                    "intercept::enumerate"
                );
                Ok(devices)
            }
            Err(e) => {
                // Same degrade policy as acquisition: one more plain attempt,
                // whose outcome goes to the caller untouched.
                log::warn!("Device enumeration failed, retrying without synthetic devices: {}", e);
                self.real.enumerate_devices().await
            }
        }
    }
}

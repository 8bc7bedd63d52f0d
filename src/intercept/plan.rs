//! Per-call routing decision for acquisition requests.

use crate::types::{MediaStreamConstraints, RegistrySnapshot, SyntheticDeviceId};

/// Why a call goes straight to the real entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateReason {
    /// The request does not ask for video.
    NoVideo,
    /// No synthetic cameras are configured (or the registry is still loading).
    EmptyRegistry,
    /// The caller named a device outside the synthetic naming convention.
    RealDeviceRequested(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionPlan {
    Delegate(DelegateReason),
    Synthesize {
        /// Registry position of the camera to render.
        index: usize,
        /// Identifier exactly as the caller requested it, if any.
        requested_id: Option<String>,
    },
}

/// Decide how to serve `constraints` given the current `snapshot`.
///
/// First match wins: no video or an empty registry delegates; a device id
/// outside the synthetic convention delegates; a synthetic id selects its
/// index, falling back to the first camera when the index is out of range
/// or has no leading digits; no id selects the first camera.
pub fn decide(constraints: &MediaStreamConstraints, snapshot: &RegistrySnapshot) -> AcquisitionPlan {
    if !constraints.video.is_requested() {
        return AcquisitionPlan::Delegate(DelegateReason::NoVideo);
    }
    if snapshot.is_empty() {
        return AcquisitionPlan::Delegate(DelegateReason::EmptyRegistry);
    }

    let requested = constraints.video.device_id().value();

    match requested {
        Some(id) if !SyntheticDeviceId::looks_synthetic(id) => {
            AcquisitionPlan::Delegate(DelegateReason::RealDeviceRequested(id.to_string()))
        }
        Some(id) => {
            let index = SyntheticDeviceId::leading_index(id)
                .filter(|&i| i < snapshot.len())
                .unwrap_or(0);
            AcquisitionPlan::Synthesize {
                index,
                requested_id: Some(id.to_string()),
            }
        }
        None => AcquisitionPlan::Synthesize {
            index: 0,
            requested_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CameraDefinition, DeviceIdConstraint};

    fn snapshot(n: usize) -> RegistrySnapshot {
        (0..n)
            .map(|i| CameraDefinition::new(format!("cam {}", i), "data:,"))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_audio_only_delegates() {
        assert_eq!(
            decide(&MediaStreamConstraints::audio_only(), &snapshot(2)),
            AcquisitionPlan::Delegate(DelegateReason::NoVideo)
        );
    }

    #[test]
    fn test_empty_registry_delegates() {
        assert_eq!(
            decide(&MediaStreamConstraints::video(), &snapshot(0)),
            AcquisitionPlan::Delegate(DelegateReason::EmptyRegistry)
        );
    }

    #[test]
    fn test_real_device_delegates() {
        let c = MediaStreamConstraints::video_device(DeviceIdConstraint::exact("abc123"));
        assert_eq!(
            decide(&c, &snapshot(2)),
            AcquisitionPlan::Delegate(DelegateReason::RealDeviceRequested("abc123".into()))
        );
    }

    #[test]
    fn test_no_id_selects_first() {
        assert_eq!(
            decide(&MediaStreamConstraints::video(), &snapshot(2)),
            AcquisitionPlan::Synthesize { index: 0, requested_id: None }
        );
    }

    #[test]
    fn test_exact_and_bare_select_index() {
        for constraint in [
            DeviceIdConstraint::exact("fake-camera-1"),
            DeviceIdConstraint::bare("fake-camera-1"),
        ] {
            let c = MediaStreamConstraints::video_device(constraint);
            assert_eq!(
                decide(&c, &snapshot(3)),
                AcquisitionPlan::Synthesize {
                    index: 1,
                    requested_id: Some("fake-camera-1".into())
                }
            );
        }
    }

    #[test]
    fn test_out_of_range_and_malformed_fall_back_to_first() {
        for id in ["fake-camera-9", "fake-camera-x", "fake-camera-", "fake-camera-10"] {
            let c = MediaStreamConstraints::video_device(DeviceIdConstraint::exact(id));
            assert_eq!(
                decide(&c, &snapshot(2)),
                AcquisitionPlan::Synthesize {
                    index: 0,
                    requested_id: Some(id.into())
                }
            );
        }
    }

    #[test]
    fn test_digit_prefix_selects_index() {
        for id in ["fake-camera-01", "fake-camera-1abc", "fake-camera-1.5"] {
            let c = MediaStreamConstraints::video_device(DeviceIdConstraint::exact(id));
            assert_eq!(
                decide(&c, &snapshot(2)),
                AcquisitionPlan::Synthesize {
                    index: 1,
                    requested_id: Some(id.into())
                }
            );
        }
    }

    #[test]
    fn test_empty_device_id_counts_as_absent() {
        let c = MediaStreamConstraints::video_device(DeviceIdConstraint::bare(""));
        assert_eq!(
            decide(&c, &snapshot(1)),
            AcquisitionPlan::Synthesize { index: 0, requested_id: None }
        );
    }
}

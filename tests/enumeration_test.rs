//! Enumeration interception

use std::sync::Arc;
use virtcam::invariant_ppt::{clear_invariant_log, contract_test, REAL_DEVICES_FIRST};
use virtcam::testing::{synthetic_camera, MockMediaDevices};
use virtcam::{
    CameraDefinition, CameraError, MediaDeviceInfo, MediaDeviceKind, MediaDevices,
    RegistryClient, SyntheticConfig, VirtualCameraShim,
};

fn shim_with(
    real: Arc<MockMediaDevices>,
    cameras: Vec<CameraDefinition>,
) -> VirtualCameraShim {
    let registry = Arc::new(RegistryClient::new());
    registry.replace(cameras);
    VirtualCameraShim::new(real, registry, SyntheticConfig::default())
}

fn mixed_real_devices() -> Vec<MediaDeviceInfo> {
    vec![
        MediaDeviceInfo::new("mic", MediaDeviceKind::AudioInput).with_label("Microphone"),
        MediaDeviceInfo::new("cam", MediaDeviceKind::VideoInput).with_label("Webcam"),
        MediaDeviceInfo::new("spk", MediaDeviceKind::AudioOutput).with_label("Speakers"),
    ]
}

#[tokio::test]
async fn test_desk_door_scenario() {
    let real = Arc::new(MockMediaDevices::with_devices(mixed_real_devices()));
    let shim = shim_with(
        real,
        vec![synthetic_camera("Desk", 4, 4), synthetic_camera("Door", 4, 4)],
    );

    let devices = shim.enumerate_devices().await.unwrap();
    assert_eq!(devices.len(), 5);
    assert_eq!(&devices[..3], &mixed_real_devices()[..]);

    let synthetic: Vec<_> = devices[3..].iter().map(|d| d.to_json()).collect();
    assert_eq!(
        synthetic,
        vec![
            serde_json::json!({
                "deviceId": "fake-camera-0",
                "groupId": "fake-cameras-group",
                "kind": "videoinput",
                "label": "Desk",
            }),
            serde_json::json!({
                "deviceId": "fake-camera-1",
                "groupId": "fake-cameras-group",
                "kind": "videoinput",
                "label": "Door",
            }),
        ]
    );
}

#[tokio::test]
async fn test_length_is_real_plus_registry() {
    for (real_count, registry_size) in [(0, 0), (0, 3), (2, 0), (3, 4)] {
        let real = Arc::new(MockMediaDevices::with_cameras(real_count));
        let cameras = (0..registry_size)
            .map(|i| synthetic_camera(&format!("cam {}", i), 2, 2))
            .collect();
        let shim = shim_with(real, cameras);

        let devices = shim.enumerate_devices().await.unwrap();
        assert_eq!(devices.len(), real_count + registry_size);
        assert!(devices[..real_count].iter().all(|d| !d.is_synthetic()));
        assert!(devices[real_count..].iter().all(MediaDeviceInfo::is_synthetic));
    }
}

#[tokio::test]
async fn test_empty_registry_returns_real_list_unchanged() {
    let real = Arc::new(MockMediaDevices::with_devices(mixed_real_devices()));
    let shim = shim_with(real.clone(), Vec::new());

    assert_eq!(shim.enumerate_devices().await.unwrap(), mixed_real_devices());
    assert_eq!(real.enumeration_calls(), 1);
}

#[tokio::test]
async fn test_failure_retries_real_call_once() {
    let real = Arc::new(MockMediaDevices::with_cameras(2));
    real.fail_next_enumerations(1);
    let shim = shim_with(real.clone(), vec![synthetic_camera("Desk", 2, 2)]);

    let devices = shim.enumerate_devices().await.unwrap();
    assert_eq!(real.enumeration_calls(), 2);
    assert_eq!(devices.len(), 2);
    assert!(devices.iter().all(|d| !d.is_synthetic()));
}

#[tokio::test]
async fn test_repeated_failure_propagates_real_error() {
    let real = Arc::new(MockMediaDevices::with_cameras(1));
    real.fail_next_enumerations(2);
    let shim = shim_with(real.clone(), vec![synthetic_camera("Desk", 2, 2)]);

    let err = shim.enumerate_devices().await.unwrap_err();
    assert!(matches!(err, CameraError::UpstreamEnumeration(_)));
    assert_eq!(real.enumeration_calls(), 2);
}

#[tokio::test]
async fn test_enumeration_contract() {
    clear_invariant_log();
    let shim = shim_with(
        Arc::new(MockMediaDevices::with_cameras(1)),
        vec![synthetic_camera("Desk", 2, 2)],
    );
    shim.enumerate_devices().await.unwrap();
    contract_test("enumeration", &[REAL_DEVICES_FIRST]);
}

//! Property-based tests for device-id handling and routing
//!
//! Run with: cargo test --test device_id_props

use proptest::prelude::*;
use virtcam::intercept::{decide, AcquisitionPlan, DelegateReason};
use virtcam::{
    CameraDefinition, DeviceIdConstraint, MediaStreamConstraints, RegistrySnapshot,
    SyntheticDeviceId,
};

fn snapshot(len: usize) -> RegistrySnapshot {
    (0..len)
        .map(|i| CameraDefinition::new(format!("cam {}", i), "data:,"))
        .collect::<Vec<_>>()
        .into()
}

proptest! {
    /// INVARIANT: every rendered id parses back to its index
    #[test]
    fn rendered_ids_parse_back(index in 0usize..1_000_000) {
        let id = SyntheticDeviceId::new(index);
        prop_assert_eq!(SyntheticDeviceId::parse(&id.to_string()), Some(id));
    }

    /// INVARIANT: leading zeros are not part of the id grammar
    #[test]
    fn leading_zeros_are_rejected(index in 0usize..10_000, zeros in 1usize..4) {
        let id = format!("fake-camera-{}{}", "0".repeat(zeros), index);
        prop_assert_eq!(SyntheticDeviceId::parse(&id), None);
    }

    /// INVARIANT: routing reads the leading digits, so padded ids pick the same camera
    #[test]
    fn padded_ids_select_their_index(len in 1usize..20, pick in 0usize..20, zeros in 1usize..4, tail in "[a-z]{0,3}") {
        let index = pick % len;
        let id = format!("fake-camera-{}{}{}", "0".repeat(zeros), index, tail);
        let plan = decide(
            &MediaStreamConstraints::video_device(DeviceIdConstraint::exact(id.clone())),
            &snapshot(len),
        );
        prop_assert_eq!(plan, AcquisitionPlan::Synthesize { index, requested_id: Some(id) });
    }

    /// INVARIANT: in-range synthetic ids select their own index
    #[test]
    fn in_range_ids_select_their_index(len in 1usize..20, pick in 0usize..20) {
        let index = pick % len;
        let id = SyntheticDeviceId::new(index).to_string();
        let plan = decide(
            &MediaStreamConstraints::video_device(DeviceIdConstraint::exact(id.clone())),
            &snapshot(len),
        );
        prop_assert_eq!(plan, AcquisitionPlan::Synthesize { index, requested_id: Some(id) });
    }

    /// INVARIANT: out-of-range synthetic ids fall back to the first camera
    #[test]
    fn out_of_range_ids_select_first(len in 1usize..20, extra in 0usize..1000) {
        let id = SyntheticDeviceId::new(len + extra).to_string();
        let plan = decide(
            &MediaStreamConstraints::video_device(DeviceIdConstraint::bare(id.clone())),
            &snapshot(len),
        );
        prop_assert_eq!(plan, AcquisitionPlan::Synthesize { index: 0, requested_id: Some(id) });
    }

    /// INVARIANT: ids outside the convention always reach the real devices
    #[test]
    fn foreign_ids_delegate(id in "[a-zA-Z0-9]{1,32}", len in 0usize..5) {
        prop_assume!(!id.starts_with("fake-camera-"));
        let plan = decide(
            &MediaStreamConstraints::video_device(DeviceIdConstraint::exact(id.clone())),
            &snapshot(len),
        );
        let expected = if len == 0 {
            DelegateReason::EmptyRegistry
        } else {
            DelegateReason::RealDeviceRequested(id)
        };
        prop_assert_eq!(plan, AcquisitionPlan::Delegate(expected));
    }

    /// INVARIANT: the JSON forms of deviceId decode to the same routing
    #[test]
    fn json_forms_agree(index in 0usize..5) {
        let id = SyntheticDeviceId::new(index).to_string();
        let bare: MediaStreamConstraints =
            serde_json::from_value(serde_json::json!({ "video": { "deviceId": id } })).unwrap();
        let exact: MediaStreamConstraints =
            serde_json::from_value(serde_json::json!({ "video": { "deviceId": { "exact": id } } }))
                .unwrap();
        let snap = snapshot(3);
        prop_assert_eq!(decide(&bare, &snap), decide(&exact, &snap));
    }
}

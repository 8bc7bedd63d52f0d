//! Testing utilities for virtcam
//!
//! Synthetic images and a scriptable stand-in for the host media API, so the
//! shim can be exercised without cameras.

pub mod mock_devices;
pub mod synthetic_data;

pub use mock_devices::MockMediaDevices;
pub use synthetic_data::{synthetic_camera, synthetic_data_uri, synthetic_png};

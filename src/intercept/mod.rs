//! Interception of the acquisition and enumeration entry points.

pub mod acquire;
pub mod enumerate;
pub mod plan;
pub mod shim;

pub use acquire::AcquisitionInterceptor;
pub use enumerate::{synthetic_devices, EnumerationInterceptor};
pub use plan::{decide, AcquisitionPlan, DelegateReason};
pub use shim::VirtualCameraShim;

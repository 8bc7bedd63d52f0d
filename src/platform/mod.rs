//! Real camera backends the shim can wrap.

#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "native")]
pub use native::NativeMediaDevices;

use crate::media::MediaDevices;
use std::sync::Arc;

/// Host API used when the caller does not supply one.
///
/// Native cameras when built with the `native` feature, otherwise a host that
/// reports no devices and rejects acquisition.
pub fn default_media_devices() -> Arc<dyn MediaDevices> {
    #[cfg(feature = "native")]
    {
        Arc::new(NativeMediaDevices::new())
    }
    #[cfg(not(feature = "native"))]
    {
        log::debug!("Built without native camera support, real devices unavailable");
        Arc::new(crate::media::UnavailableMediaDevices)
    }
}

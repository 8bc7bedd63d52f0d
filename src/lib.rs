//! virtcam: virtual cameras behind a media-devices API
//!
//! Wraps a host's acquisition and enumeration entry points so that still
//! images from a camera registry show up as ordinary video inputs. Asking for
//! one of those inputs returns a live ~30fps track rendered from the image;
//! everything else goes to the real devices untouched.
//!
//! # Features
//! - Synthetic devices appended after the real ones in enumeration
//! - Still image to live track generation, sized to the source image
//! - Registry snapshots that follow an in-memory or JSON-file store
//! - Fallback to the real devices whenever synthesis fails
//! - Optional native cameras (`native`) and Tauri plugin (`tauri`)
//!
//! # Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use virtcam::{MediaDevices, MemoryStore, MediaStreamConstraints, RegistryClient};
//!
//! let store = Arc::new(MemoryStore::default());
//! let registry = RegistryClient::connect(store.clone());
//! let shim = virtcam::global::install(
//!     virtcam::platform::default_media_devices(),
//!     registry,
//!     Default::default(),
//! );
//! let devices = shim.enumerate_devices().await?;
//! let stream = shim.get_user_media(&MediaStreamConstraints::video()).await?;
//! ```
//!
//! With the `tauri` feature:
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(virtcam::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
#[cfg(feature = "tauri")]
pub mod commands;
pub mod config;
pub mod errors;
pub mod global;
pub mod intercept;
pub mod invariant_ppt;
pub mod media;
pub mod platform;
pub mod registry;
pub mod synth;
pub mod timing;
pub mod types;

// Testing utilities - synthetic images and a mock host API
pub mod testing;

// Re-exports for convenience
pub use config::{RegistryConfig, SyntheticConfig, VirtcamConfig};
pub use errors::CameraError;
pub use intercept::VirtualCameraShim;
pub use media::{MediaDevices, MediaStream, MediaStreamTrack, VideoFrame};
pub use registry::{JsonFileStore, MemoryStore, RegistryClient, RegistryStore, RegistryUpdate};
pub use synth::SyntheticStreamGenerator;
pub use types::{
    AudioRequest, CameraDefinition, DeviceIdConstraint, MediaDeviceInfo, MediaDeviceKind,
    MediaStreamConstraints, RegistrySnapshot, SyntheticDeviceId, TrackSettings,
};

#[cfg(feature = "tauri")]
use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the virtcam plugin with all commands
#[cfg(feature = "tauri")]
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("virtcam")
        .invoke_handler(tauri::generate_handler![
            // Media-device commands
            commands::devices::enumerate_devices,
            commands::devices::get_user_media,
            commands::devices::stop_stream,
            commands::devices::get_stream_settings,
            commands::devices::get_latest_frame,
            // Registry commands
            commands::registry::get_cameras,
            commands::registry::set_cameras,
        ])
        .build()
}

/// Initialize logging for the shim
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "virtcam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        native_cameras: cfg!(feature = "native"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub native_cameras: bool,
}

pub mod devices;
pub mod registry;

pub use devices::*;
pub use registry::*;

use crate::config::VirtcamConfig;
use crate::global;
use crate::intercept::VirtualCameraShim;
use crate::platform;
use crate::registry::{JsonFileStore, RegistryClient};
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref CONFIG: VirtcamConfig = VirtcamConfig::load_layered(VirtcamConfig::default_path())
        .unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            VirtcamConfig::default()
        });
    static ref STORE: Arc<JsonFileStore> = Arc::new(JsonFileStore::from_config(&CONFIG.registry));
}

/// Installed shim, installing it around the platform cameras on first use.
pub(crate) fn shim() -> Arc<VirtualCameraShim> {
    if let Some(shim) = global::installed() {
        return shim;
    }
    let registry = RegistryClient::connect(STORE.clone());
    global::install(
        platform::default_media_devices(),
        registry,
        CONFIG.synthetic.clone(),
    )
}

pub(crate) fn store() -> Arc<JsonFileStore> {
    STORE.clone()
}

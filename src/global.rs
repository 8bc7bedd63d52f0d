//! Process-wide shim state
//!
//! The shim is installed at most once per process. Later installs are no-ops
//! that hand back the shim already in place, so a host that loads the shim
//! twice still sees a single set of interceptors.

use crate::config::SyntheticConfig;
use crate::intercept::VirtualCameraShim;
use crate::media::MediaDevices;
use crate::registry::RegistryClient;
use std::sync::{Arc, RwLock};

lazy_static::lazy_static! {
    static ref INSTALLED: RwLock<Option<Arc<VirtualCameraShim>>> = RwLock::new(None);
}

/// Install the shim around `real`, or return the one already installed.
pub fn install(
    real: Arc<dyn MediaDevices>,
    registry: Arc<RegistryClient>,
    config: SyntheticConfig,
) -> Arc<VirtualCameraShim> {
    let mut slot = INSTALLED.write().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = slot.as_ref() {
        log::debug!("Virtual camera shim already installed, keeping existing one");
        return existing.clone();
    }

    let shim = Arc::new(VirtualCameraShim::new(real, registry, config));
    *slot = Some(shim.clone());
    log::info!("Virtual camera shim installed");
    shim
}

pub fn installed() -> Option<Arc<VirtualCameraShim>> {
    INSTALLED.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Remove the installed shim. Streams already handed out keep running.
pub fn uninstall() -> Option<Arc<VirtualCameraShim>> {
    let removed = INSTALLED.write().unwrap_or_else(|e| e.into_inner()).take();
    if removed.is_some() {
        log::info!("Virtual camera shim uninstalled");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::UnavailableMediaDevices;

    // Single test: the slot is process-wide and tests run in parallel.
    #[test]
    fn test_install_is_idempotent() {
        uninstall();
        assert!(installed().is_none());

        let first_registry = Arc::new(RegistryClient::new());
        let first = install(
            Arc::new(UnavailableMediaDevices),
            first_registry.clone(),
            SyntheticConfig::default(),
        );
        let second = install(
            Arc::new(UnavailableMediaDevices),
            Arc::new(RegistryClient::new()),
            SyntheticConfig::default(),
        );

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.registry(), &first_registry));
        assert!(installed().is_some());

        let removed = uninstall().unwrap();
        assert!(Arc::ptr_eq(&removed, &first));
        assert!(installed().is_none());
    }
}

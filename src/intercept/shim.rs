use super::acquire::AcquisitionInterceptor;
use super::enumerate::EnumerationInterceptor;
use crate::config::SyntheticConfig;
use crate::errors::CameraError;
use crate::media::{MediaDevices, MediaStream};
use crate::registry::RegistryClient;
use crate::synth::SyntheticStreamGenerator;
use crate::types::{MediaDeviceInfo, MediaStreamConstraints};
use async_trait::async_trait;
use std::sync::Arc;

/// Drop-in replacement for a `MediaDevices` implementation that adds the
/// registry's synthetic cameras.
pub struct VirtualCameraShim {
    registry: Arc<RegistryClient>,
    acquisition: AcquisitionInterceptor,
    enumeration: EnumerationInterceptor,
}

impl VirtualCameraShim {
    pub fn new(
        real: Arc<dyn MediaDevices>,
        registry: Arc<RegistryClient>,
        config: SyntheticConfig,
    ) -> Self {
        Self {
            acquisition: AcquisitionInterceptor::new(
                real.clone(),
                registry.clone(),
                SyntheticStreamGenerator::new(config),
            ),
            enumeration: EnumerationInterceptor::new(real, registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<RegistryClient> {
        &self.registry
    }
}

#[async_trait]
impl MediaDevices for VirtualCameraShim {
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CameraError> {
        self.acquisition.get_user_media(constraints).await
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, CameraError> {
        self.enumeration.enumerate_devices().await
    }
}

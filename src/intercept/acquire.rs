use super::plan::{decide, AcquisitionPlan};
use crate::assert_invariant;
use crate::errors::CameraError;
use crate::invariant_ppt::INDEX_IN_SNAPSHOT;
use crate::media::{MediaDevices, MediaStream};
use crate::registry::RegistryClient;
use crate::synth::SyntheticStreamGenerator;
use crate::types::MediaStreamConstraints;
use std::sync::Arc;

/// Wraps the acquisition entry point.
///
/// Calls that look like synthetic-camera requests are served by the
/// generator; everything else, and every failed synthesis, goes to the real
/// entry point unchanged.
pub struct AcquisitionInterceptor {
    real: Arc<dyn MediaDevices>,
    registry: Arc<RegistryClient>,
    generator: SyntheticStreamGenerator,
}

impl AcquisitionInterceptor {
    pub fn new(
        real: Arc<dyn MediaDevices>,
        registry: Arc<RegistryClient>,
        generator: SyntheticStreamGenerator,
    ) -> Self {
        Self {
            real,
            registry,
            generator,
        }
    }

    pub async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CameraError> {
        let snapshot = self.registry.snapshot();

        let (index, requested_id) = match decide(constraints, &snapshot) {
            AcquisitionPlan::Delegate(reason) => {
                log::debug!("Delegating acquisition to real devices: {:?}", reason);
                return self.real.get_user_media(constraints).await;
            }
            AcquisitionPlan::Synthesize {
                index,
                requested_id,
            } => (index, requested_id),
        };

        assert_invariant!(index < snapshot.len(), INDEX_IN_SNAPSHOT, "intercept::acquire");
        let Some(definition) = snapshot.get(index) else {
            return self.real.get_user_media(constraints).await;
        };

        match self
            .generator
            .synthesize(definition, requested_id.as_deref())
            .await
        {
            Ok(track) => Ok(MediaStream::new(vec![track])),
            Err(e) => {
                log::error!(
                    "Synthetic camera '{}' failed, falling back to real devices: {}",
                    definition.name,
                    e
                );
                self.real.get_user_media(constraints).await
            }
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    /// The configured image could not be decoded into a raster.
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    /// Any other failure while building a synthetic track.
    #[error("Synthesis failure: {0}")]
    SynthesisFailure(String),
    /// The wrapped acquisition entry point failed.
    #[error("Upstream acquisition error: {0}")]
    UpstreamAcquisition(String),
    /// The wrapped enumeration entry point failed.
    #[error("Upstream enumeration error: {0}")]
    UpstreamEnumeration(String),
    #[error("Registry error: {0}")]
    Registry(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CameraError {
    /// Errors raised while synthesizing; the interceptors turn these into a
    /// fallback to the real entry point instead of surfacing them.
    pub fn is_synthesis_failure(&self) -> bool {
        matches!(
            self,
            CameraError::ImageDecode(_) | CameraError::SynthesisFailure(_)
        )
    }

    /// Errors coming from the wrapped host API.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CameraError::UpstreamAcquisition(_) | CameraError::UpstreamEnumeration(_)
        )
    }
}


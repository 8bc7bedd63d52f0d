//! Configuration management for virtcam
//!
//! Provides loading, saving and validation of the synthetic-stream and
//! registry settings. Files are TOML; `load_layered` additionally overlays
//! `VIRTCAM__<SECTION>__<KEY>` environment variables.

use crate::errors::CameraError;
use crate::types::{DEFAULT_FRAME_RATE, DEFAULT_MAX_IMAGE_BYTES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtcamConfig {
    pub synthetic: SyntheticConfig,
    pub registry: RegistryConfig,
}

/// Synthetic stream generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Nominal capture rate hint for synthetic tracks
    pub frame_rate: u32,
    /// Redraw cadence of the render loop (the display refresh rate)
    pub refresh_rate_hz: u32,
    /// Largest surface edge, in pixels, a synthetic track may use
    pub max_surface_dimension: u32,
}

/// Camera registry storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file holding the camera definitions
    pub store_path: String,
    /// Largest encoded image accepted when saving a definition
    pub max_image_bytes: u64,
}

impl Default for VirtcamConfig {
    fn default() -> Self {
        Self {
            synthetic: SyntheticConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            refresh_rate_hz: 60,
            max_surface_dimension: 16384,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store_path: "virtcam-cameras.json".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl SyntheticConfig {
    /// Period between redraws of the render loop.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate_hz.max(1) as f64)
    }

    /// Minimum spacing between two delivered frames.
    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

impl VirtcamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::Config(format!("Failed to read config file: {}", e)))?;

        let config: VirtcamConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the TOML file (optional) and overlay `VIRTCAM__*` environment variables
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| CameraError::Config(format!("Failed to seed defaults: {}", e)))?;

        let layered = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix("VIRTCAM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CameraError::Config(format!("Failed to build config: {}", e)))?;

        let config: VirtcamConfig = layered
            .try_deserialize()
            .map_err(|e| CameraError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate().map_err(CameraError::Config)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CameraError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("virtcam.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.synthetic.frame_rate == 0 || self.synthetic.frame_rate > 240 {
            return Err("Invalid frame rate (must be 1-240)".to_string());
        }
        if self.synthetic.refresh_rate_hz == 0 || self.synthetic.refresh_rate_hz > 1000 {
            return Err("Invalid refresh rate (must be 1-1000 Hz)".to_string());
        }
        if self.synthetic.max_surface_dimension == 0 {
            return Err("Maximum surface dimension must be positive".to_string());
        }
        if self.registry.store_path.trim().is_empty() {
            return Err("Registry store path must not be empty".to_string());
        }
        if self.registry.max_image_bytes == 0 {
            return Err("Maximum image size must be positive".to_string());
        }
        Ok(())
    }
}

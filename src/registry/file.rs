//! JSON-file camera store
//!
//! Persisted form: `{"cameras": [{"name": "...", "image": "data:..."}]}`.

use super::store::{RegistryStore, RegistryUpdate, CHANGE_FEED_CAPACITY};
use crate::config::RegistryConfig;
use crate::errors::CameraError;
use crate::types::{CameraDefinition, DEFAULT_MAX_IMAGE_BYTES};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, Mutex};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedRegistry {
    #[serde(default)]
    cameras: Vec<CameraDefinition>,
}

pub struct JsonFileStore {
    path: PathBuf,
    max_image_bytes: u64,
    notify: broadcast::Sender<RegistryUpdate>,
    // Revision of the last publication. Held across file access so
    // revisions, file contents and published order agree.
    io: Mutex<u64>,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let (notify, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            path: path.into(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            notify,
            io: Mutex::new(0),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(&config.store_path).with_max_image_bytes(config.max_image_bytes)
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: u64) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<CameraDefinition>, CameraError> {
        let exists = tokio::fs::try_exists(&self.path).await.map_err(|e| {
            CameraError::Registry(format!("Failed to access registry file {:?}: {}", self.path, e))
        })?;
        if !exists {
            log::debug!("Registry file {:?} not found, treating as empty", self.path);
            return Ok(Vec::new());
        }

        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CameraError::Registry(format!("Failed to read registry file {:?}: {}", self.path, e))
        })?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let persisted: PersistedRegistry = serde_json::from_str(&contents).map_err(|e| {
            CameraError::Registry(format!("Failed to parse registry file {:?}: {}", self.path, e))
        })?;
        Ok(persisted.cameras)
    }

    /// Validate and persist `cameras`, then publish them as the new list.
    pub async fn save(&self, cameras: &[CameraDefinition]) -> Result<(), CameraError> {
        for camera in cameras {
            camera.validate(self.max_image_bytes)?;
        }

        let mut revision = self.io.lock().await;
        let persisted = PersistedRegistry {
            cameras: cameras.to_vec(),
        };
        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|e| CameraError::Registry(format!("Failed to serialize registry: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CameraError::Registry(format!("Failed to create registry directory: {}", e))
                })?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CameraError::Registry(format!("Failed to write registry file: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CameraError::Registry(format!("Failed to replace registry file: {}", e)))?;

        *revision += 1;
        log::info!(
            "Saved {} camera(s) to {:?} (revision {})",
            cameras.len(),
            self.path,
            *revision
        );
        let _ = self.notify.send(RegistryUpdate::new(*revision, cameras.to_vec()));
        Ok(())
    }

    /// Re-read the file and publish its contents as a change.
    pub async fn reload(&self) -> Result<Vec<CameraDefinition>, CameraError> {
        let mut revision = self.io.lock().await;
        let cameras = self.read().await?;
        *revision += 1;
        let _ = self.notify.send(RegistryUpdate::new(*revision, cameras.clone()));
        Ok(cameras)
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn fetch(&self) -> Result<RegistryUpdate, CameraError> {
        let revision = self.io.lock().await;
        let cameras = self.read().await?;
        Ok(RegistryUpdate::new(*revision, cameras))
    }

    fn changes(&self) -> broadcast::Receiver<RegistryUpdate> {
        self.notify.subscribe()
    }
}

use crate::error::{Error, Result};
use crate::registry::models::{Camera, CameraPatch};
use crate::store::KeyValueStore;
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persistent store of registered cameras, kept as one JSON array under a
/// single key. Every mutation re-reads the whole collection, transforms it
/// and writes it back.
pub struct CameraRegistry {
    store: Arc<dyn KeyValueStore>,
    key: String,
    // serializes the read-modify-write cycle so overlapping mutations
    // cannot drop each other's writes
    write_lock: Mutex<()>,
}

impl CameraRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// All stored cameras in insertion order; empty when nothing was saved.
    pub async fn list(&self) -> Result<Vec<Camera>> {
        self.load().await
    }

    /// Append a camera and persist the full collection. The caller assigns
    /// a unique id beforehand; the registry does not deduplicate.
    pub async fn add(&self, camera: Camera) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut cameras = self.load().await?;
        info!("Saving camera {} ({})", camera.name, camera.id);
        cameras.push(camera);
        self.persist(&cameras).await
    }

    /// Remove the record with the given id; unknown ids are a no-op.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut cameras = self.load().await?;
        cameras.retain(|camera| camera.id != id);
        self.persist(&cameras).await
    }

    /// Merge patch fields into the matching record; unknown ids are a no-op.
    pub async fn update(&self, id: &str, patch: CameraPatch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut cameras = self.load().await?;
        if let Some(camera) = cameras.iter_mut().find(|camera| camera.id == id) {
            camera.apply_patch(patch);
        }
        self.persist(&cameras).await
    }

    /// Linear search by id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Camera>> {
        Ok(self.load().await?.into_iter().find(|camera| camera.id == id))
    }

    /// Drop the entire collection key.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&self.key).await
    }

    async fn load(&self) -> Result<Vec<Camera>> {
        match self.store.get(&self.key).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| Error::Serialization(format!("Failed to parse camera list: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, cameras: &[Camera]) -> Result<()> {
        let json = serde_json::to_string(cameras)
            .map_err(|e| Error::Serialization(format!("Failed to encode camera list: {}", e)))?;
        self.store.set(&self.key, &json).await
    }
}

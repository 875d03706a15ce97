use crate::error::{Error, Result};
use crate::registry::models::Snapshot;
use crate::store::{FileStore, KeyValueStore};
use chrono::Local;
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persistent store of captured stills: metadata as one JSON array under a
/// single key, images as individual files in one app-private directory.
pub struct SnapshotRegistry {
    store: Arc<dyn KeyValueStore>,
    files: Arc<dyn FileStore>,
    key: String,
    snapshot_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotRegistry {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        files: Arc<dyn FileStore>,
        key: impl Into<String>,
        snapshot_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            files,
            key: key.into(),
            snapshot_dir: snapshot_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Materialize a still image into the snapshot directory and record it,
    /// newest first. Remote sources are downloaded, local ones copied. The
    /// denormalized camera name and location are frozen at capture time.
    pub async fn capture(
        &self,
        camera_id: &str,
        camera_name: &str,
        location: &str,
        source: &str,
    ) -> Result<Snapshot> {
        let _guard = self.write_lock.lock().await;

        self.files
            .ensure_dir(&self.snapshot_dir)
            .await
            .map_err(|e| Error::Snapshot(format!("Failed to prepare snapshot directory: {}", e)))?;

        let now = Local::now();
        let file_name = format!("snapshot_{}.jpg", now.timestamp_millis());
        let path = self.snapshot_dir.join(&file_name);

        if source.starts_with("http://") || source.starts_with("https://") {
            self.files.download(source, &path).await
        } else {
            self.files.copy(Path::new(source), &path).await
        }
        .map_err(|e| Error::Snapshot(format!("Failed to store snapshot image: {}", e)))?;

        let snapshot = Snapshot {
            id: random_token(9),
            camera_id: camera_id.to_string(),
            camera_name: camera_name.to_string(),
            location: location.to_string(),
            timestamp: now.format("%m/%d/%Y, %I:%M:%S %p").to_string(),
            date: now.to_rfc3339(),
            image_uri: path.to_string_lossy().into_owned(),
        };

        // the image file stays orphaned if this persist fails; no partial
        // record ever becomes visible to readers
        let mut snapshots = self.load().await?;
        snapshots.insert(0, snapshot.clone());
        self.persist(&snapshots)
            .await
            .map_err(|e| Error::Snapshot(format!("Failed to persist snapshot metadata: {}", e)))?;

        info!(
            "Captured snapshot {} for camera {} ({})",
            snapshot.id, camera_name, camera_id
        );
        Ok(snapshot)
    }

    /// All stored snapshots, newest first by construction order.
    pub async fn list(&self) -> Result<Vec<Snapshot>> {
        self.load().await
    }

    /// Delete the referenced file, then the metadata record. Unknown ids
    /// are a no-op. A failed metadata write after the file delete leaves
    /// a dangling record; the leak is accepted.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshots = self.load().await?;

        let Some(index) = snapshots.iter().position(|s| s.id == id) else {
            warn!("Snapshot {} not found, nothing to remove", id);
            return Ok(());
        };
        let snapshot = snapshots.remove(index);

        self.files
            .delete_file(Path::new(&snapshot.image_uri))
            .await
            .map_err(|e| Error::Snapshot(format!("Failed to delete snapshot file: {}", e)))?;

        self.persist(&snapshots)
            .await
            .map_err(|e| Error::Snapshot(format!("Failed to persist snapshot metadata: {}", e)))
    }

    /// Drop every snapshot and its files, then recreate the empty directory
    /// so the next capture needs no existence check.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        self.files
            .delete_dir(&self.snapshot_dir)
            .await
            .map_err(|e| Error::Snapshot(format!("Failed to delete snapshot directory: {}", e)))?;
        self.store
            .remove(&self.key)
            .await
            .map_err(|e| Error::Snapshot(format!("Failed to clear snapshot metadata: {}", e)))?;
        self.files
            .ensure_dir(&self.snapshot_dir)
            .await
            .map_err(|e| Error::Snapshot(format!("Failed to recreate snapshot directory: {}", e)))
    }

    async fn load(&self) -> Result<Vec<Snapshot>> {
        match self.store.get(&self.key).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| Error::Serialization(format!("Failed to parse snapshot list: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, snapshots: &[Snapshot]) -> Result<()> {
        let json = serde_json::to_string(snapshots)
            .map_err(|e| Error::Serialization(format!("Failed to encode snapshot list: {}", e)))?;
        self.store.set(&self.key, &json).await
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalFileStore, MemoryKeyValueStore};
    use anyhow::Result;
    use std::time::Duration;

    struct Fixture {
        registry: SnapshotRegistry,
        _dir: tempfile::TempDir,
        source: PathBuf,
    }

    async fn fixture() -> Result<Fixture> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("frame.jpg");
        tokio::fs::write(&source, b"jpeg bytes").await?;

        let registry = SnapshotRegistry::new(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(LocalFileStore::new()),
            "cctv_snapshots",
            dir.path().join("snapshots"),
        );
        Ok(Fixture {
            registry,
            _dir: dir,
            source,
        })
    }

    #[tokio::test]
    async fn capture_materializes_a_file_and_a_record() -> Result<()> {
        let fx = fixture().await?;
        let snapshot = fx
            .registry
            .capture("cam-1", "Front Door", "Entrance", fx.source.to_str().unwrap())
            .await?;

        assert_eq!(snapshot.id.len(), 9);
        assert_eq!(snapshot.camera_id, "cam-1");
        assert!(Path::new(&snapshot.image_uri).exists());

        let listed = fx.registry.list().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], snapshot);
        Ok(())
    }

    #[tokio::test]
    async fn list_is_newest_first() -> Result<()> {
        let fx = fixture().await?;
        let src = fx.source.to_str().unwrap().to_string();

        let first = fx.registry.capture("cam-1", "Front", "Hall", &src).await?;
        // file names are keyed by capture millis
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = fx.registry.capture("cam-1", "Front", "Hall", &src).await?;

        let listed = fx.registry.list().await?;
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn remove_deletes_file_then_record() -> Result<()> {
        let fx = fixture().await?;
        let snapshot = fx
            .registry
            .capture("cam-1", "Front", "Hall", fx.source.to_str().unwrap())
            .await?;

        fx.registry.remove(&snapshot.id).await?;
        assert!(!Path::new(&snapshot.image_uri).exists());
        assert!(fx.registry.list().await?.is_empty());

        // absent id is a no-op
        fx.registry.remove(&snapshot.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn clear_empties_everything_and_allows_new_captures() -> Result<()> {
        let fx = fixture().await?;
        let src = fx.source.to_str().unwrap().to_string();
        fx.registry.capture("cam-1", "Front", "Hall", &src).await?;

        fx.registry.clear().await?;
        assert!(fx.registry.list().await?.is_empty());

        // directory was recreated, so capturing again just works
        let snapshot = fx.registry.capture("cam-1", "Front", "Hall", &src).await?;
        assert!(Path::new(&snapshot.image_uri).exists());
        Ok(())
    }

    #[tokio::test]
    async fn capture_from_missing_source_fails_with_snapshot_error() -> Result<()> {
        let fx = fixture().await?;
        let err = fx
            .registry
            .capture("cam-1", "Front", "Hall", "/nonexistent/frame.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Snapshot(_)));
        // the failed capture left no record behind
        assert!(fx.registry.list().await?.is_empty());
        Ok(())
    }
}

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// File operations inside the app-private data directory.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn ensure_dir(&self, path: &Path) -> Result<()>;

    async fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Fetch a remote resource and materialize it at `to`.
    async fn download(&self, url: &str, to: &Path) -> Result<()>;

    /// Deleting a missing file is not an error.
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Deleting a missing directory is not an error.
    async fn delete_dir(&self, path: &Path) -> Result<()>;
}

/// Local-disk implementation; downloads go through a shared HTTP client.
pub struct LocalFileStore {
    client: reqwest::Client,
}

impl LocalFileStore {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for LocalFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            Error::Io(format!("Failed to create directory {}: {}", path.display(), e))
        })
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to).await.map(|_| ()).map_err(|e| {
            Error::Io(format!(
                "Failed to copy {} to {}: {}",
                from.display(),
                to.display(),
                e
            ))
        })
    }

    async fn download(&self, url: &str, to: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Io(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Io(format!(
                "Fetch of {} returned {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Io(format!("Failed to read body of {}: {}", url, e)))?;

        fs::write(to, &bytes)
            .await
            .map_err(|e| Error::Io(format!("Failed to write {}: {}", to.display(), e)))
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete_dir(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!(
                "Failed to delete directory {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

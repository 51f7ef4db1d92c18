//! Directory-backed content store
//!
//! Each container is a directory under the store root and each blob a file
//! inside it.

use super::{BlobTarget, ContentStore};
use crate::core::error::{PublishError, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct LocalContainerStore {
    root: PathBuf,
}

impl LocalContainerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `target`
    pub fn blob_path(&self, target: &BlobTarget) -> PathBuf {
        self.root.join(&target.container).join(&target.blob)
    }
}

#[async_trait]
impl ContentStore for LocalContainerStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn ensure_container(&self, container: &str) -> Result<()> {
        let dir = self.root.join(container);
        if fs::try_exists(&dir).await.unwrap_or(false) {
            tracing::debug!(container, "container already exists");
            return Ok(());
        }
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PublishError::io(&dir, e))?;
        tracing::info!(container, path = %dir.display(), "created container");
        Ok(())
    }

    async fn blob_exists(&self, target: &BlobTarget) -> Result<bool> {
        let path = self.blob_path(target);
        fs::try_exists(&path)
            .await
            .map_err(|e| PublishError::io(&path, e))
    }

    async fn upload_blob(
        &self,
        target: &BlobTarget,
        content: Vec<u8>,
        overwrite: bool,
    ) -> Result<String> {
        let path = self.blob_path(target);
        let mut options = fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = options.open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                PublishError::DestinationExists {
                    destination: self.blob_uri(target),
                }
            } else {
                PublishError::io(&path, e)
            }
        })?;
        file.write_all(&content)
            .await
            .map_err(|e| PublishError::io(&path, e))?;
        file.flush().await.map_err(|e| PublishError::io(&path, e))?;

        tracing::info!(blob = %target, bytes = content.len(), "stored blob");
        Ok(self.blob_uri(target))
    }

    fn blob_uri(&self, target: &BlobTarget) -> String {
        let path = self.blob_path(target);
        Url::from_file_path(&path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", path.display()))
    }
}

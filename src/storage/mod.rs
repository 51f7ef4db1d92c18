//! Remote content stores
//!
//! The publisher talks to storage through [`ContentStore`]. Two stores are
//! provided: [`BlobServiceClient`] for the Azure Blob REST API and
//! [`LocalContainerStore`], a directory per container, for offline runs.

pub mod blob;
pub mod local;

pub use blob::{BlobServiceClient, STORAGE_API_VERSION};
pub use local::LocalContainerStore;

use crate::core::config_loader::is_valid_container_name;
use crate::core::error::{PublishError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Container and blob an archive is published to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobTarget {
    pub container: String,
    pub blob: String,
}

impl BlobTarget {
    /// Target for `archive` in `container`, named after the archive file
    pub fn for_archive(container: &str, archive: &Path) -> Result<Self> {
        if !is_valid_container_name(container) {
            return Err(PublishError::invalid_argument(
                PathBuf::from(container),
                "container names are 3-63 lowercase letters, digits or single hyphens",
            ));
        }
        let blob = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PublishError::invalid_argument(archive, "archive has no file name"))?;

        Ok(Self {
            container: container.to_string(),
            blob,
        })
    }
}

impl std::fmt::Display for BlobTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.blob)
    }
}

/// Blob storage operations used by the publisher
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Create `container` if it does not exist yet
    async fn ensure_container(&self, container: &str) -> Result<()>;

    async fn blob_exists(&self, target: &BlobTarget) -> Result<bool>;

    /// Upload `content` in full, returning the blob URI
    ///
    /// Without `overwrite`, an existing blob fails with `DestinationExists`.
    async fn upload_blob(&self, target: &BlobTarget, content: Vec<u8>, overwrite: bool)
    -> Result<String>;

    /// Public URI of the blob (no credentials)
    fn blob_uri(&self, target: &BlobTarget) -> String;
}

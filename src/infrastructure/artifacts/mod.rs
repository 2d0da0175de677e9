//! Artifact files on local disk

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::domain::{DomainError, GeneratedImage};

/// Writes generated images under a root directory with unique names
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if missing
    pub async fn ensure_root(&self) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            DomainError::artifact(format!(
                "Failed to create artifact directory {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// Persist an image, returning its path and size in bytes
    pub async fn write(&self, image: &GeneratedImage) -> Result<(PathBuf, u64), DomainError> {
        if image.is_empty() {
            return Err(DomainError::artifact("Refusing to write an empty artifact"));
        }

        self.ensure_root().await?;

        let path = self
            .root
            .join(format!("{}.{}", Uuid::new_v4(), image.extension()));

        tokio::fs::write(&path, &image.bytes).await.map_err(|e| {
            DomainError::artifact(format!("Failed to write {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), bytes = image.len(), "Artifact written");

        Ok((path, image.len() as u64))
    }

    /// Whether the artifact file is still present
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Delete an artifact; a file that is already gone is not an error
    pub async fn remove(&self, path: &Path) -> Result<bool, DomainError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::artifact(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

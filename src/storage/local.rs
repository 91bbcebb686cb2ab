use std::path::PathBuf;

use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: &str) -> Result<Self, DomainError> {
        let root = PathBuf::from(root);
        std::fs::create_dir_all(&root).map_err(|e| {
            DomainError::Internal(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        tracing::debug!(path = ?root, "Initialized local storage");
        Ok(Self { root })
    }

    pub(crate) async fn put_bytes(&self, path: &str, bytes: &[u8]) -> Result<(), DomainError> {
        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::Internal(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        tokio::fs::write(&dest, bytes).await.map_err(|e| {
            DomainError::Internal(format!("Failed to write blob {}: {}", dest.display(), e))
        })?;
        tracing::trace!("Blob written to {}", dest.display());
        Ok(())
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), DomainError> {
        let dest = self.root.join(path);
        if !dest.exists() {
            return Ok(());
        }
        tokio::fs::remove_file(&dest).await.map_err(|e| {
            DomainError::Internal(format!("Failed to delete blob {}: {}", dest.display(), e))
        })?;
        tracing::trace!("Blob deleted from {}", dest.display());
        Ok(())
    }
}

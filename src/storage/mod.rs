pub mod local;

use crate::domain::DomainError;
pub use local::LocalStorage;

/// Blob storage for generated images. Only a filesystem backend exists
/// today; cloud backends slot in as further variants.
#[derive(Clone)]
pub enum Storage {
    Local(LocalStorage),
}

impl Storage {
    pub fn local(root: &str) -> Result<Self, DomainError> {
        Ok(Storage::Local(LocalStorage::new(root)?))
    }

    pub async fn put_bytes(&self, path: &str, bytes: &[u8]) -> Result<(), DomainError> {
        match self {
            Storage::Local(backend) => backend.put_bytes(path, bytes).await,
        }
    }

    pub async fn delete(&self, path: &str) -> Result<(), DomainError> {
        match self {
            Storage::Local(backend) => backend.delete(path).await,
        }
    }

    /// Public URL a stored blob is served under.
    pub fn url(&self, path: &str) -> String {
        match self {
            Storage::Local(_) => format!("/media/{}", path),
        }
    }
}

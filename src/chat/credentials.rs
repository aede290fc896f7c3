//! Messaging credential persistence.
//!
//! The blob handed over by the messaging transport is stored as-is; the
//! bridge never looks inside it.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{Error, Result};

/// File name of the stored credentials inside the auth directory.
pub const CREDENTIALS_FILE: &str = "creds.bin";

/// Stores the messaging session's credential blob on disk.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store keeping its file in `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIALS_FILE),
        }
    }

    /// Returns the credentials file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored credentials, or `None` if nothing was saved yet.
    pub async fn load(&self) -> Result<Option<Bytes>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Replaces the stored credentials.
    pub async fn save(&self, blob: &[u8]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, blob).await?;
        tracing::debug!("saved {} bytes of credentials to {}", blob.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rover-relay-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn test_load_missing_credentials() {
        let store = CredentialStore::new(scratch_dir("missing"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = scratch_dir("roundtrip");
        let store = CredentialStore::new(&dir);

        store.save(b"first").await.unwrap();
        store.save(b"\x00opaque\xff").await.unwrap();
        assert_eq!(
            store.load().await.unwrap(),
            Some(Bytes::from_static(b"\x00opaque\xff"))
        );
        assert!(store.path().ends_with(CREDENTIALS_FILE));

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }
}

//! Secure Credential Storage backed by a local file
//!
//! The photo manager keeps its session tokens in a single JSON file under
//! the application data directory, so a rerun can pick up the previous
//! authorization without going through the browser flow again. Values are
//! base64-encoded; the file is created with default permissions and holds
//! nothing but the token material.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File-backed secure storage implementation
///
/// Stores secrets as a `key -> base64(value)` map serialized to JSON.
/// Writes go through a mutex so concurrent calls within one process never
/// interleave a read-modify-write cycle.
pub struct FileSecureStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecureStore {
    /// Create a store persisting to the given file path
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Create a store persisting to `<data_dir>/credentials.json`
    pub fn in_data_dir(data_dir: &std::path::Path) -> Self {
        Self::new(data_dir.join("credentials.json"))
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| {
                warn!(path = ?self.path, error = %e, "Credential file is corrupted");
                BridgeError::OperationFailed(format!("Corrupted credential file: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(BridgeError::Io)?;
        }
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| BridgeError::OperationFailed(format!("Serialization failed: {}", e)))?;
        fs::write(&self.path, json).await.map_err(BridgeError::Io)?;
        Ok(())
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await.unwrap_or_default();
        entries.insert(key.to_string(), BASE64.encode(value));
        self.save(&entries).await?;

        debug!(key = key, "Stored secret");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.lock().await;

        let entries = self.load().await?;
        match entries.get(key) {
            Some(encoded) => {
                let decoded = BASE64.decode(encoded).map_err(|e| {
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })?;
                debug!(key = key, "Retrieved secret");
                Ok(Some(decoded))
            }
            None => {
                debug!(key = key, "Secret not found");
                Ok(None)
            }
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await.unwrap_or_default();
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
            debug!(key = key, "Deleted secret");
        } else {
            debug!(key = key, "Secret not found (already deleted)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSecureStore::in_data_dir(tmp.path());

        store.set_secret("token", b"secret-value").await.unwrap();

        let value = store.get_secret("token").await.unwrap();
        assert_eq!(value, Some(b"secret-value".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSecureStore::in_data_dir(tmp.path());

        assert_eq!(store.get_secret("absent").await.unwrap(), None);
        assert!(!store.has_secret("absent").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSecureStore::in_data_dir(tmp.path());

        store.set_secret("token", b"first").await.unwrap();
        store.set_secret("token", b"second").await.unwrap();

        let value = store.get_secret("token").await.unwrap();
        assert_eq!(value, Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSecureStore::in_data_dir(tmp.path());

        store.set_secret("token", b"value").await.unwrap();
        store.delete_secret("token").await.unwrap();
        store.delete_secret("token").await.unwrap();

        assert_eq!(store.get_secret("token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = FileSecureStore::in_data_dir(tmp.path());
            store.set_secret("token", b"persisted").await.unwrap();
        }

        let reopened = FileSecureStore::in_data_dir(tmp.path());
        let value = reopened.get_secret("token").await.unwrap();
        assert_eq!(value, Some(b"persisted".to_vec()));
    }
}

//! Durable storage for the session record.
//!
//! Every backend stores exactly one entry, the [`Session`] under
//! [`STORAGE_KEY`]. Removing the session deletes the entry; it is never
//! overwritten with an empty record.

use std::collections::{BTreeMap, HashMap};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use keyring::Entry;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::session::{Session, STORAGE_KEY};

/// Keychain service name for the keyring backend.
const SERVICE_NAME: &str = "reposearch";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the stored session, `None` when no entry exists.
    async fn load(&self) -> Result<Option<Session>, StoreError>;

    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Delete the entry. Deleting an absent entry succeeds.
    async fn remove(&self) -> Result<(), StoreError>;
}

// ============================================================================
// File backend
// ============================================================================

/// JSON key-value file, one top-level key per stored item.
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: tokio::sync::Mutex<()>,
}

type StorageMap = BTreeMap<String, serde_json::Value>;

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_map(&self) -> Result<StorageMap, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(StorageMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StorageMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `read_map`, but a file that no longer parses is treated as empty
    /// so writes replace it instead of failing forever. The flag is set when
    /// the file was discarded.
    async fn read_map_for_write(&self) -> Result<(StorageMap, bool), StoreError> {
        match self.read_map().await {
            Ok(map) => Ok((map, false)),
            Err(StoreError::Serde(e)) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable credential file");
                Ok((StorageMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn write_map(&self, map: &StorageMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // The file holds a token; keep it readable by the owner only.
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&tmp).await?;
        #[cfg(unix)]
        file.set_permissions(std::fs::Permissions::from_mode(0o600)).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        match map.remove(STORAGE_KEY) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut map, _) = self.read_map_for_write().await?;
        map.insert(STORAGE_KEY.to_string(), serde_json::to_value(session)?);
        self.write_map(&map).await?;
        debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    async fn remove(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut map, discarded) = self.read_map_for_write().await?;
        if map.remove(STORAGE_KEY).is_some() || discarded {
            self.write_map(&map).await?;
            debug!(path = %self.path.display(), "Removed session");
        }
        Ok(())
    }
}

// ============================================================================
// Keyring backend
// ============================================================================

/// Session record kept in the OS keychain as a JSON string.
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    fn entry() -> Result<Entry, StoreError> {
        Ok(Entry::new(SERVICE_NAME, STORAGE_KEY)?)
    }

    async fn blocking<T, F>(f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        Self::blocking(|| match Self::entry()?.get_password() {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let json = serde_json::to_string(session)?;
        Self::blocking(move || {
            Self::entry()?.set_password(&json)?;
            Ok(())
        })
        .await
    }

    async fn remove(&self) -> Result<(), StoreError> {
        Self::blocking(|| match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local store, used for `--ephemeral` runs and tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON stored under `key`, for inspecting exactly what was persisted.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Seed a raw record, bypassing `Session` construction.
    pub fn insert_raw(&self, key: &str, json: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), json.to_string());
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        match self.raw(STORAGE_KEY) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let json = serde_json::to_string(session)?;
        self.insert_raw(STORAGE_KEY, &json);
        Ok(())
    }

    async fn remove(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(STORAGE_KEY);
        Ok(())
    }
}

//! Pluggable key/value backings for the session store.
//!
//! Two backends ship with the crate:
//! - [`MemoryBackend`]: in-memory map for tests and ephemeral sessions
//! - [`SledBackend`]: persistent key/value store for a durable session
//!
//! Both hold JSON strings; the typed view lives in [`super::SessionStore`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use super::StoreError;

/// Trait for pluggable session-store backings.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks. Each operation is atomic at the single-key level;
/// read-modify-write cycles are serialized by the store above.
pub trait StoreBackend: Send + Sync {
    /// Read the raw JSON value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write the raw JSON value under `key`, replacing any prior value.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// In-memory backing for tests and ephemeral sessions.
///
/// Thread-safe via `RwLock`. Not durable: data is lost when the process
/// exits.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Persistent key/value backing over sled.
///
/// Durability note: sled flushes in the background, so on a crash the last
/// few writes may be lost. Acceptable here since the session can always be
/// reseeded.
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    /// Open or create the session database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { db })
    }
}

impl StoreBackend for SledBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .db
            .get(key.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match value {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sled"
    }
}

//! Persistent device-scoped key-value storage
//!
//! The device identifier that correlates analytics sessions from the same
//! machine lives here. The production store is a single JSON object file in
//! the XDG data directory; an in-memory store backs tests and embedders
//! without a persistent profile.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};

/// Storage key under which the device identifier is persisted.
pub const DEVICE_ID_KEY: &str = "user_tracking_id";

/// Device-scoped persistent key-value storage.
///
/// Values survive process restarts. Reads are expected to be cheap; the
/// session initializer consults the store on every call.
pub trait DeviceStore {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed store: one JSON object per device profile.
///
/// The file and its parent directories are created on first write. A file
/// that cannot be parsed is reported as a storage error rather than being
/// silently replaced.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("corrupt store file {:?}: {}", self.path, e)))
    }
}

impl DeviceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut map = self.read_map()?;
        Ok(map.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&map)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-memory store for tests and embedders without a persistent profile
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Return the persisted device identifier, creating one when absent.
///
/// An identifier already in the store is reused verbatim; this function
/// never overwrites an existing value. When absent, a UUID v4 is generated
/// and persisted before being returned, so the identifier survives even if
/// the rest of session setup fails afterwards.
pub fn load_or_create_device_id(store: &dyn DeviceStore) -> Result<String> {
    if let Some(existing) = store.get(DEVICE_ID_KEY)? {
        return Ok(existing);
    }

    let id = uuid::Uuid::new_v4().to_string();
    store.set(DEVICE_ID_KEY, &id)?;
    Ok(id)
}

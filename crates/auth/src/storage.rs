//! Durable key/value storage backing the session.
//!
//! The session layer only ever talks to [`SessionStorage`]; which
//! implementation is plugged in depends on where the client runs:
//!
//! - browser (`wasm32`): [`LocalStorage`] over `window.localStorage`
//! - native with a state file: [`FileStorage`]
//! - no durable storage available: [`NoopStorage`] (session is memory-only)
//!
//! [`MemoryStorage`] keeps values in-process and is what tests use to observe
//! write-through.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use thiserror::Error;

/// Storage key for the raw bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the token scheme (e.g. `Bearer`).
pub const TOKEN_TYPE_KEY: &str = "token_type";
/// Storage key for the JSON-encoded role id array.
pub const USER_ROLES_KEY: &str = "user_roles";
/// Storage key for the decimal user id.
pub const USER_ID_KEY: &str = "user_id";

/// Every key the session owns, in the order they are cleared.
pub const SESSION_KEYS: [&str; 4] = [ACCESS_TOKEN_KEY, TOKEN_TYPE_KEY, USER_ROLES_KEY, USER_ID_KEY];

#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage failed due to internal lock poisoning.
    #[error("storage lock poisoned")]
    Poisoned,

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// String-keyed, string-valued durable storage.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage for execution contexts without durable storage.
///
/// Reads always miss and writes are dropped, so session state lives only in
/// memory and does not survive a restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStorage;

impl SessionStorage for NoopStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// In-process map storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file storage for native clients.
///
/// The whole map is loaded once on open and rewritten on every mutation, so
/// the file always matches what readers see.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// A missing file is an empty store; the parent directory is created on
    /// first write.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read session file at {:?}", path))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .with_context(|| format!("session file at {:?} is not a JSON object of strings", path))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create session directory at {:?}", parent))?;
            }
        }

        let data = serde_json::to_string_pretty(entries).context("failed to encode session file")?;

        // Sibling file, then rename over the original.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data).with_context(|| format!("failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace session file at {:?}", self.path))?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use self::browser::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{SessionStorage, StorageError};

    /// `window.localStorage`, scoped to the page origin.
    ///
    /// The handle is looked up on every call; browser JS values are not
    /// `Send`, and lookups are cheap.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorage;

    impl LocalStorage {
        /// `Some` only when the page exposes `localStorage`.
        pub fn detect() -> Option<Self> {
            storage().ok().map(|_| Self)
        }
    }

    fn storage() -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Unavailable("no window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
    }

    impl SessionStorage for LocalStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            storage()?
                .get_item(key)
                .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            storage()?
                .set_item(key, value)
                .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            storage()?
                .remove_item(key)
                .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
        }
    }
}

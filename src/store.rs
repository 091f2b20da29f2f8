//! Durable storage collaborators.
//!
//! The delivery pipeline mirrors its pending-event queue through the
//! [`KeyValueStore`] trait so the durability primitive stays swappable.
//! [`FileStore`] is the default implementation (one JSON file per key under
//! the data directory); [`MemoryStore`] backs tests and hosts that opt out of
//! durability.
//!
//! The `identify` feature adds [`CredentialStore`] for the persisted user
//! identity token, which needs protection at rest and therefore lives apart
//! from the plain queue mirror.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Durable key-value storage for the pending-event mirror.
pub trait KeyValueStore: Send + Sync {
    /// Load the bytes stored under `key`, if any.
    fn load(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Remove the value stored under `key`. Removing a missing key is not an
    /// error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Access-controlled storage for the opt-in user identity token.
#[cfg(feature = "identify")]
pub trait CredentialStore: Send + Sync {
    /// Load the token stored under `key`, if any.
    fn load_token(&self, key: &str) -> Option<String>;

    /// Store `token` under `key`, replacing any previous token.
    fn store_token(&self, key: &str, token: &str) -> Result<(), StoreError>;

    /// Delete the token stored under `key`. Deleting a missing token is not
    /// an error.
    fn delete_token(&self, key: &str) -> Result<(), StoreError>;
}

/// Storage errors.
#[derive(Debug)]
pub enum StoreError {
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store IO error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// File-backed store keeping one JSON file per key.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the default SDK data directory.
    pub fn default_location() -> Self {
        Self::new(default_data_dir())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

/// Default SDK data directory.
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("respectlytics")
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path_for(key)).ok()
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::write(self.path_for(key), value).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

/// File-backed credential store with owner-only permissions.
#[cfg(feature = "identify")]
pub struct FileCredentialStore {
    root: PathBuf,
}

#[cfg(feature = "identify")]
impl FileCredentialStore {
    /// Create a credential store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.token"))
    }
}

#[cfg(feature = "identify")]
impl CredentialStore for FileCredentialStore {
    fn load_token(&self, key: &str) -> Option<String> {
        let token = std::fs::read_to_string(self.path_for(key)).ok()?;
        let token = token.trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    fn store_token(&self, key: &str, token: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::Io(e.to_string()))?;
        let path = self.path_for(key);
        std::fs::write(&path, token).map_err(|e| StoreError::Io(e.to_string()))?;

        // Owner-only access for the identity token.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        Ok(())
    }

    fn delete_token(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

/// In-memory store for tests and durability-free hosts.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .expect("memory store lock poisoned")
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("memory store lock poisoned")
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("memory store lock poisoned")
            .remove(key);
        Ok(())
    }
}

#[cfg(feature = "identify")]
impl CredentialStore for MemoryStore {
    fn load_token(&self, key: &str) -> Option<String> {
        self.load(key)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    fn store_token(&self, key: &str, token: &str) -> Result<(), StoreError> {
        self.save(key, token.as_bytes())
    }

    fn delete_token(&self, key: &str) -> Result<(), StoreError> {
        self.remove(key)
    }
}

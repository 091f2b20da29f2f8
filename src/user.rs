//! Opt-in persisted user identity (legacy wire schema).
//!
//! The user id is absent until the host application explicitly calls
//! `identify()`. Once generated it is persisted in the credential store and
//! survives process restarts until an explicit `reset()`. Both operations are
//! safe to repeat.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::session::generate_token;
use crate::store::CredentialStore;

/// Store key for the persisted user identity token.
pub(crate) const USER_ID_KEY: &str = "user_id";

/// Manages the opt-in user identity token.
pub struct UserManager {
    store: Arc<dyn CredentialStore>,
    user_id: Mutex<Option<String>>,
}

impl UserManager {
    /// Create a manager, adopting any previously persisted identity.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let user_id = store.load_token(USER_ID_KEY);
        Self {
            store,
            user_id: Mutex::new(user_id),
        }
    }

    /// Adopt the persisted identity, generating and persisting a fresh token
    /// if none exists yet.
    pub fn identify(&self) {
        let mut user_id = self.user_id.lock().expect("user id lock poisoned");

        if let Some(stored) = self.store.load_token(USER_ID_KEY) {
            *user_id = Some(stored);
            return;
        }

        let token = generate_token();
        if let Err(e) = self.store.store_token(USER_ID_KEY, &token) {
            warn!(error = %e, "failed to persist user id, identity is process-local");
        }
        debug!("generated new user id");
        *user_id = Some(token);
    }

    /// Delete the persisted identity and return to anonymous.
    pub fn reset(&self) {
        let mut user_id = self.user_id.lock().expect("user id lock poisoned");

        if let Err(e) = self.store.delete_token(USER_ID_KEY) {
            warn!(error = %e, "failed to delete persisted user id");
        }
        *user_id = None;
    }

    /// The current user id, or `None` while anonymous.
    pub fn user_id(&self) -> Option<String> {
        self.user_id.lock().expect("user id lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_anonymous_until_identify() {
        let manager = UserManager::new(Arc::new(MemoryStore::new()));
        assert!(manager.user_id().is_none());
    }

    #[test]
    fn test_identify_generates_hex_token() {
        let manager = UserManager::new(Arc::new(MemoryStore::new()));
        manager.identify();

        let id = manager.user_id().unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_identify_is_idempotent() {
        let manager = UserManager::new(Arc::new(MemoryStore::new()));
        manager.identify();
        let first = manager.user_id().unwrap();
        manager.identify();
        assert_eq!(manager.user_id().unwrap(), first);
    }

    #[test]
    fn test_identity_survives_restart() {
        let store = Arc::new(MemoryStore::new());

        let manager = UserManager::new(store.clone());
        manager.identify();
        let id = manager.user_id().unwrap();
        drop(manager);

        let restarted = UserManager::new(store);
        assert_eq!(restarted.user_id().unwrap(), id);
    }

    #[test]
    fn test_reset_clears_identity() {
        let store = Arc::new(MemoryStore::new());

        let manager = UserManager::new(store.clone());
        manager.identify();
        let first = manager.user_id().unwrap();

        manager.reset();
        assert!(manager.user_id().is_none());
        assert!(store.load_token(USER_ID_KEY).is_none());

        // Identifying again starts a brand new identity.
        manager.identify();
        assert_ne!(manager.user_id().unwrap(), first);
    }
}

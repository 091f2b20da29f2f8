//! Session id generation and automatic rotation.
//!
//! Session ids are:
//! - Generated fresh at SDK construction (RAM-only, never persisted)
//! - Rotated lazily after the rotation window elapses (default 2 hours)
//! - 32 lowercase hexadecimal characters (UUID v4 without dashes)
//!
//! Rotation happens as a side effect of reading the session id after expiry;
//! there is no background timer. Keeping session ids out of durable storage
//! means no cross-session tracking and no consent-requiring device storage.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

/// Default rotation window: 2 hours.
pub const SESSION_ROTATION_WINDOW: Duration = Duration::from_secs(7200);

/// Manages the current session id and its rotation window.
pub struct SessionManager {
    state: Mutex<SessionState>,
    rotation_window: Duration,
}

struct SessionState {
    session_id: String,
    started_at: Instant,
}

impl SessionState {
    fn fresh() -> Self {
        Self {
            session_id: generate_token(),
            started_at: Instant::now(),
        }
    }
}

impl SessionManager {
    /// Create a manager with the default 2-hour rotation window.
    pub fn new() -> Self {
        Self::with_rotation_window(SESSION_ROTATION_WINDOW)
    }

    /// Create a manager with a custom rotation window.
    pub fn with_rotation_window(rotation_window: Duration) -> Self {
        Self {
            state: Mutex::new(SessionState::fresh()),
            rotation_window,
        }
    }

    /// Get the current session id, rotating first if the window has elapsed.
    pub fn session_id(&self) -> String {
        let mut state = self.state.lock().expect("session state lock poisoned");

        if state.started_at.elapsed() > self.rotation_window {
            debug!("session rotation window elapsed, generating new session id");
            *state = SessionState::fresh();
        }

        state.session_id.clone()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a 32-character lowercase hex token.
pub(crate) fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex_token(token: &str) -> bool {
        token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    #[test]
    fn test_session_id_format() {
        let manager = SessionManager::new();
        let id = manager.session_id();
        assert!(is_hex_token(&id), "unexpected session id: {id}");
    }

    #[test]
    fn test_session_id_stable_within_window() {
        let manager = SessionManager::new();
        let first = manager.session_id();
        let second = manager.session_id();
        assert_eq!(first, second);
    }

    #[test]
    fn test_session_id_rotates_after_window() {
        let manager = SessionManager::with_rotation_window(Duration::from_millis(20));
        let before = manager.session_id();
        std::thread::sleep(Duration::from_millis(40));
        let after = manager.session_id();
        assert_ne!(before, after);
        assert!(is_hex_token(&after));
    }

    #[test]
    fn test_rotation_is_lazy() {
        let manager = SessionManager::with_rotation_window(Duration::from_millis(20));
        let before = manager.session_id();
        std::thread::sleep(Duration::from_millis(40));
        // Two reads after expiry: the first rotates, the second sees the new id.
        let first_read = manager.session_id();
        let second_read = manager.session_id();
        assert_ne!(before, first_read);
        assert_eq!(first_read, second_read);
    }
}

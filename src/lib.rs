//! Respectlytics - Privacy-first, session-based analytics for Rust.
//!
//! This library buffers application events durably, enriches them with an
//! ephemeral session identity, and delivers them to the Respectlytics
//! collector over HTTP without ever blocking the caller. It tolerates
//! connectivity loss, process restarts, rate limiting, and transient server
//! failures.
//!
//! # Privacy Guarantees
//!
//! - **RAM-only sessions**: Session ids are never written to disk and rotate
//!   automatically after 2 hours
//! - **No cross-session tracking**: Each session is independent and anonymous
//! - **Fixed payload allowlist**: Only the versioned field set is ever
//!   transmitted; the default build cannot serialize a user id or custom
//!   properties at all
//!
//! # Architecture
//!
//! ```text
//! track() ──▶ worker task ──▶ EventQueue ──▶ NetworkClient ──▶ collector
//!             (serial FIFO)   (durable          (retry +
//!                              mirror)           backoff)
//!                  ▲                │ on failure
//!   FlushScheduler ┘                ▼
//!   (timer, connectivity,     batch restored to
//!    backgrounding)           the queue head
//! ```
//!
//! # Example
//!
//! ```no_run
//! use respectlytics::{Config, Respectlytics};
//!
//! # async fn run() {
//! // 1. Configure at app launch
//! let client = Respectlytics::new(Config::new("your-api-key")).unwrap();
//!
//! // 2. Track events
//! client.track("purchase");
//! client.track_on_screen("view_product", "ProductDetail");
//!
//! // 3. Flush pending events on exit
//! client.shutdown().await;
//! # }
//! ```

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod event;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(feature = "identify")]
pub mod user;

// Re-export key types at crate root for convenience
pub use client::Respectlytics;
pub use config::{Config, ConfigError};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot, SharedDiagnostics};
pub use event::{Event, EventMetadata, MAX_EVENT_NAME_LEN};
pub use queue::EventQueue;
pub use scheduler::FlushScheduler;
pub use session::{SessionManager, SESSION_ROTATION_WINDOW};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use transport::{NetworkClient, NetworkError, SendFailure, Transport};

// Identify re-exports (when enabled)
#[cfg(feature = "identify")]
pub use store::{CredentialStore, FileCredentialStore};
#[cfg(feature = "identify")]
pub use user::UserManager;

// Properties re-exports (when enabled)
#[cfg(feature = "properties")]
pub use event::PropertyValue;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Client entry point.
//!
//! [`Respectlytics`] is an explicit, constructed SDK instance: hosts create
//! one at startup, share it by reference (or clone the `Arc` they wrap it
//! in), and call [`shutdown`](Respectlytics::shutdown) on exit. There is no
//! global singleton.
//!
//! Every public call is fire-and-forget: it posts a command onto an
//! unbounded channel consumed in FIFO order by a single worker task, so
//! caller threads never block on SDK internals and never see delivery
//! errors. Failures are visible through `tracing` output and
//! [`diagnostics`](Respectlytics::diagnostics) only.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError};
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot, SharedDiagnostics};
use crate::event::{Event, EventMetadata, MAX_EVENT_NAME_LEN};
use crate::queue::EventQueue;
use crate::scheduler::FlushScheduler;
use crate::session::SessionManager;
use crate::store::{default_data_dir, FileStore, KeyValueStore};
use crate::transport::{NetworkClient, Transport};

#[cfg(feature = "identify")]
use crate::store::{CredentialStore, FileCredentialStore};
#[cfg(feature = "identify")]
use crate::user::UserManager;

#[cfg(feature = "properties")]
use crate::event::PropertyValue;
#[cfg(feature = "properties")]
use std::collections::BTreeMap;

/// Commands processed by the worker task, in submission order.
enum Command {
    Track {
        name: String,
        screen: Option<String>,
    },
    #[cfg(feature = "properties")]
    TrackWithProperties {
        name: String,
        screen: Option<String>,
        properties: BTreeMap<String, PropertyValue>,
    },
    Flush,
    SetOnline(bool),
    AppBackgrounded,
    #[cfg(feature = "identify")]
    Identify,
    #[cfg(feature = "identify")]
    Reset,
    Shutdown,
}

/// A configured Respectlytics SDK instance.
///
/// Dropping the instance stops the flush timer and ends the worker task;
/// in-flight deliveries complete independently and re-persist on failure.
/// Prefer [`shutdown`](Respectlytics::shutdown) for an orderly exit that
/// attempts a final flush first.
pub struct Respectlytics {
    tx: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
    scheduler: FlushScheduler,
    queue: EventQueue,
    diagnostics: SharedDiagnostics,
}

impl Respectlytics {
    /// Create a client with durable storage at the default (or configured)
    /// data directory. Must be called inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let root = config
            .data_path
            .clone()
            .unwrap_or_else(default_data_dir);
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(root.clone()));

        #[cfg(feature = "identify")]
        {
            let credentials: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::new(root));
            Self::with_stores(config, store, credentials)
        }
        #[cfg(not(feature = "identify"))]
        {
            Self::with_store(config, store)
        }
    }

    /// Create a client over a custom durable store.
    #[cfg(not(feature = "identify"))]
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self, ConfigError> {
        Self::build(config, store)
    }

    /// Create a client over custom durable and credential stores.
    #[cfg(feature = "identify")]
    pub fn with_stores(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ConfigError> {
        Self::build(config, store, credentials)
    }

    fn build(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        #[cfg(feature = "identify")] credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let diagnostics: SharedDiagnostics = Arc::new(Diagnostics::default());
        let transport: Arc<dyn Transport> =
            Arc::new(NetworkClient::new(&config, diagnostics.clone()));
        let queue = EventQueue::new(
            transport,
            store,
            diagnostics.clone(),
            config.max_queue_size,
        );

        let worker = Worker {
            queue: queue.clone(),
            sessions: SessionManager::with_rotation_window(config.session_rotation_window),
            #[cfg(feature = "identify")]
            users: UserManager::new(credentials),
            metadata: config.metadata.clone(),
            diagnostics: diagnostics.clone(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker.run(rx));
        let scheduler = FlushScheduler::start(queue.clone(), config.flush_interval);

        info!("Respectlytics SDK configured (session-based analytics)");

        Ok(Self {
            tx,
            worker,
            scheduler,
            queue,
            diagnostics,
        })
    }

    /// Track an event.
    ///
    /// Privacy-safe metadata (timestamp, session id, platform, OS version,
    /// app version, locale) is attached automatically.
    pub fn track(&self, name: impl Into<String>) {
        self.send(Command::Track {
            name: name.into(),
            screen: None,
        });
    }

    /// Track an event with the screen it occurred on.
    pub fn track_on_screen(&self, name: impl Into<String>, screen: impl Into<String>) {
        self.send(Command::Track {
            name: name.into(),
            screen: Some(screen.into()),
        });
    }

    /// Track an event with caller-supplied properties (legacy wire schema).
    #[cfg(feature = "properties")]
    pub fn track_with_properties(
        &self,
        name: impl Into<String>,
        properties: BTreeMap<String, PropertyValue>,
    ) {
        self.send(Command::TrackWithProperties {
            name: name.into(),
            screen: None,
            properties,
        });
    }

    /// Force send all queued events now.
    ///
    /// Rarely needed: the SDK flushes automatically every 30 seconds and
    /// whenever the queue reaches 10 events.
    pub fn flush(&self) {
        self.send(Command::Flush);
    }

    /// Report a connectivity change. Regaining connectivity triggers a flush.
    pub fn set_online(&self, online: bool) {
        self.send(Command::SetOnline(online));
    }

    /// Report that the application is moving to the background; queued
    /// events get a best-effort flush before suspension.
    pub fn app_backgrounded(&self) {
        self.send(Command::AppBackgrounded);
    }

    /// Adopt (or create and persist) the opt-in user identity.
    #[cfg(feature = "identify")]
    pub fn identify(&self) {
        self.send(Command::Identify);
    }

    /// Delete the persisted user identity and return to anonymous.
    #[cfg(feature = "identify")]
    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Number of events currently buffered.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Snapshot of the pipeline diagnostics counters.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Stop the flush timer, attempt a final flush, and wait for the worker
    /// to drain its command backlog.
    pub async fn shutdown(self) {
        self.scheduler.stop();
        let _ = self.tx.send(Command::Shutdown);
        let _ = self.worker.await;
    }

    fn send(&self, command: Command) {
        // Fails only after shutdown; nothing useful to do with the error.
        let _ = self.tx.send(command);
    }
}

/// The single serial execution context of the SDK.
struct Worker {
    queue: EventQueue,
    sessions: SessionManager,
    #[cfg(feature = "identify")]
    users: UserManager,
    metadata: EventMetadata,
    diagnostics: SharedDiagnostics,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Track { name, screen } => {
                    if let Some(event) = self.build_event(name, screen) {
                        self.enqueue(event);
                    }
                }
                #[cfg(feature = "properties")]
                Command::TrackWithProperties {
                    name,
                    screen,
                    properties,
                } => {
                    if let Some(event) = self.build_event(name, screen) {
                        let event = Event {
                            properties: Some(properties),
                            ..event
                        };
                        self.enqueue(event);
                    }
                }
                Command::Flush => self.queue.flush(),
                Command::SetOnline(online) => self.queue.set_online(online),
                Command::AppBackgrounded => {
                    debug!("application backgrounded, flushing queued events");
                    self.queue.flush();
                }
                #[cfg(feature = "identify")]
                Command::Identify => self.users.identify(),
                #[cfg(feature = "identify")]
                Command::Reset => self.users.reset(),
                Command::Shutdown => {
                    self.queue.flush();
                    break;
                }
            }
        }
    }

    /// Validate the name and stamp identity. Invalid events are dropped with
    /// a warning, never an error.
    fn build_event(&self, name: String, screen: Option<String>) -> Option<Event> {
        if name.is_empty() {
            warn!("event name cannot be empty");
            self.diagnostics.record_dropped();
            return None;
        }
        if name.chars().count() > MAX_EVENT_NAME_LEN {
            warn!(max = MAX_EVENT_NAME_LEN, "event name too long, dropping event");
            self.diagnostics.record_dropped();
            return None;
        }

        let event = Event::new(name, self.sessions.session_id(), screen, self.metadata.clone());

        #[cfg(feature = "identify")]
        let event = Event {
            user_id: self.users.user_id(),
            ..event
        };

        Some(event)
    }

    fn enqueue(&self, event: Event) {
        self.diagnostics.record_tracked();
        self.queue.enqueue(event);
    }
}

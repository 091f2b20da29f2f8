//! Durable event queue with automatic flushing.
//!
//! The queue owns the only fully shared mutable state in the SDK: the
//! in-memory pending sequence plus its durable mirror. Every mutation
//! (append, drain, head-restore) happens under one lock, and the mirror is
//! rewritten inside the same critical section so a crash can never observe
//! an appended-but-unpersisted event.
//!
//! A flush drains the whole sequence as a batch and hands it to the
//! transport on a detached task; new events accumulate into the fresh empty
//! sequence meanwhile. A failed batch returns to the front of the queue,
//! ahead of anything enqueued during the flight, preserving FIFO order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::diagnostics::SharedDiagnostics;
use crate::event::Event;
use crate::store::KeyValueStore;
use crate::transport::Transport;

/// Store key for the durable mirror of the pending sequence.
pub(crate) const QUEUE_STORE_KEY: &str = "event_queue";

/// Durable, concurrency-safe queue of pending events.
///
/// Cheap to clone; clones share the same underlying queue.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    pending: Mutex<Vec<Event>>,
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    diagnostics: SharedDiagnostics,
    online: AtomicBool,
    max_queue_size: usize,
}

impl EventQueue {
    /// Create a queue, restoring any events persisted by a previous process.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        diagnostics: SharedDiagnostics,
        max_queue_size: usize,
    ) -> Self {
        let pending = load_persisted(store.as_ref());
        if !pending.is_empty() {
            info!(count = pending.len(), "restored undelivered events from durable storage");
        }

        Self {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(pending),
                store,
                transport,
                diagnostics,
                online: AtomicBool::new(true),
                max_queue_size,
            }),
        }
    }

    /// Append an event and persist the queue. Triggers an asynchronous flush
    /// when the size threshold is reached. Never blocks and never fails from
    /// the caller's point of view.
    pub fn enqueue(&self, event: Event) {
        let should_flush = {
            let mut pending = self.inner.lock_pending();
            pending.push(event);
            self.inner.persist(&pending);
            pending.len() >= self.inner.max_queue_size
        };

        if should_flush {
            debug!(threshold = self.inner.max_queue_size, "queue reached size threshold");
            self.flush();
        }
    }

    /// Drain all pending events and hand them to the transport on a detached
    /// task. No-op while the queue is empty or the network is offline.
    pub fn flush(&self) {
        let batch = {
            let mut pending = self.inner.lock_pending();
            if pending.is_empty() || !self.inner.online.load(Ordering::SeqCst) {
                return;
            }
            let batch = std::mem::take(&mut *pending);
            self.inner.persist(&pending);
            batch
        };

        self.inner.diagnostics.record_flush();
        debug!(count = batch.len(), "flushing batch");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(failure) = inner.transport.send_batch(batch).await {
                warn!(
                    error = %failure.error,
                    unsent = failure.unsent.len(),
                    "failed to send events, keeping them for a later flush"
                );
                inner.diagnostics.record_delivery_failure();
                inner.restore(failure.unsent);
            }
        });
    }

    /// Record connectivity; an offline-to-online transition triggers a flush.
    pub fn set_online(&self, online: bool) {
        let was_online = self.inner.online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            debug!("connectivity regained, flushing");
            self.flush();
        }
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.inner.lock_pending().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn pending_events(&self) -> Vec<Event> {
        self.inner.lock_pending().clone()
    }
}

impl QueueInner {
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.pending.lock().expect("pending queue lock poisoned")
    }

    /// Rewrite the durable mirror. Failure is logged and counted but never
    /// surfaced: the in-memory sequence stays authoritative for this process.
    fn persist(&self, pending: &[Event]) {
        let bytes = match serde_json::to_vec(pending) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to serialize pending queue");
                self.diagnostics.record_persistence_failure();
                return;
            }
        };

        if let Err(e) = self.store.save(QUEUE_STORE_KEY, &bytes) {
            warn!(error = %e, "failed to persist pending queue");
            self.diagnostics.record_persistence_failure();
        }
    }

    /// Put a failed batch back at the head of the queue, ahead of anything
    /// enqueued while the batch was in flight.
    fn restore(&self, unsent: Vec<Event>) {
        let mut pending = self.lock_pending();
        let mut restored = unsent;
        restored.append(&mut pending);
        *pending = restored;
        self.persist(&pending);
    }
}

fn load_persisted(store: &dyn KeyValueStore) -> Vec<Event> {
    let Some(bytes) = store.load(QUEUE_STORE_KEY) else {
        return Vec::new();
    };

    match serde_json::from_slice(&bytes) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "discarding unreadable persisted queue");
            Vec::new()
        }
    }
}

//! Internal delivery diagnostics.
//!
//! `track` and `flush` are fire-and-forget, so failures never reach the
//! caller as errors. These counters (plus `tracing` output) are the only
//! window into what the pipeline has been doing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Counters for the event delivery pipeline.
#[derive(Debug, Default)]
pub struct Diagnostics {
    events_tracked: AtomicU64,
    events_sent: AtomicU64,
    events_dropped: AtomicU64,
    flushes: AtomicU64,
    delivery_failures: AtomicU64,
    persistence_failures: AtomicU64,
}

impl Diagnostics {
    pub(crate) fn record_tracked(&self) {
        self.events_tracked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.events_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            events_tracked: self.events_tracked.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSnapshot {
    /// Events accepted at the track boundary
    pub events_tracked: u64,
    /// Events acknowledged by the collector
    pub events_sent: u64,
    /// Events discarded (invalid name, or rejected as malformed by the collector)
    pub events_dropped: u64,
    /// Flushes that actually took a batch
    pub flushes: u64,
    /// Batches that came back after exhausting retries
    pub delivery_failures: u64,
    /// Durable-mirror writes that failed
    pub persistence_failures: u64,
}

/// Shared handle to the pipeline diagnostics.
pub type SharedDiagnostics = Arc<Diagnostics>;

//! Periodic flush timer.
//!
//! One detached tokio task ticking at the configured interval (default 30
//! seconds) and firing a fire-and-forget flush on each tick. The other flush
//! triggers (size threshold, connectivity, app lifecycle) live on the queue
//! and client; this task only owns the clock.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::queue::EventQueue;

/// Handle to the periodic flush task. Aborts the task on drop.
pub struct FlushScheduler {
    handle: JoinHandle<()>,
}

impl FlushScheduler {
    /// Start flushing `queue` every `interval`. Must be called inside a tokio
    /// runtime.
    pub fn start(queue: EventQueue, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so the first
            // flush happens one full interval after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                debug!("periodic flush");
                queue.flush();
            }
        });

        Self { handle }
    }

    /// Stop the periodic timer. In-flight sends are unaffected.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

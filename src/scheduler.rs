//! Deferred lock transitions
//!
//! Each scheduled transition is a tokio task that sleeps and then reports
//! back on a channel, so the event loop applies it like any other event.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A pending transition whose delay has elapsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTimerFired {
    pub entity_id: String,
}

/// Pending transitions keyed by entity id
pub struct LockScheduler {
    pending: HashMap<String, Vec<JoinHandle<()>>>,
    tx: mpsc::UnboundedSender<LockTimerFired>,
}

impl std::fmt::Debug for LockScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockScheduler")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl LockScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LockTimerFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                pending: HashMap::new(),
                tx,
            },
            rx,
        )
    }

    /// Schedule a transition for `entity_id` after `delay`.
    ///
    /// Existing transitions for the same entity stay pending. Must be called
    /// from within a tokio runtime.
    pub fn schedule(&mut self, entity_id: &str, delay: Duration) {
        let tx = self.tx.clone();
        let fired = LockTimerFired {
            entity_id: entity_id.to_string(),
        };

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the panel is shutting down
            let _ = tx.send(fired);
        });

        let handles = self.pending.entry(entity_id.to_string()).or_default();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        log::debug!("Scheduled lock transition for {entity_id} in {delay:?}");
    }

    /// Abort every pending transition for `entity_id`
    pub fn cancel(&mut self, entity_id: &str) -> usize {
        let Some(handles) = self.pending.remove(entity_id) else {
            return 0;
        };

        let mut cancelled = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} lock transition(s) for {entity_id}");
        }
        cancelled
    }

    /// Abort everything; used at teardown
    pub fn cancel_all(&mut self) {
        for (_, handles) in self.pending.drain() {
            for handle in handles {
                handle.abort();
            }
        }
    }

    /// Number of transitions that have not fired yet
    pub fn pending_count(&self) -> usize {
        self.pending
            .values()
            .flatten()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl Drop for LockScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

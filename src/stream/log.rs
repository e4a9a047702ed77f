//! Per-run append-only event log with live fan-out.

use std::sync::Mutex;

use tokio::sync::{mpsc, watch};

use crate::runs::FlowEvent;

/// The ordered event history of one run, plus its live subscribers.
///
/// The log is append-only: the coordinator is the single writer, and every
/// append is fanned out to each current subscriber through its own
/// unbounded buffer, so a slow consumer delays nobody and drops nothing.
/// A watch flag flips once when a terminal event lands; snapshot readers
/// wait on it.
pub struct RunLog {
    events: Mutex<Vec<FlowEvent>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<FlowEvent>>>,
    terminated_tx: watch::Sender<bool>,
    terminated_rx: watch::Receiver<bool>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    #[must_use]
    pub fn new() -> Self {
        let (terminated_tx, terminated_rx) = watch::channel(false);
        Self {
            events: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            terminated_tx,
            terminated_rx,
        }
    }

    /// Append one event and fan it out. Returns `false` when the log is
    /// already terminated and the event was refused.
    pub fn append(&self, event: FlowEvent) -> bool {
        if self.is_terminated() {
            tracing::warn!(kind = event.kind(), "event refused after terminal event");
            return false;
        }
        let terminal = event.is_terminal();
        self.events.lock().expect("event log poisoned").push(event.clone());

        {
            let mut subscribers = self.subscribers.lock().expect("subscribers poisoned");
            // A failed send means the subscriber hung up; that is local to
            // the subscriber and must not affect the run or its peers.
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
            if terminal {
                subscribers.clear();
            }
        }

        if terminal {
            let _ = self.terminated_tx.send(true);
        }
        true
    }

    /// Register a live subscriber. Joining after the run started yields
    /// events from the join point forward; joining after termination yields
    /// an already-closed channel.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<FlowEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_terminated() {
            self.subscribers.lock().expect("subscribers poisoned").push(tx);
        }
        rx
    }

    /// The full ordered history so far.
    #[must_use]
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        *self.terminated_rx.borrow()
    }

    /// Wait until a terminal event has been appended.
    pub async fn terminated(&self) {
        let mut rx = self.terminated_rx.clone();
        // wait_for returns immediately when the flag is already true.
        let _ = rx.wait_for(|done| *done).await;
    }
}

//! Run event publication: live subscription and blocking snapshot.

use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::mpsc;

use super::log::RunLog;
use crate::runs::FlowEvent;

/// Errors local to event delivery; they never affect the run itself.
#[derive(Debug, Error, Diagnostic)]
pub enum StreamError {
    #[error("unknown run: {run_id}")]
    #[diagnostic(code(loomflow::stream::unknown_run))]
    UnknownRun { run_id: String },

    #[error("run {run_id} already has an event log")]
    #[diagnostic(
        code(loomflow::stream::duplicate_run),
        help("Job ids are single-use; start a new run instead.")
    )]
    DuplicateRun { run_id: String },
}

/// A live view of one run's events from the subscriber's join point.
pub struct EventSource {
    rx: mpsc::UnboundedReceiver<FlowEvent>,
}

impl EventSource {
    /// Next event, or `None` once the terminal event has been delivered.
    pub async fn next(&mut self) -> Option<FlowEvent> {
        self.rx.recv().await
    }

    /// Adapt into a futures `Stream` for response bodies.
    pub fn into_stream(self) -> impl futures_util::Stream<Item = FlowEvent> {
        futures_util::stream::unfold(self, |mut source| async move {
            source.next().await.map(|event| (event, source))
        })
    }
}

/// Owns the event logs of all known runs.
///
/// The coordinator writes; any number of subscribers read, either live
/// ([`subscribe`](Self::subscribe)) or as a complete history once the run
/// terminated ([`snapshot`](Self::snapshot)). Logs are kept after
/// termination so late snapshot calls still see the full ordered history.
#[derive(Default)]
pub struct EventPublisher {
    runs: Mutex<FxHashMap<String, Arc<RunLog>>>,
}

impl EventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the log for a new run. Fails if the id was already used,
    /// enforcing single-use job ids.
    pub fn create(&self, run_id: &str) -> Result<Arc<RunLog>, StreamError> {
        let mut runs = self.runs.lock().expect("publisher poisoned");
        if runs.contains_key(run_id) {
            return Err(StreamError::DuplicateRun {
                run_id: run_id.to_string(),
            });
        }
        let log = Arc::new(RunLog::new());
        runs.insert(run_id.to_string(), Arc::clone(&log));
        Ok(log)
    }

    #[must_use]
    pub fn contains(&self, run_id: &str) -> bool {
        self.runs.lock().expect("publisher poisoned").contains_key(run_id)
    }

    fn log(&self, run_id: &str) -> Result<Arc<RunLog>, StreamError> {
        self.runs
            .lock()
            .expect("publisher poisoned")
            .get(run_id)
            .cloned()
            .ok_or_else(|| StreamError::UnknownRun {
                run_id: run_id.to_string(),
            })
    }

    /// Subscribe live; events arrive from the join point forward.
    pub fn subscribe(&self, run_id: &str) -> Result<EventSource, StreamError> {
        let log = self.log(run_id)?;
        Ok(EventSource {
            rx: log.subscribe(),
        })
    }

    /// Block until the run terminated, then return its complete ordered
    /// history, identical to what a live subscriber from run start saw.
    pub async fn snapshot(&self, run_id: &str) -> Result<Vec<FlowEvent>, StreamError> {
        let log = self.log(run_id)?;
        log.terminated().await;
        Ok(log.events())
    }
}

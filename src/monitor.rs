//! Audit sinks: message and transaction records.
//!
//! The persistence layer proper is an external collaborator; this module is
//! the narrow sink the engine reports into. Every conversational turn a
//! vertex produces becomes a [`MessageRecord`], and every vertex execution
//! becomes a [`TransactionRecord`]. Both accumulate per flow and are exposed
//! (and cleared) over the monitor endpoints.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::VertexId;
use crate::util::id;

/// One conversational turn recorded during a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub flow_id: String,
    pub session_id: String,
    pub sender: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub properties: Value,
}

impl MessageRecord {
    /// Sender label for user-originated turns.
    pub const SENDER_USER: &'static str = "User";
    /// Sender label for machine-originated turns.
    pub const SENDER_MACHINE: &'static str = "Machine";

    pub fn new(
        flow_id: impl Into<String>,
        session_id: impl Into<String>,
        sender: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id::record_id(),
            flow_id: flow_id.into(),
            session_id: session_id.into(),
            sender: sender.into(),
            sender_name: sender_name.into(),
            text: text.into(),
            timestamp: Utc::now(),
            properties: Value::Null,
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

/// Execution status carried on a transaction record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Error,
}

/// One vertex execution recorded for audit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub flow_id: String,
    pub vertex_id: VertexId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<VertexId>,
    pub inputs: FxHashMap<String, Value>,
    pub outputs: FxHashMap<String, Value>,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        flow_id: impl Into<String>,
        vertex_id: VertexId,
        status: TransactionStatus,
    ) -> Self {
        Self {
            id: id::record_id(),
            flow_id: flow_id.into(),
            vertex_id,
            target_id: None,
            inputs: FxHashMap::default(),
            outputs: FxHashMap::default(),
            status,
            error: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: Option<VertexId>) -> Self {
        self.target_id = target;
        self
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: FxHashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: FxHashMap<String, Value>) -> Self {
        self.outputs = outputs;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// In-memory accumulator behind the monitor endpoints.
#[derive(Default)]
pub struct MonitorStore {
    messages: Mutex<Vec<MessageRecord>>,
    transactions: Mutex<Vec<TransactionRecord>>,
}

impl MonitorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&self, record: MessageRecord) {
        self.messages.lock().expect("messages poisoned").push(record);
    }

    /// List messages, optionally filtered by flow and/or session.
    #[must_use]
    pub fn messages(&self, flow_id: Option<&str>, session_id: Option<&str>) -> Vec<MessageRecord> {
        self.messages
            .lock()
            .expect("messages poisoned")
            .iter()
            .filter(|m| flow_id.is_none_or(|f| m.flow_id == f))
            .filter(|m| session_id.is_none_or(|s| m.session_id == s))
            .cloned()
            .collect()
    }

    /// Delete all messages for a flow, returning how many were removed.
    pub fn delete_messages(&self, flow_id: &str) -> usize {
        let mut guard = self.messages.lock().expect("messages poisoned");
        let before = guard.len();
        guard.retain(|m| m.flow_id != flow_id);
        before - guard.len()
    }

    /// Replace the text of a stored message; `false` when the id is unknown.
    pub fn update_message(&self, message_id: &str, text: &str) -> bool {
        let mut guard = self.messages.lock().expect("messages poisoned");
        match guard.iter_mut().find(|m| m.id == message_id) {
            Some(record) => {
                record.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn add_transaction(&self, record: TransactionRecord) {
        self.transactions
            .lock()
            .expect("transactions poisoned")
            .push(record);
    }

    #[must_use]
    pub fn transactions(&self, flow_id: Option<&str>) -> Vec<TransactionRecord> {
        self.transactions
            .lock()
            .expect("transactions poisoned")
            .iter()
            .filter(|t| flow_id.is_none_or(|f| t.flow_id == f))
            .cloned()
            .collect()
    }
}

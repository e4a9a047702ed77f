//! Build cache: per-run vertex results, flow-indexed history.
//!
//! Records are keyed by run id so two runs of structurally identical graphs
//! never share stale results, and indexed by flow id so monitoring can list
//! and clear build history independent of any single run. There is no
//! internal eviction: build history is a debugging and audit artifact, and
//! retention ends only with an explicit [`BuildCache::clear`].

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::executor::{VertexError, VertexOutput};
use crate::graph::VertexId;

/// The captured result of one vertex execution within a run.
///
/// A record is written whether the vertex succeeded or failed; re-execution
/// within the same run appends a superseding record, and reads return the
/// most recent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub vertex_id: VertexId,
    pub inputs: FxHashMap<String, Value>,
    pub outputs: FxHashMap<String, Value>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

impl BuildRecord {
    /// Record a completed execution.
    #[must_use]
    pub fn success(vertex_id: VertexId, output: &VertexOutput) -> Self {
        Self {
            vertex_id,
            inputs: output.inputs.clone(),
            outputs: output.outputs.clone(),
            valid: true,
            error: None,
            duration_ms: output.duration.as_secs_f64() * 1_000.0,
            timestamp: Utc::now(),
        }
    }

    /// Record a failed execution.
    #[must_use]
    pub fn failure(vertex_id: VertexId, error: &VertexError) -> Self {
        Self {
            vertex_id,
            inputs: FxHashMap::default(),
            outputs: FxHashMap::default(),
            valid: false,
            error: Some(error.to_string()),
            duration_ms: 0.0,
            timestamp: Utc::now(),
        }
    }

    /// Record a vertex that was never invoked because an upstream dependency
    /// failed.
    #[must_use]
    pub fn inactivated(vertex_id: VertexId, upstream: &VertexId) -> Self {
        Self {
            vertex_id,
            inputs: FxHashMap::default(),
            outputs: FxHashMap::default(),
            valid: false,
            error: Some(format!("inactivated: upstream vertex {upstream} failed")),
            duration_ms: 0.0,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Default)]
struct CacheInner {
    /// run id -> vertex id -> append-only record history.
    records: FxHashMap<String, FxHashMap<VertexId, Vec<BuildRecord>>>,
    /// flow id -> runs recorded for it, in registration order.
    runs_by_flow: FxHashMap<String, Vec<String>>,
}

/// Stores the latest build result per (run, vertex).
///
/// Shared across concurrent runs; writes are (run, vertex)-keyed, so the
/// single internal lock is the only coordination needed.
#[derive(Default)]
pub struct BuildCache {
    inner: Mutex<CacheInner>,
}

impl BuildCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a run with its flow so flow-level listing and deletion can
    /// find it. Called once per run before any `put`.
    pub fn register_run(&self, flow_id: &str, run_id: &str) {
        let mut inner = self.inner.lock().expect("cache poisoned");
        inner
            .runs_by_flow
            .entry(flow_id.to_string())
            .or_default()
            .push(run_id.to_string());
        inner.records.entry(run_id.to_string()).or_default();
    }

    /// The most recent record for a vertex within a run.
    #[must_use]
    pub fn get(&self, run_id: &str, vertex_id: &VertexId) -> Option<BuildRecord> {
        let inner = self.inner.lock().expect("cache poisoned");
        inner
            .records
            .get(run_id)
            .and_then(|by_vertex| by_vertex.get(vertex_id))
            .and_then(|history| history.last())
            .cloned()
    }

    /// Append a record. Earlier records for the same (run, vertex) are
    /// superseded, not merged.
    pub fn put(&self, run_id: &str, record: BuildRecord) {
        let mut inner = self.inner.lock().expect("cache poisoned");
        inner
            .records
            .entry(run_id.to_string())
            .or_default()
            .entry(record.vertex_id.clone())
            .or_default()
            .push(record);
    }

    /// Full build history for a flow, merged across its runs.
    #[must_use]
    pub fn list(&self, flow_id: &str) -> FxHashMap<VertexId, Vec<BuildRecord>> {
        let inner = self.inner.lock().expect("cache poisoned");
        let mut merged: FxHashMap<VertexId, Vec<BuildRecord>> = FxHashMap::default();
        for run_id in inner.runs_by_flow.get(flow_id).into_iter().flatten() {
            if let Some(by_vertex) = inner.records.get(run_id) {
                for (vertex_id, history) in by_vertex {
                    merged
                        .entry(vertex_id.clone())
                        .or_default()
                        .extend(history.iter().cloned());
                }
            }
        }
        merged
    }

    /// Drop all build history for a flow.
    pub fn clear(&self, flow_id: &str) {
        let mut inner = self.inner.lock().expect("cache poisoned");
        if let Some(runs) = inner.runs_by_flow.remove(flow_id) {
            for run_id in runs {
                inner.records.remove(&run_id);
            }
        }
    }
}

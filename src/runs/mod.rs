//! Run orchestration: event vocabulary, options, and the coordinator.
//!
//! A run is one execution attempt of a (sub)graph, identified by a
//! single-use job id. The [`FlowRunner`] validates and orders the graph
//! synchronously (graph errors fail before a job id is issued), then
//! executes the in-scope vertices sequentially on a spawned task, writing
//! build records and audit records as it goes and publishing the ordered
//! [`FlowEvent`] stream. Every started run terminates with exactly one
//! `end` or `error` event.

mod coordinator;
mod events;

pub use coordinator::{FlowRunner, RunOptions, RunOutcome, RunPhase, RunnerError};
pub use events::FlowEvent;

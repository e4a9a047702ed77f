//! # Loomflow: a flow execution engine
//!
//! Loomflow executes directed graphs of typed components (chat inputs,
//! prompts, model calls, outputs) the way a visual flow editor expects:
//! vertices ordered by data dependency, each executed exactly once per run,
//! intermediate results cached, and an ordered stream of progress, result,
//! and error events delivered to clients in real time.
//!
//! ## Core Concepts
//!
//! - **Vertices**: component instances with declared, typed input and
//!   output slots
//! - **Edges**: data dependencies from one vertex's output to another's
//!   input
//! - **Runs**: one execution attempt of a (sub)graph, identified by a
//!   single-use job id
//! - **Build records**: captured inputs, outputs, timing, and validity per
//!   vertex execution
//! - **Events**: the ordered `vertices_sorted` / `add_message` /
//!   `end_vertex` / `token` / `error` / `end` stream a run produces
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use loomflow::component::ComponentRegistry;
//! use loomflow::config::RuntimeConfig;
//! use loomflow::graph::{Edge, FlowGraph, Vertex};
//! use loomflow::runs::{FlowRunner, RunOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = Arc::new(
//!     FlowGraph::new("hello")
//!         .add_vertex(Vertex::with_id("In-aaaaa", "ChatInput"))
//!         .add_vertex(Vertex::with_id("Out-bbbbb", "ChatOutput"))
//!         .add_edge(Edge::new("In-aaaaa", "message", "Out-bbbbb", "message")),
//! );
//!
//! let runner = FlowRunner::new(
//!     Arc::new(ComponentRegistry::with_builtins()),
//!     RuntimeConfig::default(),
//! );
//!
//! let options = RunOptions::default().with_input("input_value", "hi".into());
//! let events = runner.run_to_completion(graph, options).await?;
//! assert!(events.last().is_some_and(|e| e.is_terminal()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Model
//!
//! One run executes its vertices **sequentially** in resolver order on one
//! task; concurrency exists across independent runs and inside a component's
//! own I/O. A component that streams emits through its invocation context,
//! and the coordinator drains those emissions onto the run's event stream
//! concurrently with awaiting the final result, so `token` events land
//! between a vertex's start and its `end_vertex`, in arrival order.
//!
//! Failures are isolated per vertex: dependents of a failed vertex are
//! inactivated (reported, never invoked) while unrelated branches keep
//! running; only failures the component marks fatal end the run early.
//! Every started run terminates with exactly one `end` or `error` event.
//!
//! ## Module Guide
//!
//! - [`graph`] - Graph model, validation, scoping, dependency resolution
//! - [`component`] - Component contract, registry, and built-ins
//! - [`executor`] - Per-vertex input binding, invocation, normalization
//! - [`cache`] - Build records keyed by run, listed per flow
//! - [`runs`] - Run coordinator, options, and the event vocabulary
//! - [`stream`] - Event publication: live subscription and snapshots
//! - [`monitor`] - Message and transaction audit sinks
//! - [`flows`] - Flow lookup interface to external persistence
//! - [`server`] - The axum HTTP surface
//! - [`config`] - Environment-driven runtime settings

pub mod cache;
pub mod component;
pub mod config;
pub mod executor;
pub mod flows;
pub mod graph;
pub mod monitor;
pub mod runs;
pub mod server;
pub mod stream;
pub mod util;

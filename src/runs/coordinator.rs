//! The run coordinator: drives one flow execution end to end.

use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use crate::cache::{BuildCache, BuildRecord};
use crate::component::{ComponentEvent, ComponentRegistry, InvokeContext};
use crate::config::RuntimeConfig;
use crate::executor::{VertexError, VertexExecutor, VertexOutput};
use crate::graph::{resolver, FlowGraph, GraphError, VertexId, VertexState};
use crate::monitor::{MonitorStore, TransactionRecord, TransactionStatus};
use crate::runs::FlowEvent;
use crate::stream::{EventPublisher, RunLog, StreamError};
use crate::util::id;

/// Per-run options carried from the build request.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Session the run's conversational turns belong to; defaults to the
    /// flow id.
    pub session_id: Option<String>,
    /// Re-trigger execution from this vertex (its ancestors run too).
    pub start_vertex: Option<VertexId>,
    /// Do not execute anything past this vertex.
    pub stop_vertex: Option<VertexId>,
    /// Request-level slot values, applied to any vertex slot of the same
    /// name that no edge binds.
    pub inputs: FxHashMap<String, Value>,
    /// Per-vertex slot overrides, taking precedence over `inputs`.
    pub overrides: FxHashMap<VertexId, FxHashMap<String, Value>>,
    /// File references attached to the request, surfaced to components as
    /// the `files` input.
    pub files: Vec<String>,
    /// Whether build records are written to the cache.
    pub log_builds: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            start_vertex: None,
            stop_vertex: None,
            inputs: FxHashMap::default(),
            overrides: FxHashMap::default(),
            files: Vec::new(),
            log_builds: true,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn with_stop(mut self, stop: impl Into<VertexId>) -> Self {
        self.stop_vertex = Some(stop.into());
        self
    }

    #[must_use]
    pub fn with_start(mut self, start: impl Into<VertexId>) -> Self {
        self.start_vertex = Some(start.into());
        self
    }

    #[must_use]
    pub fn with_input(mut self, slot: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(slot.into(), value);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Lifecycle of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Created,
    Sorting,
    Executing,
    Terminated(RunOutcome),
}

/// How a terminated run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every in-scope vertex reached success or error.
    Ended,
    /// A fatal error stopped the run early.
    Failed,
    /// The run was cancelled from outside.
    Cancelled,
}

/// Errors surfaced when starting, querying, or cancelling runs.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error("unknown flow: {flow_id}")]
    #[diagnostic(code(loomflow::runner::unknown_flow))]
    UnknownFlow { flow_id: String },

    #[error("unknown run: {run_id}")]
    #[diagnostic(code(loomflow::runner::unknown_run))]
    UnknownRun { run_id: String },

    #[error(transparent)]
    #[diagnostic(code(loomflow::runner::stream))]
    Stream(#[from] StreamError),
}

struct RunHandle {
    flow_id: String,
    cancel: watch::Sender<bool>,
    phase: Arc<Mutex<RunPhase>>,
    states: Arc<Mutex<FxHashMap<VertexId, VertexState>>>,
}

/// Orchestrates flow runs: validates and orders the graph, executes
/// vertices sequentially, updates the build cache and audit sinks, and
/// publishes the ordered event stream.
///
/// One `FlowRunner` serves many concurrent runs; each run is
/// single-threaded internally, executing its vertices strictly in resolver
/// order. Parallel fan-out across independent branches is deliberately
/// traded for deterministic event ordering.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use loomflow::component::ComponentRegistry;
/// use loomflow::config::RuntimeConfig;
/// use loomflow::graph::FlowGraph;
/// use loomflow::runs::{FlowRunner, RunOptions};
///
/// # async fn example(graph: Arc<FlowGraph>) -> Result<(), Box<dyn std::error::Error>> {
/// let runner = FlowRunner::new(
///     Arc::new(ComponentRegistry::with_builtins()),
///     RuntimeConfig::default(),
/// );
/// let job_id = runner.start_run(graph, RunOptions::default())?;
/// let events = runner.publisher().snapshot(&job_id).await?;
/// assert!(events.last().is_some_and(|e| e.is_terminal()));
/// # Ok(())
/// # }
/// ```
pub struct FlowRunner {
    registry: Arc<ComponentRegistry>,
    cache: Arc<BuildCache>,
    publisher: Arc<EventPublisher>,
    monitor: Arc<MonitorStore>,
    runs: Mutex<FxHashMap<String, RunHandle>>,
    config: RuntimeConfig,
}

impl FlowRunner {
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            cache: Arc::new(BuildCache::new()),
            publisher: Arc::new(EventPublisher::new()),
            monitor: Arc::new(MonitorStore::new()),
            runs: Mutex::new(FxHashMap::default()),
            config,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<BuildCache> {
        &self.cache
    }

    #[must_use]
    pub fn publisher(&self) -> &Arc<EventPublisher> {
        &self.publisher
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<MonitorStore> {
        &self.monitor
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Start a run of the given graph snapshot.
    ///
    /// Validation, scoping, and ordering happen synchronously: a graph
    /// error fails the request here and no job id is ever issued. On
    /// success the `vertices_sorted` listing is published and the
    /// sequential execution task is spawned; the returned job id reads the
    /// stream.
    #[instrument(skip(self, graph, options), fields(flow = %graph.flow_id()), err)]
    pub fn start_run(
        &self,
        graph: Arc<FlowGraph>,
        options: RunOptions,
    ) -> Result<String, RunnerError> {
        self.launch(graph, options, false)
            .map(|(job_id, _)| job_id)
    }

    /// Start a run and subscribe to it atomically, so the returned source
    /// sees every event from `vertices_sorted` onward. This is what the
    /// synchronous streaming surface uses; plain [`start_run`](Self::start_run)
    /// subscribers get join-point-forward semantics instead.
    pub fn start_run_streaming(
        &self,
        graph: Arc<FlowGraph>,
        options: RunOptions,
    ) -> Result<(String, crate::stream::EventSource), RunnerError> {
        self.launch(graph, options, true).map(|(job_id, source)| {
            (job_id, source.expect("subscription requested at launch"))
        })
    }

    fn launch(
        &self,
        graph: Arc<FlowGraph>,
        options: RunOptions,
        subscribe: bool,
    ) -> Result<(String, Option<crate::stream::EventSource>), RunnerError> {
        let phase = Arc::new(Mutex::new(RunPhase::Created));
        graph.validate()?;

        *phase.lock().expect("phase poisoned") = RunPhase::Sorting;
        let scope = graph.scope(options.start_vertex.as_ref(), options.stop_vertex.as_ref())?;
        let order = resolver::order(&graph, &scope)?;
        let roots = resolver::roots(&graph, &scope);

        let job_id = id::job_id();
        let log = self.publisher.create(&job_id)?;
        self.cache.register_run(graph.flow_id(), &job_id);

        let source = subscribe
            .then(|| self.publisher.subscribe(&job_id))
            .transpose()?;
        log.append(FlowEvent::VerticesSorted {
            ids: roots,
            to_run: order.clone(),
        });
        *phase.lock().expect("phase poisoned") = RunPhase::Executing;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let log_builds = options.log_builds && self.config.log_builds;
        let states: Arc<Mutex<FxHashMap<VertexId, VertexState>>> = Arc::new(Mutex::new(
            order
                .iter()
                .map(|id| (id.clone(), VertexState::Pending))
                .collect(),
        ));
        let worker = RunWorker {
            job_id: job_id.clone(),
            graph: Arc::clone(&graph),
            scope,
            order,
            options,
            log_builds,
            executor: VertexExecutor::new(Arc::clone(&self.registry)),
            cache: Arc::clone(&self.cache),
            monitor: Arc::clone(&self.monitor),
            log,
            cancel: cancel_rx,
            phase: Arc::clone(&phase),
            states: Arc::clone(&states),
        };

        self.runs.lock().expect("runs poisoned").insert(
            job_id.clone(),
            RunHandle {
                flow_id: graph.flow_id().to_string(),
                cancel: cancel_tx,
                phase,
                states,
            },
        );

        tracing::info!(job = %job_id, "run started");
        tokio::spawn(worker.run());
        Ok((job_id, source))
    }

    /// Run a graph to completion and return its full ordered event history.
    pub async fn run_to_completion(
        &self,
        graph: Arc<FlowGraph>,
        options: RunOptions,
    ) -> Result<Vec<FlowEvent>, RunnerError> {
        let job_id = self.start_run(graph, options)?;
        Ok(self.publisher.snapshot(&job_id).await?)
    }

    /// Signal cancellation to a run. The coordinator stops initiating new
    /// vertices and interrupts the in-flight one cooperatively.
    pub fn cancel_run(&self, run_id: &str) -> Result<(), RunnerError> {
        let runs = self.runs.lock().expect("runs poisoned");
        let handle = runs.get(run_id).ok_or_else(|| RunnerError::UnknownRun {
            run_id: run_id.to_string(),
        })?;
        let _ = handle.cancel.send(true);
        tracing::info!(job = %run_id, "cancellation requested");
        Ok(())
    }

    /// Current lifecycle phase of a run.
    pub fn run_phase(&self, run_id: &str) -> Result<RunPhase, RunnerError> {
        let runs = self.runs.lock().expect("runs poisoned");
        let handle = runs.get(run_id).ok_or_else(|| RunnerError::UnknownRun {
            run_id: run_id.to_string(),
        })?;
        Ok(*handle.phase.lock().expect("phase poisoned"))
    }

    /// The flow a run belongs to.
    pub fn run_flow(&self, run_id: &str) -> Result<String, RunnerError> {
        let runs = self.runs.lock().expect("runs poisoned");
        let handle = runs.get(run_id).ok_or_else(|| RunnerError::UnknownRun {
            run_id: run_id.to_string(),
        })?;
        Ok(handle.flow_id.clone())
    }

    /// The runtime state of every in-scope vertex of a run.
    pub fn vertex_states(
        &self,
        run_id: &str,
    ) -> Result<FxHashMap<VertexId, VertexState>, RunnerError> {
        let runs = self.runs.lock().expect("runs poisoned");
        let handle = runs.get(run_id).ok_or_else(|| RunnerError::UnknownRun {
            run_id: run_id.to_string(),
        })?;
        Ok(handle.states.lock().expect("states poisoned").clone())
    }
}

/// The spawned task executing one run's vertices in order.
struct RunWorker {
    job_id: String,
    graph: Arc<FlowGraph>,
    scope: FxHashSet<VertexId>,
    order: Vec<VertexId>,
    options: RunOptions,
    log_builds: bool,
    executor: VertexExecutor,
    cache: Arc<BuildCache>,
    monitor: Arc<MonitorStore>,
    log: Arc<RunLog>,
    cancel: watch::Receiver<bool>,
    phase: Arc<Mutex<RunPhase>>,
    states: Arc<Mutex<FxHashMap<VertexId, VertexState>>>,
}

enum VertexRunResult {
    Success(FxHashMap<String, Value>, BuildRecord),
    Failure(VertexError, BuildRecord),
    Cancelled(BuildRecord),
}

impl RunWorker {
    #[instrument(skip(self), fields(job = %self.job_id, flow = %self.graph.flow_id()))]
    async fn run(self) {
        let session_id = self
            .options
            .session_id
            .clone()
            .unwrap_or_else(|| self.graph.flow_id().to_string());

        let mut failed: FxHashSet<VertexId> = FxHashSet::default();
        let mut upstream: FxHashMap<VertexId, FxHashMap<String, Value>> = FxHashMap::default();
        let mut outcome = RunOutcome::Ended;
        let mut terminal = FlowEvent::End {};

        for vertex_id in &self.order {
            if *self.cancel.borrow() {
                outcome = RunOutcome::Cancelled;
                terminal = FlowEvent::Error {
                    message: "run cancelled".to_string(),
                };
                break;
            }

            // Dependents of a failed vertex are inactivated, not invoked.
            // The order is topological, so checking direct predecessors
            // propagates the failure transitively.
            let failed_upstream = self
                .graph
                .predecessors(vertex_id)
                .into_iter()
                .find(|p| failed.contains(p));
            if let Some(upstream_id) = failed_upstream {
                let record = BuildRecord::inactivated(vertex_id.clone(), &upstream_id);
                self.finish_vertex(vertex_id, record);
                failed.insert(vertex_id.clone());
                continue;
            }

            self.set_state(vertex_id, VertexState::Running);
            match self.execute_vertex(vertex_id, &session_id, &upstream).await {
                VertexRunResult::Success(outputs, record) => {
                    upstream.insert(vertex_id.clone(), outputs);
                    self.finish_vertex(vertex_id, record);
                }
                VertexRunResult::Failure(error, record) => {
                    if error.is_fatal() {
                        self.store_record(record);
                        self.set_state(vertex_id, VertexState::Error);
                        outcome = RunOutcome::Failed;
                        terminal = FlowEvent::Error {
                            message: error.to_string(),
                        };
                        break;
                    }
                    self.finish_vertex(vertex_id, record);
                    failed.insert(vertex_id.clone());
                }
                VertexRunResult::Cancelled(record) => {
                    self.store_record(record);
                    self.set_state(vertex_id, VertexState::Error);
                    outcome = RunOutcome::Cancelled;
                    terminal = FlowEvent::Error {
                        message: "run cancelled".to_string(),
                    };
                    break;
                }
            }
        }

        // Phase flips before the terminal event lands so that anyone
        // unblocked by the terminal observes a terminated run.
        *self.phase.lock().expect("phase poisoned") = RunPhase::Terminated(outcome);
        self.log.append(terminal);
        tracing::info!(outcome = ?outcome, "run terminated");
    }

    fn set_state(&self, vertex_id: &VertexId, state: VertexState) {
        if let Some(entry) = self
            .states
            .lock()
            .expect("states poisoned")
            .get_mut(vertex_id)
        {
            *entry = state;
        }
    }

    /// Invoke one vertex, draining its emitted events onto the run stream
    /// concurrently with awaiting the final result so token and message
    /// events land between the vertex's start and its `end_vertex`.
    async fn execute_vertex(
        &self,
        vertex_id: &VertexId,
        session_id: &str,
        upstream: &FxHashMap<VertexId, FxHashMap<String, Value>>,
    ) -> VertexRunResult {
        let vertex = self
            .graph
            .vertex(vertex_id)
            .expect("ordered vertex exists in graph")
            .clone();
        let overrides = self.overrides_for(vertex_id);

        let (event_tx, event_rx) = flume::unbounded();
        let mut cancel = self.cancel.clone();
        let ctx = InvokeContext::new(
            vertex_id.clone(),
            self.graph.flow_id(),
            session_id,
            event_tx,
            cancel.clone(),
        );

        let exec = self
            .executor
            .execute(&self.graph, &vertex, upstream, &overrides, ctx);
        tokio::pin!(exec);

        let mut result: Option<Result<VertexOutput, VertexError>> = None;
        let mut channel_open = true;
        let mut cancel_open = true;
        // Drain emissions and await the result together; the invocation may
        // also drop its context early, so neither side alone ends the loop.
        while result.is_none() || channel_open {
            tokio::select! {
                res = &mut exec, if result.is_none() => {
                    result = Some(res);
                }
                event = event_rx.recv_async(), if channel_open => match event {
                    Ok(component_event) => self.forward(vertex_id, component_event),
                    Err(_) => channel_open = false,
                },
                changed = cancel.changed(), if result.is_none() && cancel_open => {
                    match changed {
                        Ok(()) if *cancel.borrow() => {
                            let record = BuildRecord::failure(
                                vertex_id.clone(),
                                &VertexError::Cancelled,
                            );
                            return VertexRunResult::Cancelled(record);
                        }
                        Ok(()) => {}
                        Err(_) => cancel_open = false,
                    }
                }
            }
        }

        match result.expect("loop exits only once the invocation resolved") {
            Ok(output) => {
                let record = BuildRecord::success(vertex_id.clone(), &output);
                VertexRunResult::Success(output.outputs, record)
            }
            Err(error) => {
                let record = BuildRecord::failure(vertex_id.clone(), &error);
                VertexRunResult::Failure(error, record)
            }
        }
    }

    /// Request-level values applicable to this vertex: global `inputs`
    /// overlaid with any per-vertex overrides, plus attached files.
    fn overrides_for(&self, vertex_id: &VertexId) -> FxHashMap<String, Value> {
        let mut merged = self.options.inputs.clone();
        if !self.options.files.is_empty() {
            merged.insert("files".to_string(), serde_json::json!(self.options.files));
        }
        if let Some(per_vertex) = self.options.overrides.get(vertex_id) {
            merged.extend(per_vertex.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    fn forward(&self, vertex_id: &VertexId, event: ComponentEvent) {
        match event {
            ComponentEvent::Token { chunk } => {
                self.log.append(FlowEvent::Token {
                    id: vertex_id.clone(),
                    chunk,
                });
            }
            ComponentEvent::Message { record } => {
                self.monitor.add_message(record.clone());
                self.log.append(FlowEvent::AddMessage(record));
            }
        }
    }

    /// Persist a record, write its transaction, and publish `end_vertex`.
    fn finish_vertex(&self, vertex_id: &VertexId, record: BuildRecord) {
        self.set_state(
            vertex_id,
            if record.valid {
                VertexState::Success
            } else {
                VertexState::Error
            },
        );
        self.store_record(record.clone());

        let status = if record.valid {
            TransactionStatus::Success
        } else {
            TransactionStatus::Error
        };
        let target = self
            .graph
            .successors(vertex_id)
            .into_iter()
            .find(|s| self.scope.contains(s));
        let mut transaction =
            TransactionRecord::new(self.graph.flow_id(), vertex_id.clone(), status)
                .with_target(target)
                .with_inputs(record.inputs.clone())
                .with_outputs(record.outputs.clone());
        if let Some(message) = record.error.as_deref() {
            transaction = transaction.with_error(message);
        }
        self.monitor.add_transaction(transaction);

        let valid = record.valid;
        self.log.append(FlowEvent::EndVertex {
            id: vertex_id.clone(),
            build_data: record,
            valid,
        });
    }

    fn store_record(&self, record: BuildRecord) {
        if self.log_builds {
            self.cache.put(&self.job_id, record);
        }
    }
}

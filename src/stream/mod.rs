//! Event stream publication: per-run logs, live fan-out, snapshots.
//!
//! The publisher decouples event delivery from the pace of execution. Each
//! run owns an append-only [`RunLog`]; live subscribers each get their own
//! unbounded buffer (a slow consumer delays nobody and loses nothing), and
//! [`EventPublisher::snapshot`] blocks until the run's terminal event before
//! returning the complete ordered history.

mod log;
mod publisher;

pub use log::RunLog;
pub use publisher::{EventPublisher, EventSource, StreamError};

//! Identifier generation for vertices and runs.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of the random suffix on generated vertex ids (`ChatInput-XtBLx`).
pub const SUFFIX_LEN: usize = 5;

/// A short alphanumeric suffix for vertex ids.
#[must_use]
pub fn short_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

/// A fresh opaque job id for a run. Job ids are single-use.
#[must_use]
pub fn job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A fresh id for an audit record (messages, transactions).
#[must_use]
pub fn record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

//! Error types for pool and submission operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by pool and submission operations themselves, as opposed to
/// failures of the user work function (those are delivered per item as
/// [`TaskError`] on the error stream).
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been closed; no further submissions or pushes are
    /// accepted.
    #[error("pool is closed")]
    Closed,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),

    /// No result arrived within the configured timeout while finishing a
    /// submission. Usually means every worker died in initialization or the
    /// pool was closed with this submission's work still queued.
    #[error("timed out after {0:?} waiting for results (stuck worker or abandoned work)")]
    ResultTimeout(Duration),
}

/// A per-item failure of the user work function, tagged with the index of
/// the input that produced it.
#[derive(Debug)]
pub struct TaskError {
    /// Position of the failing input within its submission.
    pub index: u64,
    /// The error returned (or panic captured) from the work function.
    pub error: anyhow::Error,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input {}: {}", self.index, self.error)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

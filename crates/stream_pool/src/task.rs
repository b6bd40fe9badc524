//! Core task types shared between submissions and workers.
//!
//! A `Task` is one unit of work travelling through the pool's shared input
//! channel. Each task carries everything a worker needs to process it in
//! isolation: the input value, the submission's bound work function, and the
//! submission's result sender. Workers learn the correct result sink from the
//! task itself, which is what keeps concurrent submissions on one pool from
//! seeing each other's results.

use anyhow::Result;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// The user work function applied to every input item.
///
/// - `Ok(Some(v))` emits `v` on the value stream.
/// - `Ok(None)` deliberately emits nothing for this input (the output is
///   suppressed but still counted towards completion).
/// - `Err(e)` routes `e` to the error stream, tagged with the input's index.
///
/// Fixed extra arguments are closure captures; the pool never inspects them.
pub type WorkFn<T, R> = dyn Fn(T) -> Result<Option<R>> + Send + Sync;

/// Per-worker initialization closure, run once before a worker consumes
/// its first task. A failure terminates that worker only.
pub type InitFn = dyn Fn() -> Result<()> + Send + Sync;

/// One unit of work on the shared input channel.
pub(crate) struct Task<T, R> {
    /// Position of this input within its submission, dense from 0.
    pub(crate) index: u64,
    pub(crate) value: T,
    /// The submission's bound work function, shared by all of its tasks.
    pub(crate) work: Arc<WorkFn<T, R>>,
    /// Result sink of the owning submission. `None` for fire-and-forget
    /// submissions. A disconnected sink is tolerated: the worker drops the
    /// result silently and never closes the channel itself.
    pub(crate) result_tx: Option<Sender<TaskResult<R>>>,
}

/// What a worker publishes after processing one task.
#[derive(Debug)]
pub(crate) struct TaskResult<R> {
    pub(crate) index: u64,
    pub(crate) outcome: Result<Option<R>>,
}

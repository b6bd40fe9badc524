//! The worker consume loop.
//!
//! Workers are long-lived: one thread per admitted worker, all pulling from
//! the pool's shared input channel until shutdown. A worker never closes a
//! result channel (that is the owning submission's job, since one pool
//! serves many concurrent submissions) and never dies from a work-function
//! failure. Per-item faults, including panics, are captured and published
//! as that item's error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, warn};

use super::status::{StatusBoard, WORKER_ID};
use crate::task::{InitFn, Task, TaskResult, WorkFn};

/// Everything a worker thread needs, handed over at spawn.
pub(crate) struct WorkerContext<T, R> {
    pub(crate) id: usize,
    pub(crate) task_rx: Receiver<Task<T, R>>,
    pub(crate) status: Arc<StatusBoard>,
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) init: Arc<InitFn>,
    pub(crate) init_failures: Arc<Mutex<Vec<anyhow::Error>>>,
    pub(crate) poll: Duration,
}

pub(crate) fn run_worker<T, R>(ctx: WorkerContext<T, R>) {
    WORKER_ID.with(|id| *id.borrow_mut() = ctx.id);
    ctx.status.register(ctx.id);
    debug!(worker_id = ctx.id, "worker started");

    if let Err(e) = (ctx.init)() {
        error!(worker_id = ctx.id, error = %e, "worker initialization failed; worker exiting");
        ctx.init_failures
            .lock()
            .expect("init failure log mutex poisoned")
            .push(e.context(format!("worker {} initialization failed", ctx.id)));
        ctx.status.retire(ctx.id);
        return;
    }

    loop {
        if ctx.shutdown.load(Ordering::Relaxed) {
            break;
        }

        match ctx.task_rx.recv_timeout(ctx.poll) {
            Ok(task) => {
                ctx.status.set_busy(ctx.id);
                process(task);
                ctx.status.set_idle(ctx.id);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    ctx.status.retire(ctx.id);
    debug!(worker_id = ctx.id, "worker exiting");
}

/// Runs one task and publishes its outcome to the task's carried sink.
///
/// A submission that went away mid-flight leaves a disconnected sink; the
/// send failure is ignored and the result dropped. Fire-and-forget tasks
/// have no sink at all - their errors are logged and dropped.
fn process<T, R>(task: Task<T, R>) {
    let Task {
        index,
        value,
        work,
        result_tx,
    } = task;

    let outcome = run_work(work.as_ref(), value);

    match result_tx {
        Some(tx) => {
            let _ = tx.send(TaskResult { index, outcome });
        }
        None => {
            if let Err(e) = outcome {
                warn!(index, error = %e, "dropping error from fire-and-forget task");
            }
        }
    }
}

/// Invokes the work function, converting a panic into a per-item error so
/// the worker survives arbitrary user faults.
fn run_work<T, R>(work: &WorkFn<T, R>, value: T) -> Result<Option<R>> {
    match panic::catch_unwind(AssertUnwindSafe(|| work(value))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(anyhow!("work function panicked: {}", panic_message(&payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

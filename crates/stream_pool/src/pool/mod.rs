//! Worker pool for parallel stream mapping.
//!
//! Provides a reusable pool that manages worker lifecycle, task distribution
//! through a shared channel, and per-submission result routing. One pool is
//! created once and then serves any number of submissions, including
//! concurrent ones.
//!
//! # Key features
//! - Lazy, idle-first worker admission: a worker is started only when a push
//!   finds nobody idle, up to the configured cap
//! - Per-submission result channels, so concurrent submissions never see
//!   each other's results
//! - Graceful shutdown on [`close`](WorkerPool::close) or drop
//! - Thread-local worker IDs for debugging
//!
//! # Admission
//!
//! Every push runs the admission check: if some worker is idle, it will
//! absorb the new task and nothing is spawned; otherwise one new worker is
//! started, never exceeding the cap. The idle check is a lock-free atomic
//! read; the benign race it allows is resolved by rechecking under the
//! admission mutex, so the cap is a hard bound.

mod config;
mod status;
mod worker;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use status::current_worker_id;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use crate::error::PoolError;
use crate::task::{InitFn, Task};
use status::StatusBoard;
use worker::{run_worker, WorkerContext};

/// A fixed-cap pool of long-lived workers consuming a shared input channel.
///
/// Generic over the input item type `T` and the result type `R` of the work
/// functions that submissions will run on it.
pub struct WorkerPool<T, R> {
    pub(crate) config: PoolConfig,
    task_tx: Sender<Task<T, R>>,
    /// Kept so new workers can be handed a clone, and so queued tasks stay
    /// owned by the pool (not delivered) after shutdown abandons them.
    task_rx: Receiver<Task<T, R>>,
    status: Arc<StatusBoard>,
    shutdown: Arc<AtomicBool>,
    /// Admission mutex: guards spawning and owns the join handles.
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    init: Arc<InitFn>,
    init_failures: Arc<Mutex<Vec<anyhow::Error>>>,
    next_worker_id: AtomicUsize,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Creates a pool with a no-op worker initialization closure.
    ///
    /// `config.workers` is normalized to at least 1. No worker threads are
    /// started until work is pushed.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_init(config, || Ok(()))
    }

    /// Creates a pool whose workers each run `init` once before consuming
    /// tasks. Use this to set up per-worker state (connections, caches,
    /// thread-local configuration) that the work functions rely on.
    ///
    /// An `init` failure terminates only the failing worker; the error is
    /// retrievable through [`init_failures`](WorkerPool::init_failures).
    pub fn with_init<F>(mut config: PoolConfig, init: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        config.workers = config.workers.max(1);
        let (task_tx, task_rx) = unbounded();

        Self {
            config,
            task_tx,
            task_rx,
            status: Arc::new(StatusBoard::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
            init: Arc::new(init),
            init_failures: Arc::new(Mutex::new(Vec::new())),
            next_worker_id: AtomicUsize::new(0),
        }
    }

    /// Starts one worker if nobody is idle and the cap allows it.
    ///
    /// Called on every push. The lock-free idle check is rechecked under the
    /// admission mutex, so the cap holds even when pushes race.
    pub(crate) fn admit_worker(&self) -> Result<(), PoolError> {
        if self.status.idle_count() > 0 {
            return Ok(());
        }

        let mut workers = self.workers.lock().expect("worker registry mutex poisoned");
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }
        if workers.len() >= self.config.workers || self.status.idle_count() > 0 {
            return Ok(());
        }

        let id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);
        let ctx = WorkerContext {
            id,
            task_rx: self.task_rx.clone(),
            status: Arc::clone(&self.status),
            shutdown: Arc::clone(&self.shutdown),
            init: Arc::clone(&self.init),
            init_failures: Arc::clone(&self.init_failures),
            poll: self.config.worker_poll,
        };

        let handle = thread::Builder::new()
            .name(format!("stream-pool-worker-{}", id))
            .spawn(move || run_worker(ctx))
            .map_err(PoolError::Spawn)?;
        workers.push(handle);
        debug!(worker_id = id, "admitted worker");
        Ok(())
    }

    pub(crate) fn send_task(&self, task: Task<T, R>) -> Result<(), PoolError> {
        self.task_tx.send(task).map_err(|_| PoolError::Closed)
    }
}

impl<T, R> WorkerPool<T, R> {
    /// Whether [`close`](WorkerPool::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Shuts the pool down: no further work is accepted, workers finish the
    /// task they already hold and exit, queued tasks are abandoned.
    ///
    /// Idempotent. Callers should finish in-flight submissions first; a
    /// submission whose queued tasks are abandoned here will fail its
    /// `finish` with a timeout.
    pub fn close(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("closing pool; joining workers");
        let mut workers = self.workers.lock().expect("worker registry mutex poisoned");
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Number of live workers. Never exceeds the configured cap.
    pub fn worker_count(&self) -> usize {
        self.status.live_count()
    }

    /// Number of workers currently idle.
    pub fn idle_workers(&self) -> usize {
        self.status.idle_count()
    }

    /// The worker cap after normalization.
    pub fn worker_cap(&self) -> usize {
        self.config.workers
    }

    /// Drains and returns errors from failed worker initializations.
    ///
    /// Initialization failures are per-worker diagnostics, not per-item
    /// results, so they are reported here rather than on any submission's
    /// error stream.
    pub fn init_failures(&self) -> Vec<anyhow::Error> {
        std::mem::take(
            &mut *self
                .init_failures
                .lock()
                .expect("init failure log mutex poisoned"),
        )
    }
}

impl<T, R> Drop for WorkerPool<T, R> {
    fn drop(&mut self) {
        self.close();
    }
}

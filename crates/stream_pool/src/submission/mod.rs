//! Submission handling for the worker pool.
//!
//! A [`Submission`] holds the state one invocation owns: the bound work
//! function, the index counter, the result channel, and the ordering
//! merger. Several submissions can share one pool. Every task carries its
//! submission's result sender, so workers deliver each result to the
//! caller that enqueued it.
//!
//! # Protocol
//!
//! - [`WorkerPool::submission`] binds the work function and opens the
//!   result channel (unless fire-and-forget)
//! - [`Submission::push`] enqueues one input: admission check, send, then
//!   a non-blocking drain of results that have already arrived
//! - [`Submission::finish`] blocks until every pushed input is accounted
//!   for and returns the remaining emissions. It consumes the submission,
//!   so pushing after finish is unrepresentable
//! - Dropping a submission mid-stream cancels it: nothing more is pushed,
//!   already-queued tasks still execute, and their results are dropped at
//!   the disconnected channel
//!
//! [`WorkerPool::run`] and [`WorkerPool::run_with`] wrap the whole
//! protocol for callers that have the full input in hand.

mod merger;

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::error::{PoolError, TaskError};
use crate::pool::WorkerPool;
use crate::task::{Task, TaskResult, WorkFn};
use merger::Merger;

/// Per-run switches, mirrored from the two optional behaviours a caller can
/// turn off: waiting for results at all, and input-order delivery.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// When false, the submission is fire-and-forget: no result channel is
    /// allocated, nothing is ever delivered, and worker errors are logged
    /// and dropped. For side-effect-only work functions.
    pub wait_for_results: bool,
    /// When false, results are delivered in completion order instead of
    /// input order.
    pub sorted: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            wait_for_results: true,
            sorted: true,
        }
    }
}

impl RunOptions {
    /// Deliver results in completion order (`true` restores input order).
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Toggle result delivery altogether.
    pub fn wait_for_results(mut self, wait: bool) -> Self {
        self.wait_for_results = wait;
        self
    }

    /// Options for a side-effect-only run: no results, no ordering.
    pub fn fire_and_forget() -> Self {
        Self::default().wait_for_results(false)
    }
}

/// One element of a submission's merged output stream.
///
/// Suppressed outputs (work function returned `Ok(None)`) produce no
/// emission at all; they advance the ordering silently.
#[derive(Debug)]
pub enum Emission<R> {
    /// A value produced for the input at `index`.
    Value { index: u64, value: R },
    /// The work function failed for the input at the error's index.
    Error(TaskError),
}

impl<R> Emission<R> {
    /// Index of the input this emission belongs to.
    pub fn index(&self) -> u64 {
        match self {
            Emission::Value { index, .. } => *index,
            Emission::Error(e) => e.index,
        }
    }
}

/// Collected output of a one-shot [`WorkerPool::run`].
#[derive(Debug)]
pub struct RunOutput<R> {
    /// Emitted values; in input order unless the run was unsorted.
    pub values: Vec<R>,
    /// Per-item errors, index-tagged, in the same stream order.
    pub errors: Vec<TaskError>,
    /// How many inputs produced `Ok(None)` and were deliberately dropped
    /// from the value stream. Always 0 for fire-and-forget runs.
    pub suppressed: u64,
}

impl<R> Default for RunOutput<R> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            errors: Vec::new(),
            suppressed: 0,
        }
    }
}

/// One in-flight invocation against a [`WorkerPool`].
///
/// Created by [`WorkerPool::submission`]. Borrows the pool, so it cannot
/// outlive it; the pool itself outlives any number of submissions.
pub struct Submission<'pool, T, R> {
    pool: &'pool WorkerPool<T, R>,
    work: Arc<WorkFn<T, R>>,
    next_index: u64,
    received: u64,
    merger: Merger<R>,
    /// Result channel; `None` for fire-and-forget. The sender half is
    /// cloned into every task so workers can route results back here.
    channel: Option<(Sender<TaskResult<R>>, Receiver<TaskResult<R>>)>,
}

impl<T, R> Submission<'_, T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Enqueues one input and returns any results that became emittable.
    ///
    /// Runs the admission check first, so worker start-up tracks demand.
    /// The drain is non-blocking; anything still in flight is picked up by
    /// a later push or by [`finish`](Submission::finish).
    pub fn push(&mut self, value: T) -> Result<Vec<Emission<R>>, PoolError> {
        if self.pool.is_closed() {
            return Err(PoolError::Closed);
        }
        self.pool.admit_worker()?;

        let task = Task {
            index: self.next_index,
            value,
            work: Arc::clone(&self.work),
            result_tx: self.channel.as_ref().map(|(tx, _)| tx.clone()),
        };
        self.pool.send_task(task)?;
        self.next_index += 1;

        let mut out = Vec::new();
        let mut arrived = Vec::new();
        if let Some((_, rx)) = &self.channel {
            while let Ok(result) = rx.try_recv() {
                arrived.push(result);
            }
        }
        for result in arrived {
            self.absorb(result, &mut out);
        }
        Ok(out)
    }

    /// Blocks until every pushed input has a result, then returns the
    /// remaining emissions.
    ///
    /// The per-wait timeout is the pool's configured `timeout`; it trips
    /// only when results can no longer arrive (all workers died in
    /// initialization, or the pool was closed with this submission's work
    /// still queued).
    ///
    /// Fire-and-forget submissions return immediately with no emissions.
    pub fn finish(mut self) -> Result<Vec<Emission<R>>, PoolError> {
        let Some((_tx, rx)) = self.channel.take() else {
            return Ok(Vec::new());
        };

        let timeout = self.pool.config.timeout;
        let mut out = Vec::new();
        while self.received < self.next_index {
            match rx.recv_timeout(timeout) {
                Ok(result) => self.absorb(result, &mut out),
                Err(RecvTimeoutError::Timeout) => return Err(PoolError::ResultTimeout(timeout)),
                // Unreachable while we hold a sender clone; nothing more
                // can arrive either way.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug_assert_eq!(self.merger.buffered(), 0, "merger drained a dense prefix");
        Ok(out)
    }

    /// Number of inputs pushed so far.
    pub fn submitted(&self) -> u64 {
        self.next_index
    }

    fn absorb(&mut self, result: TaskResult<R>, out: &mut Vec<Emission<R>>) {
        self.received += 1;
        let mut ready = Vec::new();
        self.merger.push(result, &mut ready);
        for r in ready {
            match r.outcome {
                Ok(Some(value)) => out.push(Emission::Value { index: r.index, value }),
                Ok(None) => {}
                Err(error) => out.push(Emission::Error(TaskError { index: r.index, error })),
            }
        }
    }
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Begins a submission: binds `work` for the lifetime of this
    /// invocation and opens its private result channel.
    ///
    /// Fails with [`PoolError::Closed`] after [`close`](WorkerPool::close).
    pub fn submission<F>(
        &self,
        work: F,
        opts: RunOptions,
    ) -> Result<Submission<'_, T, R>, PoolError>
    where
        F: Fn(T) -> anyhow::Result<Option<R>> + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        let channel = if opts.wait_for_results {
            Some(unbounded())
        } else {
            None
        };
        Ok(Submission {
            pool: self,
            work: Arc::new(work),
            next_index: 0,
            received: 0,
            merger: Merger::new(opts.sorted),
            channel,
        })
    }

    /// Maps `work` over `inputs` with default options: wait for results,
    /// deliver in input order.
    pub fn run<I, F>(&self, inputs: I, work: F) -> Result<RunOutput<R>, PoolError>
    where
        I: IntoIterator<Item = T>,
        F: Fn(T) -> anyhow::Result<Option<R>> + Send + Sync + 'static,
    {
        self.run_with(inputs, work, RunOptions::default())
    }

    /// Maps `work` over `inputs`, submitting every item and finishing, and
    /// folds the emissions into a [`RunOutput`].
    pub fn run_with<I, F>(
        &self,
        inputs: I,
        work: F,
        opts: RunOptions,
    ) -> Result<RunOutput<R>, PoolError>
    where
        I: IntoIterator<Item = T>,
        F: Fn(T) -> anyhow::Result<Option<R>> + Send + Sync + 'static,
    {
        let waited = opts.wait_for_results;
        let mut submission = self.submission(work, opts)?;

        let mut emissions = Vec::new();
        let mut submitted: u64 = 0;
        for item in inputs {
            emissions.extend(submission.push(item)?);
            submitted += 1;
        }
        emissions.extend(submission.finish()?);

        let mut output = RunOutput::default();
        for emission in emissions {
            match emission {
                Emission::Value { value, .. } => output.values.push(value),
                Emission::Error(error) => output.errors.push(error),
            }
        }
        if waited {
            output.suppressed =
                submitted - (output.values.len() + output.errors.len()) as u64;
        }
        Ok(output)
    }
}

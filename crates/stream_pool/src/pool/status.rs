//! Worker status tracking for the admission policy.
//!
//! Each live worker keeps one entry on the shared [`StatusBoard`], flipping
//! between `Idle` and `Busy` around every task. The board feeds exactly one
//! decision: whether a push should start another worker. It is not on the
//! correctness path (results flow through channels regardless of what the
//! board says), so readers tolerate slightly stale snapshots.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

thread_local! {
    /// Thread-local worker ID.
    ///
    /// Each worker thread stores its pool-assigned ID here when spawned, so
    /// work and init closures can identify the worker they run on for
    /// debugging and error messages.
    pub static WORKER_ID: RefCell<usize> = RefCell::new(usize::MAX);
}

/// ID of the worker thread this code runs on, or `None` outside a worker.
pub fn current_worker_id() -> Option<usize> {
    WORKER_ID.with(|id| {
        let id = *id.borrow();
        (id != usize::MAX).then_some(id)
    })
}

/// What a worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerState {
    /// Blocked on the input channel, ready to absorb new work.
    Idle,
    /// Running the work function on a task.
    Busy,
}

/// Shared map of live workers and their states.
///
/// The idle count is mirrored into an atomic so the admission fast path can
/// read it without taking the map lock; the map itself holds the per-worker
/// entries.
pub(crate) struct StatusBoard {
    idle: AtomicUsize,
    states: Mutex<HashMap<usize, WorkerState>>,
}

impl StatusBoard {
    pub(crate) fn new() -> Self {
        Self {
            idle: AtomicUsize::new(0),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a worker in `Idle` state. Called by the worker itself on start.
    pub(crate) fn register(&self, worker_id: usize) {
        let mut states = self.states.lock().expect("status mutex poisoned");
        let previous = states.insert(worker_id, WorkerState::Idle);
        debug_assert!(previous.is_none(), "worker id reused while live");
        self.idle.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn set_busy(&self, worker_id: usize) {
        self.transition(worker_id, WorkerState::Busy);
    }

    pub(crate) fn set_idle(&self, worker_id: usize) {
        self.transition(worker_id, WorkerState::Idle);
    }

    fn transition(&self, worker_id: usize, next: WorkerState) {
        let mut states = self.states.lock().expect("status mutex poisoned");
        if let Some(state) = states.get_mut(&worker_id) {
            match (*state, next) {
                (WorkerState::Idle, WorkerState::Busy) => {
                    self.idle.fetch_sub(1, Ordering::SeqCst);
                }
                (WorkerState::Busy, WorkerState::Idle) => {
                    self.idle.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
            *state = next;
        }
    }

    /// Removes a worker's entry. Called by the worker on exit, whether from
    /// shutdown or an initialization failure.
    pub(crate) fn retire(&self, worker_id: usize) {
        let mut states = self.states.lock().expect("status mutex poisoned");
        if let Some(WorkerState::Idle) = states.remove(&worker_id) {
            self.idle.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Number of workers currently idle. Lock-free; may be momentarily
    /// stale, which the admission policy tolerates by rechecking under its
    /// own mutex.
    pub(crate) fn idle_count(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }

    /// Number of live workers (registered and not yet retired).
    pub(crate) fn live_count(&self) -> usize {
        self.states.lock().expect("status mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_count_follows_transitions() {
        let board = StatusBoard::new();
        board.register(0);
        board.register(1);
        assert_eq!(board.idle_count(), 2);

        board.set_busy(0);
        assert_eq!(board.idle_count(), 1);

        // Repeated transitions to the same state must not skew the counter.
        board.set_busy(0);
        assert_eq!(board.idle_count(), 1);

        board.set_idle(0);
        assert_eq!(board.idle_count(), 2);

        board.retire(1);
        assert_eq!(board.idle_count(), 1);
        assert_eq!(board.live_count(), 1);
    }

    #[test]
    fn retire_while_busy_keeps_counter_consistent() {
        let board = StatusBoard::new();
        board.register(7);
        board.set_busy(7);
        board.retire(7);
        assert_eq!(board.idle_count(), 0);
        assert_eq!(board.live_count(), 0);
    }
}

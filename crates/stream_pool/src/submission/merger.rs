//! Reordering buffer for in-order result delivery.
//!
//! Workers finish tasks in any order, so results can arrive out of order.
//! The merger buffers results keyed by input index and releases the longest
//! contiguous prefix. With sorting disabled it is a pass-through.

use std::collections::BTreeMap;

use crate::task::TaskResult;

/// Buffers out-of-order results and emits them in strict ascending index
/// order, no gaps, no duplicates.
///
/// The buffer is bounded in practice by the maximum out-of-order distance
/// between workers: with N workers at most N-1 results can be stuck waiting
/// for a slow predecessor.
pub(crate) struct Merger<R> {
    sorted: bool,
    next_emit: u64,
    pending: BTreeMap<u64, TaskResult<R>>,
}

impl<R> Merger<R> {
    pub(crate) fn new(sorted: bool) -> Self {
        Self {
            sorted,
            next_emit: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Accepts one result and appends everything now emittable to `ready`.
    ///
    /// Fast path: the next expected index arrives and is emitted without
    /// buffering, followed by any successors it unblocks. Slow path: an
    /// out-of-order result is parked until its predecessors arrive.
    pub(crate) fn push(&mut self, result: TaskResult<R>, ready: &mut Vec<TaskResult<R>>) {
        if !self.sorted {
            ready.push(result);
            return;
        }

        if result.index == self.next_emit {
            self.next_emit += 1;
            ready.push(result);
            while let Some(buffered) = self.pending.remove(&self.next_emit) {
                self.next_emit += 1;
                ready.push(buffered);
            }
        } else {
            debug_assert!(result.index > self.next_emit, "duplicate result index");
            self.pending.insert(result.index, result);
        }
    }

    /// Number of results parked waiting for a predecessor.
    pub(crate) fn buffered(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn value(index: u64) -> TaskResult<u64> {
        TaskResult {
            index,
            outcome: Ok(Some(index * 10)),
        }
    }

    fn emitted_indices(ready: &[TaskResult<u64>]) -> Vec<u64> {
        ready.iter().map(|r| r.index).collect()
    }

    #[test]
    fn in_order_results_pass_straight_through() {
        let mut merger = Merger::new(true);
        let mut ready = Vec::new();
        for i in 0..4 {
            merger.push(value(i), &mut ready);
        }
        assert_eq!(emitted_indices(&ready), vec![0, 1, 2, 3]);
        assert_eq!(merger.buffered(), 0);
    }

    #[test]
    fn gap_buffers_until_predecessor_arrives() {
        let mut merger = Merger::new(true);
        let mut ready = Vec::new();

        merger.push(value(2), &mut ready);
        merger.push(value(1), &mut ready);
        assert!(ready.is_empty());
        assert_eq!(merger.buffered(), 2);

        merger.push(value(0), &mut ready);
        assert_eq!(emitted_indices(&ready), vec![0, 1, 2]);
        assert_eq!(merger.buffered(), 0);
    }

    #[test]
    fn interleaved_gaps_release_prefixes_only() {
        let mut merger = Merger::new(true);
        let mut ready = Vec::new();

        merger.push(value(1), &mut ready);
        merger.push(value(3), &mut ready);
        merger.push(value(0), &mut ready);
        assert_eq!(emitted_indices(&ready), vec![0, 1]);
        assert_eq!(merger.buffered(), 1);

        merger.push(value(2), &mut ready);
        assert_eq!(emitted_indices(&ready), vec![0, 1, 2, 3]);
    }

    #[test]
    fn errors_hold_their_position() {
        let mut merger = Merger::new(true);
        let mut ready = Vec::new();

        merger.push(
            TaskResult {
                index: 1,
                outcome: Err(anyhow!("boom")),
            },
            &mut ready,
        );
        merger.push(value(0), &mut ready);

        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].index, 0);
        assert!(ready[0].outcome.is_ok());
        assert_eq!(ready[1].index, 1);
        assert!(ready[1].outcome.is_err());
    }

    #[test]
    fn unsorted_is_a_pass_through() {
        let mut merger = Merger::new(false);
        let mut ready = Vec::new();
        merger.push(value(5), &mut ready);
        merger.push(value(0), &mut ready);
        assert_eq!(emitted_indices(&ready), vec![5, 0]);
        assert_eq!(merger.buffered(), 0);
    }
}

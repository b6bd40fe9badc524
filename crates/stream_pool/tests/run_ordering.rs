//! Ordering guarantees under out-of-order completion.
//!
//! Work functions sleep for random amounts so completion order genuinely
//! diverges from input order, then the tests check that sorted submissions
//! restore input order while unsorted ones deliver a permutation.

mod common;
use common::slow_identity;

use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::Rng;
use stream_pool::{PoolConfig, RunOptions, WorkerPool};

fn jittered_identity(max_ms: u64) -> impl Fn(u64) -> Result<Option<u64>> + Send + Sync + 'static {
    move |x| {
        let delay = rand::rng().random_range(0..max_ms);
        std::thread::sleep(Duration::from_millis(delay));
        Ok(Some(x))
    }
}

#[test]
fn sorted_output_restores_input_order() -> Result<()> {
    let pool: WorkerPool<u64, u64> = WorkerPool::new(PoolConfig::builder().workers(10).build());

    let out = pool.run(1..=10, jittered_identity(50))?;
    assert_eq!(out.values, (1..=10).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn unsorted_output_is_a_permutation_of_the_input() -> Result<()> {
    let pool: WorkerPool<u64, u64> = WorkerPool::new(PoolConfig::builder().workers(10).build());

    let out = pool.run_with(
        1..=10,
        jittered_identity(50),
        RunOptions::default().sorted(false),
    )?;

    assert_eq!(out.values.len(), 10);
    let mut seen = out.values.clone();
    seen.sort_unstable();
    assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn combined_stream_emits_indices_in_ascending_order() -> Result<()> {
    let pool: WorkerPool<u64, u64> = WorkerPool::new(PoolConfig::builder().workers(8).build());

    let mut submission = pool.submission(
        |x| {
            let delay = rand::rng().random_range(0..20);
            std::thread::sleep(Duration::from_millis(delay));
            if x % 7 == 3 {
                Err(anyhow!("refused"))
            } else {
                Ok(Some(x))
            }
        },
        RunOptions::default(),
    )?;

    let mut indices = Vec::new();
    for x in 0..60 {
        for emission in submission.push(x)? {
            indices.push(emission.index());
        }
    }
    for emission in submission.finish()? {
        indices.push(emission.index());
    }

    // Values and errors together must form a strictly ascending sequence.
    assert!(indices.windows(2).all(|w| w[0] < w[1]));
    Ok(())
}

#[test]
fn suppressed_results_do_not_stall_ordering() -> Result<()> {
    let pool: WorkerPool<u64, u64> = WorkerPool::new(PoolConfig::builder().workers(6).build());

    let out = pool.run(0..40, |x| {
        let delay = rand::rng().random_range(0..15);
        std::thread::sleep(Duration::from_millis(delay));
        if x % 2 == 1 {
            Ok(None)
        } else {
            Ok(Some(x))
        }
    })?;

    assert_eq!(out.values, (0..40).filter(|x| x % 2 == 0).collect::<Vec<_>>());
    assert_eq!(out.suppressed, 20);
    Ok(())
}

#[test]
fn uniform_work_still_finishes_in_input_order() -> Result<()> {
    let pool: WorkerPool<u64, u64> = WorkerPool::new(PoolConfig::builder().workers(4).build());

    let out = pool.run(0..30, slow_identity(Duration::from_millis(3)))?;
    assert_eq!(out.values, (0..30).collect::<Vec<_>>());
    Ok(())
}

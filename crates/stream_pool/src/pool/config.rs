//! Configuration for pool behaviour.
//!
//! The `PoolConfig` struct stores the parameters that control how a
//! [`WorkerPool`](super::WorkerPool) runs work.
//!
//! Example:
//! ```ignore
//! let config = PoolConfig::builder()
//!     .workers(8)
//!     .timeout(Duration::from_secs(10))
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `workers`: more workers raise throughput for slow work functions but
//!   each one holds a thread; workers only start when pushes find nobody
//!   idle, so an oversized cap costs nothing until the load needs it
//! - `worker_poll`: lower values make shutdown more responsive at the cost
//!   of idle wakeups

use std::time::Duration;

/// Configuration for a worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of parallel workers. A requested value of 0 is
    /// normalized to 1 when the pool is created.
    pub workers: usize,
    /// Maximum time a finishing submission waits for the next result.
    /// If exceeded, finishing fails (assuming workers are stuck or the
    /// work was abandoned by shutdown). Default: 30s.
    pub timeout: Duration,
    /// How often idle workers check for the shutdown signal.
    /// Not an error timeout - just a polling interval. Default: 100ms.
    pub worker_poll: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            timeout: Duration::from_secs(30),
            worker_poll: Duration::from_millis(100),
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }
}

/// Builder for PoolConfig with method chaining
#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    /// Set the worker cap. 0 is accepted and normalized to 1.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the timeout for waiting on results.
    ///
    /// - Too low: may abort submissions whose work is legitimately slow
    /// - Too high: delays detection of a pool whose workers all died
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the worker polling interval
    ///
    /// - Too low: more responsive shutdown, higher idle CPU usage
    /// - Too high: less overhead, slower shutdown response
    pub fn worker_poll(mut self, worker_poll: Duration) -> Self {
        self.config.worker_poll = worker_poll;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PoolConfig {
        self.config
    }
}

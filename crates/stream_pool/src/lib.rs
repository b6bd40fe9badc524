pub mod error;
pub mod pool;
pub mod submission;
pub mod task;

pub use error::{PoolError, TaskError};
pub use pool::{current_worker_id, PoolConfig, WorkerPool};
pub use submission::{Emission, RunOptions, RunOutput, Submission};
pub use task::{InitFn, WorkFn};

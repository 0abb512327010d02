//! Job queue, worker pool, the fixed-interval scheduler tick, and the
//! startup recovery sweep for conversations stuck in `EVALUATING`.

pub mod jobs;
pub mod recovery;
pub mod tick;
pub mod worker_pool;

pub use jobs::Job;
pub use recovery::sweep_stuck_evaluating;
pub use worker_pool::WorkerPool;

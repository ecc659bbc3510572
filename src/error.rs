//! Error type shared by the checked entry points

use thiserror::Error;

/// Errors that can occur while building teams, partitions or running checked reductions
#[derive(Error, Debug)]
pub enum ParallelError {
    #[error("operation requires at least one worker, got 0")]
    NoWorkers,

    #[error("cannot partition {size} items across {num_workers} workers")]
    InvalidPartition { size: usize, num_workers: usize },

    #[error("failed to build rayon thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

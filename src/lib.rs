//! parfor: predictable fork/join parallel loops
//!
//! This crate partitions an index range `[0, size)` into contiguous,
//! near-equal chunks, runs a per-index function on a bounded team of workers
//! and optionally reduces the per-worker partial results in a fixed order.
//! There is no dynamic scheduling or work-stealing: worker `m` of `n` always
//! owns `[size * m / n, size * (m + 1) / n)`.

pub mod config;
pub mod error;
pub mod parallel_for;
pub mod partition;
pub mod reduce;
pub mod team;

// Re-export main types at crate root
pub use config::{ParallelConfig, DEFAULT_MIN_SIZE};
pub use error::ParallelError;
pub use parallel_for::{Dispatch, ParallelFor};
pub use partition::{chunk_bounds, chunk_end, chunk_start, Chunk, Partition};
pub use reduce::{reducer, FnReducer, Reducer, Sum};
pub use team::{RayonTeam, ScopedTeam, SequentialTeam, Team, WorkerContext};

//! Worker teams for fork/join regions
//!
//! A [`Team`] runs one parallel region: it starts a bounded number of workers,
//! tells each worker the team size and its own zero-based index, and returns
//! only after every worker has finished. Three backends are provided:
//!
//! - [`ScopedTeam`] spawns OS threads with `std::thread::scope` for every region
//! - [`RayonTeam`] borrows workers from a rayon thread pool
//! - [`SequentialTeam`] runs every worker in order on the calling thread
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use parfor::{ScopedTeam, Team};
//!
//! let visits = AtomicUsize::new(0);
//! ScopedTeam.run_region(4, |ctx| {
//!     assert_eq!(ctx.num_workers, 4);
//!     visits.fetch_add(1, Ordering::Relaxed);
//! });
//! assert_eq!(visits.load(Ordering::Relaxed), 4);
//! ```

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::ParallelError;

/// What a worker knows about itself inside a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerContext {
    /// Number of workers actually running in this region
    pub num_workers: usize,

    /// Zero-based index of this worker
    pub index: usize,
}

/// A thread-parallel execution runtime
///
/// Implementors must run `body` exactly once per worker index in
/// `0..num_workers`, each call seeing the same `num_workers`, and must not
/// return before all calls have completed. A panic inside `body` is not
/// recovered; it surfaces on the calling thread once the region has joined.
pub trait Team: Sync {
    /// Number of workers a region asking for `requested` workers will get
    ///
    /// The result never exceeds `requested`.
    fn team_size(&self, requested: usize) -> usize;

    /// Run `body` on `num_workers` workers and wait for all of them
    ///
    /// `num_workers` should come from [`Team::team_size`]; a value of zero
    /// runs nothing.
    fn run_region<F>(&self, num_workers: usize, body: F)
    where
        F: Fn(WorkerContext) + Sync;
}

impl<T: Team> Team for &T {
    fn team_size(&self, requested: usize) -> usize {
        (**self).team_size(requested)
    }

    fn run_region<F>(&self, num_workers: usize, body: F)
    where
        F: Fn(WorkerContext) + Sync,
    {
        (**self).run_region(num_workers, body)
    }
}

/// Spawns a fresh set of scoped OS threads for every region
///
/// The calling thread doubles as worker 0, so a region of `n` workers spawns
/// `n - 1` threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopedTeam;

impl Team for ScopedTeam {
    fn team_size(&self, requested: usize) -> usize {
        requested
    }

    fn run_region<F>(&self, num_workers: usize, body: F)
    where
        F: Fn(WorkerContext) + Sync,
    {
        if num_workers == 0 {
            return;
        }

        let body = &body;
        std::thread::scope(|scope| {
            for index in 1..num_workers {
                scope.spawn(move || body(WorkerContext { num_workers, index }));
            }
            body(WorkerContext {
                num_workers,
                index: 0,
            });
        });
    }
}

/// Borrows workers from a rayon thread pool
///
/// The team is clamped to the pool's thread count so every worker of a region
/// can run at the same time.
#[derive(Debug, Default)]
pub struct RayonTeam {
    /// Dedicated pool, or `None` for rayon's global pool
    pool: Option<ThreadPool>,
}

impl RayonTeam {
    /// Use rayon's global thread pool
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Build a dedicated pool with `num_threads` threads
    pub fn with_threads(num_threads: usize) -> Result<Self, ParallelError> {
        if num_threads == 0 {
            return Err(ParallelError::NoWorkers);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("parfor-worker-{index}"))
            .build()?;
        debug!(num_threads, "built dedicated rayon pool");

        Ok(Self { pool: Some(pool) })
    }

    /// Use an existing pool
    pub fn from_pool(pool: ThreadPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Number of threads in the underlying pool
    pub fn pool_size(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl Team for RayonTeam {
    fn team_size(&self, requested: usize) -> usize {
        requested.min(self.pool_size())
    }

    fn run_region<F>(&self, num_workers: usize, body: F)
    where
        F: Fn(WorkerContext) + Sync,
    {
        if num_workers == 0 {
            return;
        }

        let body = &body;
        match &self.pool {
            Some(pool) => pool.scope(|scope| spawn_workers(scope, num_workers, body)),
            None => rayon::scope(|scope| spawn_workers(scope, num_workers, body)),
        }
    }
}

fn spawn_workers<'scope, F>(scope: &rayon::Scope<'scope>, num_workers: usize, body: &'scope F)
where
    F: Fn(WorkerContext) + Sync,
{
    for index in 0..num_workers {
        scope.spawn(move |_| body(WorkerContext { num_workers, index }));
    }
}

/// Runs every worker of a region one after another on the calling thread
///
/// Workers see the full requested team size, which makes chunked code paths
/// reproducible under a debugger.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialTeam;

impl Team for SequentialTeam {
    fn team_size(&self, requested: usize) -> usize {
        requested
    }

    fn run_region<F>(&self, num_workers: usize, body: F)
    where
        F: Fn(WorkerContext) + Sync,
    {
        for index in 0..num_workers {
            body(WorkerContext { num_workers, index });
        }
    }
}

//! Fork/join parallel-for and two-phase reduction
//!
//! [`ParallelFor`] splits `[0, size)` into one contiguous chunk per worker and
//! calls a per-index function `f(n, m, i)` where `n` is the number of active
//! workers, `m` the worker index and `i` the item index. Extra arguments are
//! carried by closure capture.
//!
//! Dispatch rules:
//!
//! | Requested workers | Size            | Behaviour                           |
//! |-------------------|-----------------|-------------------------------------|
//! | 0                 | any             | nothing runs, reductions are empty  |
//! | 1                 | any             | sequential on worker `(1, 0)`       |
//! | > 1               | `< min_size`    | sequential on worker `(1, 0)`       |
//! | > 1               | `>= min_size`   | one chunk per worker of the team    |
//!
//! Reductions run in two phases. Every worker folds its own chunk in
//! increasing index order into a private accumulator seeded with the identity,
//! then the calling thread folds the partial results in increasing worker
//! order. The result is deterministic for a fixed worker count but may differ
//! across worker counts when the operator is not exactly associative.
//!
//! The per-index function must not panic. A panic is not recovered: the
//! region still joins and the panic resurfaces on the calling thread.
//!
//! # Example
//!
//! ```
//! use parfor::{ParallelFor, Sum};
//!
//! let pf = ParallelFor::with_min_size(16);
//! let total: u64 = pf.run_reduce(4, 100, |_, _, i| i as u64, &Sum);
//! assert_eq!(total, 4950);
//! ```

use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace};

use crate::config::ParallelConfig;
use crate::error::ParallelError;
use crate::partition::{chunk_bounds, Partition};
use crate::reduce::Reducer;
use crate::team::{ScopedTeam, Team, WorkerContext};

/// How a call will be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Zero workers were requested; nothing runs
    Idle,

    /// The whole range runs on the calling thread as worker `(1, 0)`
    Sequential,

    /// The range is split across `workers` workers
    Parallel { workers: usize },
}

impl Dispatch {
    /// Number of partial results a reduction produces
    pub fn num_workers(&self) -> usize {
        match self {
            Dispatch::Idle => 0,
            Dispatch::Sequential => 1,
            Dispatch::Parallel { workers } => *workers,
        }
    }

    /// Returns true if the call fans out to a team
    pub fn is_parallel(&self) -> bool {
        matches!(self, Dispatch::Parallel { .. })
    }
}

/// Parallel loop and reduction executor
///
/// Stateless between calls; every method is re-entrant.
#[derive(Debug, Clone, Default)]
pub struct ParallelFor<T = ScopedTeam> {
    config: ParallelConfig,
    team: T,
}

impl ParallelFor<ScopedTeam> {
    /// Executor with default configuration on scoped OS threads
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor with a custom sequential threshold on scoped OS threads
    pub fn with_min_size(min_size: usize) -> Self {
        Self::with_config(ParallelConfig::with_min_size(min_size))
    }

    /// Executor with the given configuration on scoped OS threads
    pub fn with_config(config: ParallelConfig) -> Self {
        Self {
            config,
            team: ScopedTeam,
        }
    }
}

impl<T: Team> ParallelFor<T> {
    /// Executor running regions on `team`
    pub fn with_team(config: ParallelConfig, team: T) -> Self {
        Self { config, team }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    pub fn team(&self) -> &T {
        &self.team
    }

    pub fn min_size(&self) -> usize {
        self.config.min_size
    }

    /// Decide how a call with `num_threads` workers over `size` items runs
    pub fn dispatch(&self, num_threads: usize, size: usize) -> Dispatch {
        if num_threads == 0 {
            return Dispatch::Idle;
        }
        if num_threads == 1 || size < self.config.min_size {
            return Dispatch::Sequential;
        }

        let requested = self.config.clamp_workers(num_threads);
        let workers = self.team.team_size(requested).max(1);
        Dispatch::Parallel { workers }
    }

    /// First index owned by worker `thread_id` of `num_threads`
    ///
    /// Below the threshold every worker starts at 0.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is zero and `size >= min_size`.
    pub fn index0(&self, size: usize, num_threads: usize, thread_id: usize) -> usize {
        if size >= self.config.min_size {
            chunk_bounds(size, num_threads, thread_id).start
        } else {
            0
        }
    }

    /// One past the last index owned by worker `thread_id` of `num_threads`
    ///
    /// Below the threshold every worker ends at `size`.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is zero and `size >= min_size`.
    pub fn index1(&self, size: usize, num_threads: usize, thread_id: usize) -> usize {
        if size >= self.config.min_size {
            chunk_bounds(size, num_threads, thread_id).end
        } else {
            size
        }
    }

    /// Call `func(n, m, i)` once for every `i` in `[0, size)`
    ///
    /// A request for zero workers is a no-op.
    pub fn run<F>(&self, num_threads: usize, size: usize, func: F)
    where
        F: Fn(usize, usize, usize) + Sync,
    {
        match self.dispatch(num_threads, size) {
            Dispatch::Idle => {
                debug!(size, "no workers requested, skipping loop");
            }
            Dispatch::Sequential => {
                debug!(
                    size,
                    num_threads,
                    min_size = self.config.min_size,
                    "running loop sequentially"
                );
                for i in 0..size {
                    func(1, 0, i);
                }
            }
            Dispatch::Parallel { workers } => {
                debug!(size, num_threads, workers, "running loop in parallel");
                self.team.run_region(workers, |ctx| {
                    let chunk = chunk_bounds(size, ctx.num_workers, ctx.index);
                    trace!(
                        worker = ctx.index,
                        start = chunk.start,
                        end = chunk.end,
                        "worker chunk"
                    );
                    for i in chunk.indices() {
                        func(ctx.num_workers, ctx.index, i);
                    }
                });
            }
        }
    }

    /// Fold each worker's chunk into one partial result per worker
    ///
    /// The returned vector is indexed by worker and has one entry per active
    /// worker: empty for zero requested workers, a single entry when the call
    /// falls back to sequential execution.
    pub fn run_reduce_partial<F, V, R>(
        &self,
        num_threads: usize,
        size: usize,
        func: F,
        reducer: &R,
    ) -> Vec<V>
    where
        F: Fn(usize, usize, usize) -> V + Sync,
        R: Reducer<V>,
        V: Send,
    {
        match self.dispatch(num_threads, size) {
            Dispatch::Idle => {
                debug!(size, "no workers requested, no partial results");
                Vec::new()
            }
            Dispatch::Sequential => {
                debug!(
                    size,
                    num_threads,
                    min_size = self.config.min_size,
                    "reducing sequentially"
                );
                let partial = (0..size).fold(reducer.identity(), |acc, i| {
                    reducer.combine(acc, func(1, 0, i))
                });
                vec![partial]
            }
            Dispatch::Parallel { workers } => {
                debug!(size, num_threads, workers, "reducing in parallel");
                let slots: Vec<Mutex<Option<V>>> =
                    (0..workers).map(|_| Mutex::new(None)).collect();

                self.team.run_region(workers, |ctx| {
                    let chunk = chunk_bounds(size, ctx.num_workers, ctx.index);
                    trace!(
                        worker = ctx.index,
                        start = chunk.start,
                        end = chunk.end,
                        "worker chunk"
                    );
                    let partial = chunk.indices().fold(reducer.identity(), |acc, i| {
                        reducer.combine(acc, func(ctx.num_workers, ctx.index, i))
                    });
                    if let Some(slot) = slots.get(ctx.index) {
                        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(partial);
                    }
                });

                slots
                    .into_iter()
                    .map(|slot| {
                        slot.into_inner()
                            .unwrap_or_else(PoisonError::into_inner)
                            .unwrap_or_else(|| reducer.identity())
                    })
                    .collect()
            }
        }
    }

    /// Reduce `func(n, m, i)` over `[0, size)` into a single value
    ///
    /// Partial results are folded in increasing worker order. A request for
    /// zero workers yields the identity; use [`ParallelFor::try_run_reduce`]
    /// to reject it instead.
    pub fn run_reduce<F, V, R>(&self, num_threads: usize, size: usize, func: F, reducer: &R) -> V
    where
        F: Fn(usize, usize, usize) -> V + Sync,
        R: Reducer<V>,
        V: Send,
    {
        let partials = self.run_reduce_partial(num_threads, size, func, reducer);
        reducer.fold(partials)
    }

    /// Like [`ParallelFor::run_reduce`] but fails when zero workers are requested
    pub fn try_run_reduce<F, V, R>(
        &self,
        num_threads: usize,
        size: usize,
        func: F,
        reducer: &R,
    ) -> Result<V, ParallelError>
    where
        F: Fn(usize, usize, usize) -> V + Sync,
        R: Reducer<V>,
        V: Send,
    {
        if num_threads == 0 {
            return Err(ParallelError::NoWorkers);
        }
        Ok(self.run_reduce(num_threads, size, func, reducer))
    }

    /// Write `func(n, m, i)` into `out[i]` for every slot of `out`
    ///
    /// The slice is split along the same chunk boundaries as [`ParallelFor::run`],
    /// so each worker writes only its own disjoint sub-slice.
    pub fn run_map_into<F, V>(&self, num_threads: usize, out: &mut [V], func: F)
    where
        F: Fn(usize, usize, usize) -> V + Sync,
        V: Send,
    {
        let size = out.len();
        match self.dispatch(num_threads, size) {
            Dispatch::Idle => {
                debug!(size, "no workers requested, leaving output untouched");
            }
            Dispatch::Sequential => {
                for (i, slot) in out.iter_mut().enumerate() {
                    *slot = func(1, 0, i);
                }
            }
            Dispatch::Parallel { workers } => {
                debug!(size, num_threads, workers, "mapping in parallel");
                let partition = match Partition::new(size, workers) {
                    Ok(partition) => partition,
                    Err(_) => return,
                };
                let pieces = split_by_partition(out, &partition);

                self.team.run_region(workers, |ctx| {
                    let start = chunk_bounds(size, ctx.num_workers, ctx.index).start;
                    let Some(piece) = pieces.get(ctx.index) else {
                        return;
                    };
                    let mut piece = piece.lock().unwrap_or_else(PoisonError::into_inner);
                    for (offset, slot) in piece.iter_mut().enumerate() {
                        *slot = func(ctx.num_workers, ctx.index, start + offset);
                    }
                });
            }
        }
    }

    /// The chunk `ctx` would process for a problem of `size` items
    pub fn chunk_for(&self, size: usize, ctx: WorkerContext) -> std::ops::Range<usize> {
        let start = self.index0(size, ctx.num_workers, ctx.index);
        let end = self.index1(size, ctx.num_workers, ctx.index);
        start..end
    }
}

fn split_by_partition<'a, V>(
    mut out: &'a mut [V],
    partition: &Partition,
) -> Vec<Mutex<&'a mut [V]>> {
    let mut pieces = Vec::with_capacity(partition.num_chunks());
    for chunk in partition {
        let (head, tail) = std::mem::take(&mut out).split_at_mut(chunk.len());
        pieces.push(Mutex::new(head));
        out = tail;
    }
    pieces
}

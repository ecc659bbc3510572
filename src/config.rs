//! Dispatch configuration
//!
//! The only tunables are the problem size below which work stays on the
//! calling thread and an optional cap on the number of workers. Both are fixed
//! when a [`ParallelFor`](crate::ParallelFor) is built.

use tracing::warn;

/// Problem size below which dispatch runs sequentially
pub const DEFAULT_MIN_SIZE: usize = 1024;

/// Environment variable overriding [`ParallelConfig::min_size`]
pub const MIN_SIZE_ENV: &str = "PARFOR_MIN_SIZE";

/// Environment variable setting [`ParallelConfig::max_workers`]
pub const MAX_WORKERS_ENV: &str = "PARFOR_MAX_WORKERS";

/// Configuration for parallel dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Problems smaller than this run on a single synthetic worker
    /// Default: 1024
    pub min_size: usize,

    /// Upper bound on workers per region, applied before the team clamps
    /// Default: None (no cap)
    pub max_workers: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            max_workers: None,
        }
    }
}

impl ParallelConfig {
    /// Create a configuration with the given sequential threshold
    pub fn with_min_size(min_size: usize) -> Self {
        Self {
            min_size,
            ..Default::default()
        }
    }

    /// Cap the number of workers per region
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Read overrides from `PARFOR_MIN_SIZE` and `PARFOR_MAX_WORKERS`
    ///
    /// Unset variables keep their defaults. Unparseable values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ParallelConfig::from_env`] but reads variables through `lookup`
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(min_size) = parse_var(&lookup, MIN_SIZE_ENV) {
            config.min_size = min_size;
        }
        if let Some(max_workers) = parse_var(&lookup, MAX_WORKERS_ENV) {
            if max_workers == 0 {
                warn!(var = MAX_WORKERS_ENV, "ignoring zero worker cap");
            } else {
                config.max_workers = Some(max_workers);
            }
        }

        config
    }

    /// Apply the worker cap to a requested team size
    pub fn clamp_workers(&self, requested: usize) -> usize {
        match self.max_workers {
            Some(max) => requested.min(max),
            None => requested,
        }
    }
}

fn parse_var<L>(lookup: &L, key: &str) -> Option<usize>
where
    L: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(var = key, value = %raw, error = %err, "ignoring invalid value");
            None
        }
    }
}

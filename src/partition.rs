//! Contiguous chunk arithmetic for fork/join dispatch
//!
//! Splits the index range `[0, size)` into one contiguous chunk per worker.
//! Worker `m` of `n` owns `[size * m / n, size * (m + 1) / n)`. Every boundary
//! is computed from scratch rather than by a running sum, so chunk lengths
//! differ by at most one and there is no rounding drift.

use std::ops::Range;

use crate::error::ParallelError;

/// A half-open index range `[start, end)` owned by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    /// Returns the number of indices in this chunk
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this chunk has no indices
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the indices of this chunk in increasing order
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns true if `index` falls inside this chunk
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

impl From<Chunk> for Range<usize> {
    fn from(chunk: Chunk) -> Self {
        chunk.indices()
    }
}

/// First index owned by `worker` out of `num_workers`
///
/// The product `size * worker` is widened to 128 bits so large sizes cannot
/// overflow.
///
/// # Panics
///
/// Panics if `num_workers` is zero.
#[inline]
pub fn chunk_start(size: usize, num_workers: usize, worker: usize) -> usize {
    assert!(num_workers > 0, "num_workers must be greater than 0");
    ((size as u128 * worker as u128) / num_workers as u128) as usize
}

/// One past the last index owned by `worker` out of `num_workers`
///
/// # Panics
///
/// Panics if `num_workers` is zero.
#[inline]
pub fn chunk_end(size: usize, num_workers: usize, worker: usize) -> usize {
    chunk_start(size, num_workers, worker + 1)
}

/// The chunk owned by `worker` out of `num_workers`
///
/// Workers past the end of the team (`worker >= num_workers`) get an empty
/// chunk at `size`.
///
/// # Panics
///
/// Panics if `num_workers` is zero.
#[inline]
pub fn chunk_bounds(size: usize, num_workers: usize, worker: usize) -> Chunk {
    if worker >= num_workers {
        assert!(num_workers > 0, "num_workers must be greater than 0");
        return Chunk {
            start: size,
            end: size,
        };
    }
    Chunk {
        start: chunk_start(size, num_workers, worker),
        end: chunk_end(size, num_workers, worker),
    }
}

/// The full set of chunks for one `(size, num_workers)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Total number of items being partitioned
    pub size: usize,

    /// Number of workers (and chunks)
    pub num_workers: usize,

    /// The chunks, indexed by worker
    pub chunks: Vec<Chunk>,
}

impl Partition {
    /// Partition `[0, size)` across `num_workers` workers
    ///
    /// When `num_workers > size` the trailing workers receive empty chunks.
    ///
    /// # Example
    ///
    /// ```
    /// use parfor::Partition;
    ///
    /// let partition = Partition::new(10, 4).unwrap();
    /// assert_eq!(partition.chunk_lens(), vec![2, 3, 2, 3]);
    /// ```
    pub fn new(size: usize, num_workers: usize) -> Result<Self, ParallelError> {
        if num_workers == 0 {
            return Err(ParallelError::InvalidPartition { size, num_workers });
        }

        let chunks = (0..num_workers)
            .map(|worker| chunk_bounds(size, num_workers, worker))
            .collect();

        Ok(Self {
            size,
            num_workers,
            chunks,
        })
    }

    /// Returns the number of chunks
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the chunk owned by `worker`, if it exists
    pub fn chunk(&self, worker: usize) -> Option<&Chunk> {
        self.chunks.get(worker)
    }

    /// Returns an iterator over the chunks in worker order
    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Returns the length of every chunk in worker order
    pub fn chunk_lens(&self) -> Vec<usize> {
        self.chunks.iter().map(Chunk::len).collect()
    }

    /// Difference between the longest and the shortest chunk
    pub fn max_imbalance(&self) -> usize {
        let lens = self.chunks.iter().map(Chunk::len);
        let max = lens.clone().max().unwrap_or(0);
        let min = lens.min().unwrap_or(0);
        max - min
    }

    /// Returns the worker owning `index`, or `None` if it is out of range
    pub fn owner_of(&self, index: usize) -> Option<usize> {
        if index >= self.size {
            return None;
        }
        // Chunk starts are non-decreasing, so the owner is the last chunk
        // starting at or before `index` that is non-empty.
        let candidate = self.chunks.partition_point(|chunk| chunk.start <= index);
        self.chunks[..candidate]
            .iter()
            .rposition(|chunk| chunk.contains(index))
    }

    /// Verify that all indices from 0 to size-1 are covered exactly once
    #[cfg(test)]
    fn verify_coverage(&self) -> bool {
        let mut seen = vec![false; self.size];
        for chunk in &self.chunks {
            for idx in chunk.indices() {
                if idx >= self.size || seen[idx] {
                    return false;
                }
                seen[idx] = true;
            }
        }
        seen.iter().all(|&b| b)
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let partition = Partition::new(12, 4).unwrap();

        assert_eq!(partition.num_chunks(), 4);
        assert!(partition.verify_coverage());
        assert_eq!(partition.chunks[0], Chunk { start: 0, end: 3 });
        assert_eq!(partition.chunks[1], Chunk { start: 3, end: 6 });
        assert_eq!(partition.chunks[2], Chunk { start: 6, end: 9 });
        assert_eq!(partition.chunks[3], Chunk { start: 9, end: 12 });
        assert_eq!(partition.chunk(1), Some(&Chunk { start: 3, end: 6 }));
        assert_eq!(partition.chunk(4), None);
    }

    #[test]
    fn test_remainder_distribution() {
        // floor(10 * m / 4) = 0, 2, 5, 7, 10
        let partition = Partition::new(10, 4).unwrap();

        assert!(partition.verify_coverage());
        assert_eq!(partition.chunk_lens(), vec![2, 3, 2, 3]);
        assert_eq!(partition.max_imbalance(), 1);
    }

    #[test]
    fn test_more_workers_than_items() {
        let partition = Partition::new(3, 8).unwrap();

        assert!(partition.verify_coverage());
        assert_eq!(partition.num_chunks(), 8);
        assert_eq!(partition.iter().filter(|c| c.is_empty()).count(), 5);
        assert_eq!(partition.iter().map(Chunk::len).sum::<usize>(), 3);
    }

    #[test]
    fn test_empty_problem() {
        let partition = Partition::new(0, 4).unwrap();

        assert!(partition.verify_coverage());
        assert!(partition.iter().all(Chunk::is_empty));
        assert_eq!(partition.max_imbalance(), 0);
    }

    #[test]
    fn test_coverage_exhaustive() {
        for size in [0, 1, 2, 7, 10, 100, 1000, 1023, 1024, 1025] {
            for workers in [1, 2, 3, 4, 7, 8, 16, 33] {
                let partition = Partition::new(size, workers).unwrap();
                assert!(
                    partition.verify_coverage(),
                    "coverage failed for size={}, workers={}",
                    size,
                    workers
                );
                assert!(
                    partition.max_imbalance() <= 1,
                    "imbalance too large for size={}, workers={}",
                    size,
                    workers
                );
            }
        }
    }

    #[test]
    fn test_boundaries_monotonic() {
        let partition = Partition::new(997, 13).unwrap();
        for pair in partition.chunks.windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_large_size_does_not_overflow() {
        let size = usize::MAX - 1;
        let last = chunk_bounds(size, 3, 2);
        assert_eq!(last.end, size);
        assert!(last.start < last.end);
    }

    #[test]
    fn test_worker_out_of_range() {
        let chunk = chunk_bounds(10, 2, 5);
        assert!(chunk.is_empty());
        assert_eq!(chunk.start, 10);
    }

    #[test]
    fn test_owner_of() {
        let partition = Partition::new(10, 4).unwrap();
        assert_eq!(partition.owner_of(0), Some(0));
        assert_eq!(partition.owner_of(1), Some(0));
        assert_eq!(partition.owner_of(2), Some(1));
        assert_eq!(partition.owner_of(9), Some(3));
        assert_eq!(partition.owner_of(10), None);

        let sparse = Partition::new(2, 5).unwrap();
        for index in 0..2 {
            let owner = sparse.owner_of(index).unwrap();
            assert!(sparse.chunks[owner].contains(index));
        }
    }

    #[test]
    fn test_chunk_indices() {
        let chunk = Chunk { start: 5, end: 10 };
        assert_eq!(chunk.indices().collect::<Vec<_>>(), vec![5, 6, 7, 8, 9]);
        assert_eq!(chunk.len(), 5);
        assert!(chunk.contains(5));
        assert!(!chunk.contains(10));
        assert_eq!(Range::from(chunk), 5..10);
    }

    #[test]
    fn test_error_cases() {
        assert!(matches!(
            Partition::new(10, 0),
            Err(ParallelError::InvalidPartition {
                size: 10,
                num_workers: 0
            })
        ));
    }

    #[test]
    #[should_panic(expected = "num_workers must be greater than 0")]
    fn test_zero_workers_panics() {
        chunk_bounds(10, 0, 0);
    }
}

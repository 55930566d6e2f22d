//! Cross-worker minimum reduction.
//!
//! Each worker scans its own range without synchronization and then offers
//! its local minimum to a shared [ReductionState]. The lock is taken once per
//! worker per round and only around an O(1) compare-and-update.

use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::parallel::batch::Range;
use crate::parallel::pool::{OperationKind, WorkerPool};

/// A candidate value and the unit index it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum<V> {
    pub value: V,
    pub index: usize,
}

impl<V: PartialOrd> Extremum<V> {
    /// Whether `self` should replace `other`: strictly smaller value, or an
    /// equal value at a strictly lower index.
    pub fn beats(&self, other: &Self) -> bool {
        self.value < other.value || (self.value == other.value && self.index < other.index)
    }
}

/// The running global minimum of one round.
#[derive(Debug, Default)]
pub struct ReductionState<V> {
    best: Mutex<Option<Extremum<V>>>,
}

impl<V: PartialOrd + Copy> ReductionState<V> {
    pub fn new() -> Self {
        Self {
            best: Mutex::new(None),
        }
    }

    /// Offer a worker's local minimum. Returns true if it became the global one.
    ///
    /// Ties go to the lower index, so the result does not depend on the order
    /// in which workers reach the lock.
    pub fn combine(&self, local: Extremum<V>) -> bool {
        let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        let replace = match &*best {
            None => true,
            Some(current) => local.beats(current),
        };
        if replace {
            *best = Some(local);
        }
        replace
    }

    pub fn get(&self) -> Option<Extremum<V>> {
        *self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_inner(self) -> Option<Extremum<V>> {
        self.best.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Finds the minimum over a range of candidate units.
pub trait ExtremumScan: Sync {
    type Value: PartialOrd + Copy + Send;

    /// The smallest eligible candidate in `range`, or None if none is eligible.
    /// Must prefer the lowest index among equal values.
    fn local_extremum(&self, range: Range) -> Option<Extremum<Self::Value>>;
}

/// Run one reduction phase over `units` candidates and return the global minimum.
pub fn reduce_min<S: ExtremumScan>(
    pool: &WorkerPool,
    units: usize,
    scan: &S,
) -> Result<Option<Extremum<S::Value>>> {
    let state = ReductionState::new();
    pool.run_scan(OperationKind::FindExtremum, units, |range| {
        if let Some(local) = scan.local_extremum(range) {
            state.combine(local);
        }
    })?;
    Ok(state.into_inner())
}

/// Scan `range` for the first index with the strictly smallest key among the
/// indices `eligible` accepts.
pub fn scan_min_by<V, E, K>(range: Range, eligible: E, key: K) -> Option<Extremum<V>>
where
    V: PartialOrd + Copy,
    E: Fn(usize) -> bool,
    K: Fn(usize) -> V,
{
    let mut best: Option<Extremum<V>> = None;
    for index in range.indices() {
        if !eligible(index) {
            continue;
        }
        let value = key(index);
        if best.map_or(true, |b| value < b.value) {
            best = Some(Extremum { value, index });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::parallel::pool::Backend;

    struct SliceMin<'a>(&'a [u64]);

    impl ExtremumScan for SliceMin<'_> {
        type Value = u64;

        fn local_extremum(&self, range: Range) -> Option<Extremum<u64>> {
            scan_min_by(range, |i| self.0[i] != u64::MAX, |i| self.0[i])
        }
    }

    #[test]
    fn combine_keeps_strictly_smaller() {
        let state = ReductionState::new();
        assert!(state.combine(Extremum { value: 5, index: 3 }));
        assert!(!state.combine(Extremum { value: 7, index: 0 }));
        assert!(state.combine(Extremum { value: 2, index: 9 }));
        assert_eq!(state.get(), Some(Extremum { value: 2, index: 9 }));
    }

    #[test]
    fn ties_go_to_the_lower_index_in_any_order() {
        let forward = ReductionState::new();
        forward.combine(Extremum { value: 4, index: 1 });
        assert!(!forward.combine(Extremum { value: 4, index: 6 }));

        let backward = ReductionState::new();
        backward.combine(Extremum { value: 4, index: 6 });
        assert!(backward.combine(Extremum { value: 4, index: 1 }));

        assert_eq!(forward.into_inner(), backward.into_inner());
    }

    #[test]
    fn reduce_min_matches_sequential_scan_with_ties() {
        let values = [9, 3, 7, 3, u64::MAX, 5, 3, 8, 1, 1, 6];
        for workers in 1..=values.len() + 2 {
            for backend in [Backend::Threads, Backend::Rayon] {
                let pool = WorkerPool::new(NonZeroUsize::new(workers).unwrap(), backend).unwrap();
                let best = reduce_min(&pool, values.len(), &SliceMin(&values)).unwrap();
                assert_eq!(best, Some(Extremum { value: 1, index: 8 }), "workers={workers}");
            }
        }
    }

    #[test]
    fn reduce_min_with_no_eligible_candidate_is_none() {
        let values = [u64::MAX; 5];
        let pool = WorkerPool::with_workers(NonZeroUsize::new(2).unwrap());
        assert_eq!(reduce_min(&pool, values.len(), &SliceMin(&values)).unwrap(), None);
        assert_eq!(reduce_min(&pool, 0, &SliceMin(&[])).unwrap(), None);
    }
}

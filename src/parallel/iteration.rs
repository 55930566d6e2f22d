//! Multi-round drivers built on fork-join phases.
//!
//! Every run moves through `Init -> Round(0) -> ... -> Round(R-1) -> Done`.
//! A round ends with a full join, so round `r + 1` always sees every write of
//! round `r`. A failed round aborts the run and leaves the controller in the
//! state of the round that failed.

use serde::Serialize;

use crate::error::Result;
use crate::parallel::batch::Range;
use crate::parallel::pool::{OperationKind, WorkerPool};
use crate::parallel::reduce::{reduce_min, Extremum, ExtremumScan};

/// Current and next buffers for rounds that read one complete round and
/// write the following one.
#[derive(Debug, Clone)]
pub struct BufferPair<T> {
    current: Vec<T>,
    next: Vec<T>,
}

impl<T: Clone> BufferPair<T> {
    pub fn new(initial: Vec<T>) -> Self {
        Self {
            next: initial.clone(),
            current: initial,
        }
    }
}

impl<T> BufferPair<T> {
    pub fn current(&self) -> &[T] {
        &self.current
    }

    /// Read view of the current buffer and write view of the next one.
    pub fn split(&mut self) -> (&[T], &mut [T]) {
        (&self.current, &mut self.next)
    }

    /// Make the buffer written last round the current one.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    pub fn into_current(self) -> Vec<T> {
        self.current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Init,
    Round(usize),
    Done,
}

/// How a multi-round run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IterationOutcome {
    pub rounds: usize,
    /// True when a greedy run found nothing left to select before its round limit.
    pub stopped_early: bool,
}

/// A greedy algorithm that finalizes one unit per round: pick the eligible
/// unit with the smallest key, finalize it, then relax the rest.
pub trait GreedySelection: Sync {
    type Slot: Send + Sync;
    type Key: PartialOrd + Copy + Send + Sync;

    /// The key of a slot that may still be selected, None otherwise.
    fn candidate(&self, slot: &Self::Slot) -> Option<Self::Key>;

    /// Mark `index` final. Runs on the controller thread between phases.
    fn finalize(&self, slots: &mut [Self::Slot], index: usize);

    /// Update the slots of `range` after `chosen` was finalized. `slots[0]`
    /// is unit `range.start`.
    fn relax_range(&self, chosen: Extremum<Self::Key>, range: Range, slots: &mut [Self::Slot]);
}

struct CandidateScan<'a, G: GreedySelection> {
    algorithm: &'a G,
    slots: &'a [G::Slot],
}

impl<G: GreedySelection> ExtremumScan for CandidateScan<'_, G> {
    type Value = G::Key;

    fn local_extremum(&self, range: Range) -> Option<Extremum<G::Key>> {
        let mut best: Option<Extremum<G::Key>> = None;
        for index in range.indices() {
            if let Some(value) = self.algorithm.candidate(&self.slots[index]) {
                if best.map_or(true, |b| value < b.value) {
                    best = Some(Extremum { value, index });
                }
            }
        }
        best
    }
}

/// Drives repeated phases on one pool.
#[derive(Debug)]
pub struct IterationController<'p> {
    pool: &'p WorkerPool,
    state: RoundState,
}

impl<'p> IterationController<'p> {
    pub fn new(pool: &'p WorkerPool) -> Self {
        Self {
            pool,
            state: RoundState::Init,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        self.pool
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Run `rounds` rounds where each worker reads the whole current buffer
    /// and writes its rows of the next one; the buffers swap after each join.
    pub fn run_double_buffered<T, F>(
        &mut self,
        buffers: &mut BufferPair<T>,
        units: usize,
        width: usize,
        rounds: usize,
        step: F,
    ) -> Result<IterationOutcome>
    where
        T: Send + Sync,
        F: Fn(&[T], Range, &mut [T]) + Sync,
    {
        for round in 0..rounds {
            self.state = RoundState::Round(round);
            let (current, next) = buffers.split();
            self.pool.run_partitioned(OperationKind::Relax, units, width, next, |range, chunk| {
                step(current, range, chunk)
            })?;
            buffers.swap();
        }
        tracing::debug!(rounds, "double-buffered run done");
        self.finish(rounds, false)
    }

    /// Run `rounds` rounds over one buffer. Before each round `prepare` takes
    /// a read-only snapshot of whatever the round must not see change; workers
    /// then read the snapshot and rewrite only their own rows.
    pub fn run_in_place<T, S, P, F>(
        &mut self,
        buffer: &mut [T],
        units: usize,
        width: usize,
        rounds: usize,
        mut prepare: P,
        relax: F,
    ) -> Result<IterationOutcome>
    where
        T: Send,
        S: Sync,
        P: FnMut(usize, &[T]) -> S,
        F: Fn(usize, &S, Range, &mut [T]) + Sync,
    {
        for round in 0..rounds {
            self.state = RoundState::Round(round);
            let snapshot = prepare(round, buffer);
            self.pool.run_partitioned(OperationKind::Relax, units, width, buffer, |range, chunk| {
                relax(round, &snapshot, range, chunk)
            })?;
        }
        tracing::debug!(rounds, "in-place run done");
        self.finish(rounds, false)
    }

    /// Run up to `max_rounds` greedy rounds: one reduction phase to select,
    /// finalize on this thread, one relax phase. Stops early when nothing is
    /// left to select.
    pub fn run_greedy<G: GreedySelection>(
        &mut self,
        algorithm: &G,
        slots: &mut [G::Slot],
        max_rounds: usize,
    ) -> Result<IterationOutcome> {
        let units = slots.len();
        for round in 0..max_rounds {
            self.state = RoundState::Round(round);
            let scan = CandidateScan {
                algorithm,
                slots: &*slots,
            };
            let Some(chosen) = reduce_min(self.pool, units, &scan)? else {
                tracing::debug!(round, "no candidate left");
                return self.finish(round, true);
            };
            algorithm.finalize(slots, chosen.index);
            tracing::trace!(round, index = chosen.index, "finalized");
            self.pool.run_partitioned(OperationKind::Relax, units, 1, slots, |range, chunk| {
                algorithm.relax_range(chosen, range, chunk)
            })?;
        }
        self.finish(max_rounds, false)
    }

    fn finish(&mut self, rounds: usize, stopped_early: bool) -> Result<IterationOutcome> {
        self.state = RoundState::Done;
        Ok(IterationOutcome {
            rounds,
            stopped_early,
        })
    }
}

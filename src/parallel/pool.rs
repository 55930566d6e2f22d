//! Fork-join worker pool.
//!
//! One call to [WorkerPool::run_partitioned] is one phase: the work is planned
//! into ranges, each range gets a worker and an exclusive slice of the output,
//! and the call returns only after every worker has been joined. With
//! [Backend::Threads] the workers are fresh OS threads per phase; with
//! [Backend::Rayon] the phase runs on a rayon pool built once and reused.

use std::fmt;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::parallel::batch::{Partition, Range};

/// How a phase's workers are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Fresh scoped OS threads per phase.
    #[default]
    Threads,
    /// A persistent rayon pool with one thread per worker.
    Rayon,
}

impl Backend {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "threads" => Some(Self::Threads),
            "rayon" => Some(Self::Rayon),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Threads => "threads",
            Self::Rayon => "rayon",
        }
    }
}

/// What a range computation does, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Subtract,
    Multiply,
    Relax,
    FindExtremum,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Relax => "relax",
            Self::FindExtremum => "find_extremum",
        }
    }
}

/// A computation over a range of work units that writes only its own slice
/// of the output.
///
/// `out` holds `range.len() * width()` items: unit `range.start` maps to
/// `out[..width]`, the next unit to `out[width..2 * width]` and so on.
pub trait RangeOperation: Sync {
    type Item: Send;

    fn kind(&self) -> OperationKind;

    /// Output items per work unit (row width for row-partitioned kernels).
    fn width(&self) -> usize;

    fn apply(&self, range: Range, out: &mut [Self::Item]);
}

/// What happened in one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseStats {
    /// Workers joined, empty ranges included.
    pub joined: usize,
    /// Workers that had at least one unit.
    pub active: usize,
}

/// Runs fork-join phases with a fixed number of workers.
#[derive(Clone)]
pub struct WorkerPool {
    workers: NonZeroUsize,
    rayon: Option<Arc<rayon::ThreadPool>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("backend", &self.backend())
            .finish()
    }
}

impl WorkerPool {
    /// Use exactly `workers` fresh threads per phase.
    pub fn with_workers(workers: NonZeroUsize) -> Self {
        Self {
            workers,
            rayon: None,
        }
    }

    /// Build a rayon pool with `workers` threads and run every phase on it.
    pub fn rayon(workers: NonZeroUsize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.get())
            .thread_name(|i| format!("forkjoin-rayon-{i}"))
            .build()?;
        Ok(Self {
            workers,
            rayon: Some(Arc::new(pool)),
        })
    }

    pub fn new(workers: NonZeroUsize, backend: Backend) -> Result<Self> {
        match backend {
            Backend::Threads => Ok(Self::with_workers(workers)),
            Backend::Rayon => Self::rayon(workers),
        }
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    pub fn backend(&self) -> Backend {
        if self.rayon.is_some() {
            Backend::Rayon
        } else {
            Backend::Threads
        }
    }

    /// The partition this pool uses for `units` work units.
    pub fn plan(&self, units: usize) -> Partition {
        Partition::plan(units, self.workers)
    }

    /// Run `op` over `units` work units, writing into `out`.
    pub fn execute<O: RangeOperation>(
        &self,
        units: usize,
        op: &O,
        out: &mut [O::Item],
    ) -> Result<PhaseStats> {
        self.run_partitioned(op.kind(), units, op.width(), out, |range, chunk| {
            op.apply(range, chunk)
        })
    }

    /// Run one phase: plan `units` into ranges, hand each worker its range and
    /// its `range.len() * width` slice of `out`, and join all workers.
    pub fn run_partitioned<T, F>(
        &self,
        kind: OperationKind,
        units: usize,
        width: usize,
        out: &mut [T],
        work: F,
    ) -> Result<PhaseStats>
    where
        T: Send,
        F: Fn(Range, &mut [T]) + Sync,
    {
        let partition = self.plan(units);
        let views = partition.split_mut(out, width)?;
        let stats = PhaseStats {
            joined: partition.len(),
            active: partition.active(),
        };
        let span = tracing::debug_span!(
            "phase",
            kind = kind.as_str(),
            units,
            workers = self.workers.get(),
            backend = ?self.backend()
        );
        let _enter = span.enter();

        let jobs: Vec<(Range, &mut [T])> = partition.iter().zip(views).collect();
        match &self.rayon {
            None => join_scoped(kind.as_str(), jobs, &work, &|_| Ok(()))?,
            Some(pool) => join_rayon(pool, kind.as_str(), jobs, &work)?,
        }
        tracing::trace!(joined = stats.joined, active = stats.active, "phase joined");
        Ok(stats)
    }

    /// Run one read-only phase over `units` work units. Workers report results
    /// through shared state they capture, such as a
    /// [ReductionState](crate::parallel::ReductionState).
    pub fn run_scan<F>(&self, kind: OperationKind, units: usize, work: F) -> Result<PhaseStats>
    where
        F: Fn(Range) + Sync,
    {
        let mut nothing: [(); 0] = [];
        self.run_partitioned(kind, units, 0, &mut nothing, |range, _| work(range))
    }
}

/// Spawn one scoped thread per job and join them all.
///
/// `before_spawn` runs before each spawn and can veto it; if it or the spawn
/// itself fails, the workers already running are joined before the error is
/// returned.
fn join_scoped<T, F>(
    phase: &'static str,
    jobs: Vec<(Range, &mut [T])>,
    work: &F,
    before_spawn: &dyn Fn(usize) -> io::Result<()>,
) -> Result<()>
where
    T: Send,
    F: Fn(Range, &mut [T]) + Sync,
{
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(jobs.len());
        let mut spawn_error = None;
        for (worker, (range, chunk)) in jobs.into_iter().enumerate() {
            let spawned = before_spawn(worker).and_then(|()| {
                thread::Builder::new()
                    .name(format!("forkjoin-{worker}"))
                    .spawn_scoped(scope, move || {
                        if !range.is_empty() {
                            work(range, chunk);
                        }
                    })
            });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    tracing::warn!(worker, %source, "worker spawn failed, draining phase");
                    spawn_error = Some(EngineError::Spawn { worker, source });
                    break;
                }
            }
        }

        let mut panicked = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && panicked.is_none() {
                panicked = Some(EngineError::WorkerPanicked { worker, phase });
            }
        }
        match spawn_error.or(panicked) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    })
}

fn join_rayon<T, F>(
    pool: &rayon::ThreadPool,
    phase: &'static str,
    jobs: Vec<(Range, &mut [T])>,
    work: &F,
) -> Result<()>
where
    T: Send,
    F: Fn(Range, &mut [T]) + Sync,
{
    let first_panic = AtomicUsize::new(usize::MAX);
    pool.scope(|scope| {
        for (worker, (range, chunk)) in jobs.into_iter().enumerate() {
            let first_panic = &first_panic;
            scope.spawn(move |_| {
                if range.is_empty() {
                    return;
                }
                if panic::catch_unwind(AssertUnwindSafe(|| work(range, chunk))).is_err() {
                    first_panic.fetch_min(worker, Ordering::Relaxed);
                }
            });
        }
    });
    match first_panic.into_inner() {
        usize::MAX => Ok(()),
        worker => Err(EngineError::WorkerPanicked { worker, phase }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    fn k(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn pools(workers: usize) -> Vec<WorkerPool> {
        vec![
            WorkerPool::with_workers(k(workers)),
            WorkerPool::rayon(k(workers)).unwrap(),
        ]
    }

    #[test]
    fn every_unit_written_exactly_once() {
        for pool in pools(3) {
            let mut out = vec![0u32; 10 * 2];
            let stats = pool
                .run_partitioned(OperationKind::Add, 10, 2, &mut out, |range, chunk| {
                    for (offset, row) in chunk.chunks_mut(2).enumerate() {
                        let unit = (range.start + offset) as u32;
                        row[0] += unit;
                        row[1] += 1;
                    }
                })
                .unwrap();
            assert_eq!(stats, PhaseStats { joined: 3, active: 3 });
            for unit in 0..10 {
                assert_eq!(out[unit * 2], unit as u32);
                assert_eq!(out[unit * 2 + 1], 1);
            }
        }
    }

    #[test]
    fn empty_ranges_still_join() {
        for pool in pools(6) {
            let seen = Mutex::new(Vec::new());
            let stats = pool
                .run_scan(OperationKind::FindExtremum, 4, |range| {
                    seen.lock().unwrap().push(range);
                })
                .unwrap();
            assert_eq!(stats, PhaseStats { joined: 6, active: 4 });
            let seen = seen.into_inner().unwrap();
            assert_eq!(seen.len(), 4, "no-op workers skip the computation");
        }
    }

    #[test]
    fn zero_units_is_an_immediate_no_op() {
        let pool = WorkerPool::with_workers(k(4));
        let mut out: Vec<u8> = Vec::new();
        let stats = pool
            .run_partitioned(OperationKind::Add, 0, 3, &mut out, |_, _| panic!("no work"))
            .unwrap();
        assert_eq!(stats, PhaseStats::default());
    }

    #[test]
    fn workers_run_on_distinct_threads() {
        let pool = WorkerPool::with_workers(k(4));
        let names = Mutex::new(HashSet::new());
        pool.run_scan(OperationKind::Relax, 8, |_| {
            let name = thread::current().name().map(str::to_string);
            names.lock().unwrap().insert(name);
        })
        .unwrap();
        assert_eq!(names.into_inner().unwrap().len(), 4);
    }

    #[test]
    fn spawn_failure_joins_started_workers() {
        let finished = AtomicUsize::new(0);
        let partition = Partition::plan(4, k(4));
        let mut out = vec![0u8; 4];
        let views = partition.split_mut(&mut out, 1).unwrap();
        let jobs: Vec<_> = partition.iter().zip(views).collect();
        let work = |_: Range, chunk: &mut [u8]| {
            thread::sleep(std::time::Duration::from_millis(20));
            chunk[0] = 1;
            finished.fetch_add(1, Ordering::SeqCst);
        };
        let refuse_third = |worker: usize| {
            if worker == 2 {
                Err(io::Error::new(io::ErrorKind::Other, "no more threads"))
            } else {
                Ok(())
            }
        };

        let err = join_scoped("test", jobs, &work, &refuse_third).unwrap_err();
        assert!(matches!(err, EngineError::Spawn { worker: 2, .. }));
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert_eq!(out, vec![1, 1, 0, 0]);
    }

    #[test]
    fn worker_panic_is_reported_after_join() {
        for pool in pools(3) {
            let finished = AtomicUsize::new(0);
            let err = pool
                .run_scan(OperationKind::Relax, 3, |range| {
                    if range.start == 1 {
                        panic!("boom");
                    }
                    finished.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap_err();
            assert!(matches!(err, EngineError::WorkerPanicked { worker: 1, phase: "relax" }));
            assert_eq!(finished.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn backend_round_trips_through_constructor() {
        assert_eq!(WorkerPool::new(k(2), Backend::Threads).unwrap().backend(), Backend::Threads);
        assert_eq!(WorkerPool::new(k(2), Backend::Rayon).unwrap().backend(), Backend::Rayon);
        assert_eq!(Backend::parse("rayon"), Some(Backend::Rayon));
        assert_eq!(Backend::parse("gpu"), None);
    }
}

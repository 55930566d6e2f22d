//! Sequential-vs-parallel timing.
//!
//! Each measurement runs the sequential baseline once and the parallel path
//! once, with no warm-up and no averaging, and derives speedup and efficiency
//! from the two wall-clock times.

pub mod report;

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Result;
use crate::parallel::WorkerPool;

pub use report::{append_csv, BenchmarkRecord};

/// Floor for a measured time so that speedup and efficiency stay finite and positive.
pub const MIN_ELAPSED_MS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub workers: usize,
    pub sequential_ms: f64,
    pub parallel_ms: f64,
    /// `sequential_ms / parallel_ms`
    pub speedup: f64,
    /// `speedup / workers`
    pub efficiency: f64,
}

impl BenchmarkResult {
    pub const TABLE_HEADER: &'static str = "workers\tsequential_ms\tparallel_ms\tspeedup\tefficiency";

    pub fn from_timings(workers: NonZeroUsize, sequential: Duration, parallel: Duration) -> Self {
        let sequential_ms = to_ms(sequential);
        let parallel_ms = to_ms(parallel);
        let speedup = sequential_ms / parallel_ms;
        Self {
            workers: workers.get(),
            sequential_ms,
            parallel_ms,
            speedup,
            efficiency: speedup / workers.get() as f64,
        }
    }

    pub fn table_row(&self) -> String {
        format!(
            "{}\t{:.3}\t{:.3}\t{:.4}\t{:.4}",
            self.workers, self.sequential_ms, self.parallel_ms, self.speedup, self.efficiency
        )
    }
}

fn to_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).max(MIN_ELAPSED_MS)
}

/// Both outputs of a measured run plus the timing summary.
#[derive(Debug, Clone)]
pub struct Measured<S, P> {
    pub sequential: S,
    pub parallel: P,
    pub result: BenchmarkResult,
}

/// Times a sequential baseline against a parallel run on one pool.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkHarness<'p> {
    pool: &'p WorkerPool,
}

impl<'p> BenchmarkHarness<'p> {
    pub fn new(pool: &'p WorkerPool) -> Self {
        Self { pool }
    }

    /// Run `sequential` once, then `parallel` once on the harness pool.
    /// Either failing aborts the measurement.
    pub fn measure<S, P, FS, FP>(&self, sequential: FS, parallel: FP) -> Result<Measured<S, P>>
    where
        FS: FnOnce() -> Result<S>,
        FP: FnOnce(&WorkerPool) -> Result<P>,
    {
        let start = Instant::now();
        let sequential = sequential()?;
        let sequential_elapsed = start.elapsed();

        let start = Instant::now();
        let parallel = parallel(self.pool)?;
        let parallel_elapsed = start.elapsed();

        let result = BenchmarkResult::from_timings(self.pool.workers(), sequential_elapsed, parallel_elapsed);
        tracing::info!(
            workers = result.workers,
            sequential_ms = result.sequential_ms,
            parallel_ms = result.parallel_ms,
            speedup = result.speedup,
            efficiency = result.efficiency,
            "measured run"
        );
        Ok(Measured {
            sequential,
            parallel,
            result,
        })
    }
}

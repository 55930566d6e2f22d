//! Jacobi iteration for `Ax = b`.
//!
//! Runs a fixed number of sweeps; there is no convergence test. Each sweep
//! reads the whole previous estimate and writes a new one, so the parallel
//! path double-buffers the estimate and swaps only after every row is done.

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::kernels::matrix::Matrix;
use crate::parallel::{BufferPair, IterationController, OperationKind, Range, RangeOperation, WorkerPool};

/// A square system `Ax = b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearSystem {
    a: Matrix<f64>,
    b: Vec<f64>,
}

impl LinearSystem {
    pub fn new(a: Matrix<f64>, b: Vec<f64>) -> Result<Self> {
        if !a.is_square() {
            return Err(EngineError::dimension(
                "linear system",
                "square matrix",
                format!("{}x{}", a.rows(), a.cols()),
            ));
        }
        if b.len() != a.rows() {
            return Err(EngineError::dimension("right-hand side", a.rows(), b.len()));
        }
        Ok(Self { a, b })
    }

    pub fn size(&self) -> usize {
        self.b.len()
    }

    pub fn matrix(&self) -> &Matrix<f64> {
        &self.a
    }

    pub fn rhs(&self) -> &[f64] {
        &self.b
    }

    /// Whether every diagonal entry outweighs the rest of its row.
    pub fn is_diagonally_dominant(&self) -> bool {
        (0..self.size()).all(|i| {
            let row = self.a.row(i);
            let off: f64 = row
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, v)| v.abs())
                .sum();
            row[i].abs() > off
        })
    }

    /// Max-norm of `Ax - b`.
    pub fn residual(&self, x: &[f64]) -> f64 {
        (0..self.size())
            .map(|i| {
                let ax: f64 = self.a.row(i).iter().zip(x).map(|(a, x)| a * x).sum();
                (ax - self.b[i]).abs()
            })
            .fold(0.0, f64::max)
    }

    /// New estimate for unknown `i` given the previous estimate.
    fn relax_row(&self, current: &[f64], i: usize) -> f64 {
        let row = self.a.row(i);
        let mut s = 0.0;
        for (j, (&a, &x)) in row.iter().zip(current).enumerate() {
            if j != i {
                s += a * x;
            }
        }
        (self.b[i] - s) / row[i]
    }
}

/// One Jacobi sweep over a block of rows.
pub struct JacobiSweep<'a> {
    pub system: &'a LinearSystem,
    pub current: &'a [f64],
}

impl RangeOperation for JacobiSweep<'_> {
    type Item = f64;

    fn kind(&self) -> OperationKind {
        OperationKind::Relax
    }

    fn width(&self) -> usize {
        1
    }

    fn apply(&self, range: Range, out: &mut [f64]) {
        for (dst, i) in out.iter_mut().zip(range.indices()) {
            *dst = self.system.relax_row(self.current, i);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverResult {
    pub x: Vec<f64>,
    pub iterations: usize,
    pub residual: f64,
}

/// Start from the zero vector and run `iterations` sweeps on one thread.
pub fn jacobi_sequential(system: &LinearSystem, iterations: usize) -> SolverResult {
    let n = system.size();
    let mut x = vec![0.0; n];
    let mut x_new = vec![0.0; n];
    for _ in 0..iterations {
        for (i, dst) in x_new.iter_mut().enumerate() {
            *dst = system.relax_row(&x, i);
        }
        std::mem::swap(&mut x, &mut x_new);
    }
    let residual = system.residual(&x);
    SolverResult {
        x,
        iterations,
        residual,
    }
}

/// Start from the zero vector and run `iterations` row-partitioned sweeps on `pool`.
pub fn jacobi_parallel(pool: &WorkerPool, system: &LinearSystem, iterations: usize) -> Result<SolverResult> {
    let n = system.size();
    let mut buffers = BufferPair::new(vec![0.0; n]);
    let mut controller = IterationController::new(pool);
    let outcome = controller.run_double_buffered(&mut buffers, n, 1, iterations, |current, range, next| {
        JacobiSweep { system, current }.apply(range, next)
    })?;
    let x = buffers.into_current();
    let residual = system.residual(&x);
    Ok(SolverResult {
        x,
        iterations: outcome.rounds,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;

    fn system() -> LinearSystem {
        let a = Matrix::from_rows(vec![
            vec![10.0, -1.0, 2.0, 0.0],
            vec![-1.0, 11.0, -1.0, 3.0],
            vec![2.0, -1.0, 10.0, -1.0],
            vec![0.0, 3.0, -1.0, 8.0],
        ])
        .unwrap();
        LinearSystem::new(a, vec![6.0, 25.0, -11.0, 15.0]).unwrap()
    }

    #[test]
    fn converges_to_known_solution() {
        let result = jacobi_sequential(&system(), 100);
        let expected = [1.0, 2.0, -1.0, 1.0];
        for (x, e) in result.x.iter().zip(expected) {
            assert!((x - e).abs() < 1e-9, "{x} vs {e}");
        }
        assert!(result.residual < 1e-9);
    }

    #[test]
    fn parallel_matches_sequential_for_every_worker_count() {
        let system = system();
        let seq = jacobi_sequential(&system, 25);
        for workers in 1..=6 {
            let pool = WorkerPool::with_workers(NonZeroUsize::new(workers).unwrap());
            let par = jacobi_parallel(&pool, &system, 25).unwrap();
            assert_eq!(par.iterations, 25);
            assert_eq!(par.x, seq.x, "workers={workers}");
        }
    }

    #[test]
    fn zero_iterations_returns_the_zero_vector() {
        let pool = WorkerPool::with_workers(NonZeroUsize::new(2).unwrap());
        let result = jacobi_parallel(&pool, &system(), 0).unwrap();
        assert_eq!(result.x, vec![0.0; 4]);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn rejects_non_square_and_short_rhs() {
        let rect = Matrix::<f64>::zeros(2, 3);
        assert!(LinearSystem::new(rect, vec![0.0; 2]).is_err());
        let square = Matrix::<f64>::zeros(2, 2);
        assert!(LinearSystem::new(square, vec![0.0; 3]).is_err());
    }

    #[test]
    fn dominance_check() {
        assert!(system().is_diagonally_dominant());
        let weak = Matrix::from_rows(vec![vec![1.0, 2.0], vec![0.0, 1.0]]).unwrap();
        assert!(!LinearSystem::new(weak, vec![1.0, 1.0]).unwrap().is_diagonally_dominant());
    }
}

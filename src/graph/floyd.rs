//! Floyd–Warshall all-pairs shortest paths.
//!
//! Round `k` lets every pair route through vertex `k`. Workers own blocks of
//! rows. Row `k` is read by everyone, so it is copied before the round starts;
//! with a zero diagonal it does not change during round `k`, so the copy is
//! exactly what the in-place sequential loop would read.

use crate::error::Result;
use crate::graph::check_square;
use crate::kernels::Matrix;
use crate::parallel::{IterationController, WorkerPool};

/// Run Floyd–Warshall on one thread and return the distance matrix.
pub fn floyd_sequential(graph: &Matrix<f64>) -> Result<Matrix<f64>> {
    let n = check_square(graph, "floyd")?;
    let mut dist = graph.clone();
    let d = dist.as_mut_slice();
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                let via = d[i * n + k] + d[k * n + j];
                if via < d[i * n + j] {
                    d[i * n + j] = via;
                }
            }
        }
    }
    Ok(dist)
}

/// Run Floyd–Warshall with one fork-join phase per intermediate vertex.
pub fn floyd_parallel(pool: &WorkerPool, graph: &Matrix<f64>) -> Result<Matrix<f64>> {
    let n = check_square(graph, "floyd")?;
    let mut dist = graph.clone();
    let mut controller = IterationController::new(pool);
    controller.run_in_place(
        dist.as_mut_slice(),
        n,
        n,
        n,
        |k, d| d[k * n..(k + 1) * n].to_vec(),
        |k, pivot: &Vec<f64>, _range, rows| {
            for row in rows.chunks_mut(n) {
                let through_k = row[k];
                for (cell, &k_to_j) in row.iter_mut().zip(pivot) {
                    let via = through_k + k_to_j;
                    if via < *cell {
                        *cell = via;
                    }
                }
            }
        },
    )?;
    Ok(dist)
}

//! Synthetic problem generators. Every generator draws from the [Rng] it is
//! given, so a fixed seed always yields the same problem.

pub mod rng;

pub use rng::Rng;

use crate::error::Result;
use crate::graph::{AdjacencyList, WeightMatrix, NO_EDGE};
use crate::kernels::{LinearSystem, Matrix};

/// Upper bound of generated integer matrix entries.
pub const MATRIX_VALUE_MAX: i64 = 10_000;

/// Weight range of generated distance graphs.
pub const DISTANCE_WEIGHT_RANGE: (f64, f64) = (1.0, 10_000.0);

/// `rows x cols` matrix with entries uniform in `[0, max]`.
pub fn integer_matrix(rows: usize, cols: usize, max: i64, rng: &mut Rng) -> Matrix<i64> {
    let max = max.max(0) as u64;
    let mut m = Matrix::zeros(rows, cols);
    for v in m.as_mut_slice() {
        *v = rng.range_u64(0, max) as i64;
    }
    m
}

/// Strictly diagonally dominant `n x n` system. Off-diagonal entries and the
/// right-hand side are uniform in `[-scale, scale)`; each diagonal entry is
/// the absolute row sum plus a random margin plus one.
pub fn diagonally_dominant_system(n: usize, scale: f64, rng: &mut Rng) -> Result<LinearSystem> {
    let mut a = Matrix::zeros(n, n);
    for i in 0..n {
        let mut row_sum = 0.0;
        for j in 0..n {
            if i == j {
                continue;
            }
            let v = rng.range_f64(-scale, scale);
            a.set(i, j, v);
            row_sum += v.abs();
        }
        let margin = rng.range_f64(-scale, scale).abs();
        a.set(i, i, row_sum + margin + 1.0);
    }
    let b = (0..n).map(|_| rng.range_f64(-scale, scale)).collect();
    LinearSystem::new(a, b)
}

/// Directed distance matrix: zero diagonal, an edge with probability
/// `density` weighted uniformly in [DISTANCE_WEIGHT_RANGE], infinity elsewhere.
pub fn distance_graph(n: usize, density: f64, rng: &mut Rng) -> Matrix<f64> {
    let (low, high) = DISTANCE_WEIGHT_RANGE;
    let mut g = Matrix::filled(n, n, f64::INFINITY);
    for i in 0..n {
        g.set(i, i, 0.0);
        for j in 0..n {
            if i != j && rng.chance(density) {
                g.set(i, j, rng.range_f64(low, high));
            }
        }
    }
    g
}

/// Undirected graph where each pair is joined with probability `density`,
/// weights uniform in `[1, max_weight]`.
pub fn adjacency_list(n: usize, density: f64, max_weight: u64, rng: &mut Rng) -> Result<AdjacencyList> {
    let max_weight = max_weight.max(1);
    let mut g = AdjacencyList::new(n);
    for i in 0..n {
        for j in i + 1..n {
            if rng.chance(density) {
                let weight = rng.range_u64(1, max_weight);
                g.add_undirected(i, j, weight)?;
            }
        }
    }
    Ok(g)
}

/// Connected undirected weight matrix: a path `0-1-...-(n-1)` plus extra
/// edges between roughly a third of the remaining pairs. Weights are uniform
/// in `[1, max_weight]`.
pub fn connected_weight_matrix(n: usize, max_weight: u64, rng: &mut Rng) -> WeightMatrix {
    let max_weight = max_weight.max(1);
    let mut g = WeightMatrix::zeros(n, n);
    for i in 1..n {
        let w = rng.range_u64(1, max_weight);
        g.set(i - 1, i, w);
        g.set(i, i - 1, w);
    }
    for i in 0..n {
        for j in i + 1..n {
            if g.get(i, j) == NO_EDGE && rng.chance(1.0 / 3.0) {
                let w = rng.range_u64(1, max_weight);
                g.set(i, j, w);
                g.set(j, i, w);
            }
        }
    }
    g
}

use std::num::NonZeroUsize;

use forkjoin::generate::{diagonally_dominant_system, Rng};
use forkjoin::kernels::{jacobi_parallel, jacobi_sequential};
use forkjoin::parallel::{Backend, WorkerPool};

fn assert_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let tolerance = 1e-6 * x.abs().max(y.abs()).max(1.0);
        assert!((x - y).abs() <= tolerance, "x[{i}]: {x} vs {y}");
    }
}

#[test]
fn parallel_agrees_with_sequential_on_generated_systems() {
    let mut rng = Rng::new(2024);
    for n in [1, 5, 31, 64] {
        let system = diagonally_dominant_system(n, 10.0, &mut rng).unwrap();
        let expected = jacobi_sequential(&system, 40);
        for workers in [1, 3, 4, n + 3] {
            let workers = NonZeroUsize::new(workers).unwrap();
            for backend in [Backend::Threads, Backend::Rayon] {
                let pool = WorkerPool::new(workers, backend).unwrap();
                let got = jacobi_parallel(&pool, &system, 40).unwrap();
                assert_eq!(got.iterations, 40);
                assert_close(&got.x, &expected.x);
            }
        }
    }
}

#[test]
fn dominant_systems_converge() {
    let system = diagonally_dominant_system(16, 10.0, &mut Rng::new(9)).unwrap();
    assert!(system.is_diagonally_dominant());
    let pool = WorkerPool::with_workers(NonZeroUsize::new(4).unwrap());
    let early = jacobi_parallel(&pool, &system, 2).unwrap();
    let late = jacobi_parallel(&pool, &system, 200).unwrap();
    assert!(late.residual < early.residual);
    assert!(late.residual < 1e-3, "residual {}", late.residual);
}

#[test]
fn empty_system_solves_trivially() {
    let system = diagonally_dominant_system(0, 10.0, &mut Rng::new(1)).unwrap();
    let pool = WorkerPool::with_workers(NonZeroUsize::new(3).unwrap());
    let result = jacobi_parallel(&pool, &system, 10).unwrap();
    assert!(result.x.is_empty());
    assert_eq!(result.residual, 0.0);
}

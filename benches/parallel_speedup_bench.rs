//! Compare sequential vs parallel run times for each kernel.
//!
//! Run with: `cargo bench --bench parallel_speedup`
//! Or quick comparison: `cargo run --bin benchmark_parallel_speedup` (see src/bin)

use std::num::NonZeroUsize;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use forkjoin::generate::{self, Rng, MATRIX_VALUE_MAX};
use forkjoin::graph;
use forkjoin::kernels::{self, MatrixOp};
use forkjoin::parallel::{Backend, WorkerPool};

fn pool(backend: Backend) -> WorkerPool {
    let workers = std::thread::available_parallelism().unwrap_or(NonZeroUsize::new(4).unwrap());
    WorkerPool::new(workers, backend).unwrap()
}

fn bench_matrix_multiply(c: &mut Criterion) {
    let mut rng = Rng::new(42);
    let lhs = generate::integer_matrix(192, 192, MATRIX_VALUE_MAX, &mut rng);
    let rhs = generate::integer_matrix(192, 192, MATRIX_VALUE_MAX, &mut rng);
    let threads = pool(Backend::Threads);
    let rayon = pool(Backend::Rayon);

    let mut group = c.benchmark_group("matrix_multiply");
    group.sample_size(20);
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(kernels::apply_sequential(MatrixOp::Multiply, &lhs, &rhs).unwrap()));
    });
    group.bench_function("parallel_threads", |b| {
        b.iter(|| black_box(kernels::multiply_parallel(&threads, &lhs, &rhs).unwrap()));
    });
    group.bench_function("parallel_rayon", |b| {
        b.iter(|| black_box(kernels::multiply_parallel(&rayon, &lhs, &rhs).unwrap()));
    });
    group.finish();
}

fn bench_jacobi(c: &mut Criterion) {
    let system = generate::diagonally_dominant_system(512, 10.0, &mut Rng::new(7)).unwrap();
    let threads = pool(Backend::Threads);

    let mut group = c.benchmark_group("jacobi");
    group.sample_size(20);
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(kernels::jacobi_sequential(&system, 50)));
    });
    group.bench_function("parallel", |b| {
        b.iter(|| black_box(kernels::jacobi_parallel(&threads, &system, 50).unwrap()));
    });
    group.finish();
}

fn bench_floyd(c: &mut Criterion) {
    let g = generate::distance_graph(128, 0.9, &mut Rng::new(11));
    let rayon = pool(Backend::Rayon);

    let mut group = c.benchmark_group("floyd");
    group.sample_size(10);
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(graph::floyd_sequential(&g).unwrap()));
    });
    group.bench_function("parallel", |b| {
        b.iter(|| black_box(graph::floyd_parallel(&rayon, &g).unwrap()));
    });
    group.finish();
}

fn bench_prim(c: &mut Criterion) {
    let g = generate::connected_weight_matrix(400, 100, &mut Rng::new(3));
    let rayon = pool(Backend::Rayon);

    let mut group = c.benchmark_group("prim");
    group.sample_size(10);
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(graph::prim_sequential(&g, 0).unwrap()));
    });
    group.bench_function("parallel", |b| {
        b.iter(|| black_box(graph::prim_parallel(&rayon, &g, 0).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_matrix_multiply, bench_jacobi, bench_floyd, bench_prim);
criterion_main!(benches);

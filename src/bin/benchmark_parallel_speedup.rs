//! Run every algorithm once sequentially and once in parallel, then print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup [workers]
//!
//! Worker count defaults to FORKJOIN_WORKERS, then to the available parallelism.

use std::env;
use std::num::NonZeroUsize;

use forkjoin::cli::{run_workload, Algorithm, Workload};
use forkjoin::config::EngineConfig;
use forkjoin::generate::Rng;
use forkjoin::kernels::MatrixOp;
use forkjoin::parallel::{Backend, WorkerPool};

fn main() {
    let mut config = EngineConfig::default()
        .with_env()
        .expect("FORKJOIN_WORKERS should be a worker count");
    if let Some(raw) = env::args().nth(1) {
        config.workers = raw.parse().expect("workers should be a positive integer");
    }
    let workers = NonZeroUsize::new(config.workers).expect("workers should be positive");
    let seed = 12345u64;

    let workloads = [
        Workload::new(Algorithm::Matrix(MatrixOp::Add), 1024),
        Workload::new(Algorithm::Matrix(MatrixOp::Multiply), 256),
        Workload {
            iterations: 200,
            ..Workload::new(Algorithm::Jacobi, 1024)
        },
        Workload::new(Algorithm::Floyd, 256),
        Workload::new(Algorithm::Dijkstra, 2000),
        Workload::new(Algorithm::Prim, 1000),
    ];

    for backend in [Backend::Threads, Backend::Rayon] {
        let pool = WorkerPool::new(workers, backend).expect("pool should build");
        println!("Backend: {}  ({} workers)", backend.as_str(), workers);
        println!();
        for workload in &workloads {
            let report = run_workload(workload, &pool, &mut Rng::new(seed)).expect("workload should run");
            let b = report.benchmark;
            println!(
                "{:<9} n={:<5} sequential {:>10.2} ms   parallel {:>10.2} ms   speedup {:>5.2}x   efficiency {:>5.2}",
                report.algorithm, report.size, b.sequential_ms, b.parallel_ms, b.speedup, b.efficiency
            );
            assert!(
                report.results_match,
                "{} n={} parallel result differs from sequential",
                report.algorithm, report.size
            );
        }
        println!();
    }
    println!("(Results match sequential vs parallel)");
}

use serde::Serialize;
use serde_json::{json, Value};

use crate::bench::{append_csv, BenchmarkHarness, BenchmarkRecord, BenchmarkResult};
use crate::config::{EngineConfig, SweepConfig};
use crate::error::Result;
use crate::generate::{self, Rng, MATRIX_VALUE_MAX};
use crate::graph::{self, check_vertex, UNREACHABLE};
use crate::kernels::{self, MatrixOp};
use crate::parallel::{Backend, WorkerPool};

pub const USAGE: &str = "usage: forkjoin <matrix|jacobi|floyd|dijkstra|prim|sweep>";

/// Magnitude bound of generated Jacobi coefficients.
const JACOBI_SCALE: f64 = 10.0;
const GRAPH_DENSITY: f64 = 0.5;
const MAX_EDGE_WEIGHT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Matrix,
    Jacobi,
    Floyd,
    Dijkstra,
    Prim,
    Sweep,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("matrix") => Some(Command::Matrix),
        Some("jacobi") => Some(Command::Jacobi),
        Some("floyd") => Some(Command::Floyd),
        Some("dijkstra") => Some(Command::Dijkstra),
        Some("prim") => Some(Command::Prim),
        Some("sweep") => Some(Command::Sweep),
        _ => None,
    }
}

/// Something the harness can generate a problem for and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Matrix(MatrixOp),
    Jacobi,
    Floyd,
    Dijkstra,
    Prim,
}

impl Algorithm {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "matrix" => Some(Self::Matrix(MatrixOp::Add)),
            "jacobi" => Some(Self::Jacobi),
            "floyd" => Some(Self::Floyd),
            "dijkstra" => Some(Self::Dijkstra),
            "prim" => Some(Self::Prim),
            other => MatrixOp::parse(other).map(Self::Matrix),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Matrix(MatrixOp::Add) => "add",
            Self::Matrix(MatrixOp::Subtract) => "subtract",
            Self::Matrix(MatrixOp::Multiply) => "multiply",
            Self::Jacobi => "jacobi",
            Self::Floyd => "floyd",
            Self::Dijkstra => "dijkstra",
            Self::Prim => "prim",
        }
    }

    const fn default_size(self) -> usize {
        match self {
            Self::Matrix(_) | Self::Jacobi | Self::Floyd => 256,
            Self::Dijkstra => 1000,
            Self::Prim => 500,
        }
    }
}

/// One generated problem: the algorithm, its size, and the knobs the
/// generators and solvers take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Workload {
    pub algorithm: Algorithm,
    pub size: usize,
    pub iterations: usize,
    pub density: f64,
    pub max_weight: u64,
    /// Source (Dijkstra), root (Prim) or first endpoint (Floyd).
    pub from: usize,
    /// Queried endpoint; the last vertex when unset.
    pub to: Option<usize>,
}

impl Workload {
    pub fn new(algorithm: Algorithm, size: usize) -> Self {
        Self {
            algorithm,
            size,
            iterations: crate::config::DEFAULT_MAX_ITERATIONS,
            density: GRAPH_DENSITY,
            max_weight: MAX_EDGE_WEIGHT,
            from: 0,
            to: None,
        }
    }

    fn target(&self) -> usize {
        self.to.unwrap_or(self.size.saturating_sub(1))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub algorithm: &'static str,
    pub size: usize,
    pub backend: Backend,
    pub benchmark: BenchmarkResult,
    pub results_match: bool,
    pub output: Value,
}

impl RunReport {
    pub fn table_header() -> String {
        format!("algorithm\tsize\tbackend\t{}\tmatch", BenchmarkResult::TABLE_HEADER)
    }

    pub fn table_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.algorithm,
            self.size,
            self.backend.as_str(),
            self.benchmark.table_row(),
            self.results_match
        )
    }

    pub fn record(&self) -> BenchmarkRecord {
        BenchmarkRecord::new(self.algorithm, self.size, self.backend, &self.benchmark)
    }
}

/// Generate the problem `workload` describes, then time the sequential
/// baseline against the parallel run on `pool`.
pub fn run_workload(workload: &Workload, pool: &WorkerPool, rng: &mut Rng) -> Result<RunReport> {
    let harness = BenchmarkHarness::new(pool);
    let n = workload.size;
    let (benchmark, results_match, output) = match workload.algorithm {
        Algorithm::Matrix(op) => {
            let lhs = generate::integer_matrix(n, n, MATRIX_VALUE_MAX, rng);
            let rhs = generate::integer_matrix(n, n, MATRIX_VALUE_MAX, rng);
            let m = harness.measure(
                || kernels::apply_sequential(op, &lhs, &rhs),
                |pool| kernels::apply_parallel(pool, op, &lhs, &rhs),
            )?;
            let checksum = m.parallel.as_slice().iter().fold(0i64, |acc, v| acc.wrapping_add(*v));
            let output = json!({
                "rows": m.parallel.rows(),
                "cols": m.parallel.cols(),
                "checksum": checksum,
            });
            (m.result, m.sequential == m.parallel, output)
        }
        Algorithm::Jacobi => {
            let system = generate::diagonally_dominant_system(n, JACOBI_SCALE, rng)?;
            let iterations = workload.iterations;
            let m = harness.measure(
                || Ok(kernels::jacobi_sequential(&system, iterations)),
                |pool| kernels::jacobi_parallel(pool, &system, iterations),
            )?;
            let output = json!({
                "iterations": m.parallel.iterations,
                "residual": m.parallel.residual,
            });
            (m.result, vectors_close(&m.sequential.x, &m.parallel.x), output)
        }
        Algorithm::Floyd => {
            let (from, to) = (workload.from, workload.target());
            check_endpoints(n, &[from, to])?;
            let g = generate::distance_graph(n, workload.density, rng);
            let m = harness.measure(|| graph::floyd_sequential(&g), |pool| graph::floyd_parallel(pool, &g))?;
            let distance = (n > 0).then(|| m.parallel.get(from, to)).filter(|d| d.is_finite());
            let output = json!({
                "from": from,
                "to": to,
                "distance": distance,
            });
            (m.result, m.sequential == m.parallel, output)
        }
        Algorithm::Dijkstra => {
            let (source, target) = (workload.from, workload.target());
            check_endpoints(n, &[source, target])?;
            let g = generate::adjacency_list(n, workload.density, workload.max_weight, rng)?;
            let m = harness.measure(
                || graph::dijkstra_sequential(&g, source),
                |pool| graph::dijkstra_parallel(pool, &g, source),
            )?;
            let distance = m.parallel.get(target).copied().filter(|&d| d != UNREACHABLE);
            let output = json!({
                "source": source,
                "target": target,
                "distance": distance,
                "reachable": m.parallel.iter().filter(|&&d| d != UNREACHABLE).count(),
            });
            (m.result, m.sequential == m.parallel, output)
        }
        Algorithm::Prim => {
            let root = workload.from;
            check_endpoints(n, &[root])?;
            let g = generate::connected_weight_matrix(n, workload.max_weight, rng);
            let m = harness.measure(|| graph::prim_sequential(&g, root), |pool| graph::prim_parallel(pool, &g, root))?;
            let output = json!({
                "root": root,
                "edges": m.parallel.edges.len(),
                "total_weight": m.parallel.total_weight,
                "spanning": m.parallel.spans(n),
            });
            (m.result, m.sequential == m.parallel, output)
        }
    };

    Ok(RunReport {
        algorithm: workload.algorithm.name(),
        size: n,
        backend: pool.backend(),
        benchmark,
        results_match,
        output,
    })
}

/// Run `algorithm` for every size and worker count in `sweep`. Every worker
/// count of one size sees the same generated problem.
pub fn run_sweep(algorithm: Algorithm, sweep: &SweepConfig) -> Result<Vec<RunReport>> {
    let worker_counts = sweep.validate()?;
    let mut rng = sweep.rng()?;
    let mut reports = Vec::with_capacity(sweep.sizes.len() * worker_counts.len());
    for &size in &sweep.sizes {
        let problem_seed = rng.next_u64();
        let workload = Workload {
            iterations: sweep.iterations,
            density: sweep.density,
            max_weight: sweep.max_weight,
            ..Workload::new(algorithm, size)
        };
        for &workers in &worker_counts {
            let pool = WorkerPool::new(workers, sweep.backend)?;
            let report = run_workload(&workload, &pool, &mut Rng::new(problem_seed))?;
            if !report.results_match {
                tracing::warn!(algorithm = report.algorithm, size, workers = workers.get(), "parallel result differs");
            }
            reports.push(report);
        }
    }
    Ok(reports)
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };
    let flags = match Flags::parse(args.get(2..).unwrap_or_default()) {
        Ok(flags) => flags,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{USAGE}");
            return 2;
        }
    };

    match command {
        Command::Matrix => handle_matrix(&flags),
        Command::Jacobi => handle_run(Algorithm::Jacobi, &flags.positional, &flags),
        Command::Floyd => handle_run(Algorithm::Floyd, &flags.positional, &flags),
        Command::Dijkstra => handle_run(Algorithm::Dijkstra, &flags.positional, &flags),
        Command::Prim => handle_run(Algorithm::Prim, &flags.positional, &flags),
        Command::Sweep => handle_sweep(&flags),
    }
}

#[derive(Debug, Default)]
struct Flags<'a> {
    table: bool,
    backend: Option<Backend>,
    config: Option<&'a str>,
    log: Option<&'a str>,
    positional: Vec<&'a String>,
}

impl<'a> Flags<'a> {
    fn parse(args: &'a [String]) -> std::result::Result<Self, String> {
        let mut flags = Flags::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--table" => flags.table = true,
                "--backend" => {
                    let raw = iter.next().ok_or("--backend needs a value")?;
                    flags.backend =
                        Some(Backend::parse(raw).ok_or_else(|| format!("unknown backend '{raw}'"))?);
                }
                "--config" => flags.config = Some(iter.next().ok_or("--config needs a path")?.as_str()),
                "--log" => flags.log = Some(iter.next().ok_or("--log needs a path")?.as_str()),
                _ => flags.positional.push(arg),
            }
        }
        Ok(flags)
    }
}

fn handle_matrix(flags: &Flags) -> i32 {
    let raw = flags.positional.first().map(|s| s.as_str()).unwrap_or("add");
    let Some(op) = MatrixOp::parse(raw) else {
        eprintln!("usage: forkjoin matrix <add|sub|mul> [size] [workers] [seed]");
        return 2;
    };
    handle_run(Algorithm::Matrix(op), flags.positional.get(1..).unwrap_or_default(), flags)
}

/// `args` are the positionals after the command: size, workers, then the
/// algorithm's own parameters, then the seed.
fn handle_run(algorithm: Algorithm, args: &[&String], flags: &Flags) -> i32 {
    let mut config = match engine_config(flags) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return 2;
        }
    };

    let size = parse_usize_arg(args.first().copied(), "size", algorithm.default_size());
    if let Some(raw) = args.get(1).copied() {
        config.workers = parse_usize_arg(Some(raw), "workers", config.workers);
    }
    let mut workload = Workload {
        iterations: config.max_iterations,
        ..Workload::new(algorithm, size)
    };
    let seed_at = match algorithm {
        Algorithm::Matrix(_) => 2,
        Algorithm::Jacobi => {
            workload.iterations = parse_usize_arg(args.get(2).copied(), "iterations", config.max_iterations);
            3
        }
        Algorithm::Floyd | Algorithm::Dijkstra => {
            workload.from = parse_usize_arg(args.get(2).copied(), "from", 0);
            workload.to = args
                .get(3)
                .copied()
                .map(|raw| parse_usize_arg(Some(raw), "to", size.saturating_sub(1)));
            4
        }
        Algorithm::Prim => {
            workload.from = parse_usize_arg(args.get(2).copied(), "root", 0);
            3
        }
    };
    if let Some(raw) = args.get(seed_at) {
        if let Some(seed) = parse_seed(raw) {
            config.seed = Some(seed);
        }
    }

    let pool = match config.build_pool() {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return 2;
        }
    };
    let mut rng = match config.rng() {
        Ok(rng) => rng,
        Err(err) => {
            eprintln!("failed to seed generator: {err}");
            return 1;
        }
    };

    match run_workload(&workload, &pool, &mut rng) {
        Ok(report) => {
            let code = if flags.table {
                println!("{}", RunReport::table_header());
                println!("{}", report.table_row());
                0
            } else {
                print_json(&report, "run report")
            };
            if !report.results_match {
                eprintln!("parallel result differs from the sequential baseline");
                return 1;
            }
            code
        }
        Err(err) => {
            eprintln!("{} failed: {err}", algorithm.name());
            1
        }
    }
}

fn handle_sweep(flags: &Flags) -> i32 {
    let Some(algorithm) = flags.positional.first().and_then(|raw| Algorithm::parse(raw)) else {
        eprintln!("usage: forkjoin sweep <add|sub|mul|jacobi|floyd|dijkstra|prim> [sweep.yaml] [--log <path>]");
        return 2;
    };
    let loaded = match flags.positional.get(1).map(|s| s.as_str()).or(flags.config) {
        Some(path) => SweepConfig::load(path),
        None => Ok(SweepConfig::default()),
    };
    let mut sweep = match loaded.and_then(|sweep| sweep.validate().map(|_| sweep)) {
        Ok(sweep) => sweep,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return 2;
        }
    };
    if let Some(backend) = flags.backend {
        sweep.backend = backend;
    }

    let reports = match run_sweep(algorithm, &sweep) {
        Ok(reports) => reports,
        Err(err) => {
            eprintln!("sweep failed: {err}");
            return 1;
        }
    };

    if let Some(path) = flags.log {
        let records: Vec<BenchmarkRecord> = reports.iter().map(RunReport::record).collect();
        if let Err(err) = append_csv(path, &records) {
            eprintln!("failed to write benchmark log: {err}");
            return 1;
        }
    }

    if flags.table {
        println!("{}", RunReport::table_header());
        for report in &reports {
            println!("{}", report.table_row());
        }
        0
    } else {
        print_json(&reports, "sweep reports")
    }
}

fn engine_config(flags: &Flags) -> Result<EngineConfig> {
    let config = match flags.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut config = config.with_env()?;
    if let Some(backend) = flags.backend {
        config.backend = backend;
    }
    Ok(config)
}

/// Every vertex must exist, except on an empty graph where there is nothing
/// to query and the result is empty.
fn check_endpoints(n: usize, vertices: &[usize]) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    vertices.iter().try_for_each(|&v| check_vertex(v, n))
}

fn print_json<T: Serialize>(payload: &T, what: &str) -> i32 {
    match serde_json::to_string_pretty(payload) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            1
        }
    }
}

fn vectors_close(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-9 * x.abs().max(1.0))
}

fn parse_usize_arg(raw: Option<&String>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

fn parse_seed(raw: &str) -> Option<u64> {
    let parsed = raw.parse::<u64>().ok();
    if parsed.is_none() {
        eprintln!("invalid seed '{raw}', keeping the configured seed");
    }
    parsed
}

//! Error types for forkjoin.

use thiserror::Error;

/// Result type alias using forkjoin's error.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can abort a run.
///
/// Numeric outcomes such as an unreachable vertex or a zero diagonal are not
/// errors; they show up in the algorithm output instead.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Worker count of zero reached a place that needs at least one worker.
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// A buffer handed to a phase does not hold `units * width` items.
    #[error("buffer of length {len} cannot hold {units} units of width {width}")]
    BufferMismatch {
        len: usize,
        units: usize,
        width: usize,
    },

    /// Operand shapes do not line up.
    #[error("dimension mismatch in {op}: expected {expected}, got {got}")]
    DimensionMismatch {
        op: &'static str,
        expected: String,
        got: String,
    },

    /// A vertex index names no vertex of the graph.
    #[error("vertex {vertex} out of range for graph with {vertices} vertices")]
    VertexOutOfRange { vertex: usize, vertices: usize },

    /// The OS refused to create a worker thread. Workers spawned before it
    /// have already been joined when this is returned.
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    /// A worker panicked; all other workers of the phase were joined.
    #[error("worker {worker} panicked during {phase}")]
    WorkerPanicked { worker: usize, phase: &'static str },

    /// The rayon backend could not build its thread pool.
    #[error("failed to build rayon pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// The OS entropy source could not seed a generator.
    #[error("entropy source unavailable: {0}")]
    Entropy(getrandom::Error),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A config value failed validation.
    #[error("invalid config field '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Writing a benchmark report failed.
    #[error("failed to write benchmark report: {0}")]
    Report(#[from] csv::Error),
}

impl EngineError {
    pub(crate) fn dimension(op: &'static str, expected: impl ToString, got: impl ToString) -> Self {
        Self::DimensionMismatch {
            op,
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

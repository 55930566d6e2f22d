pub mod batch;
pub mod iteration;
pub mod pool;
pub mod reduce;

pub use batch::{Partition, Range};
pub use iteration::{BufferPair, GreedySelection, IterationController, IterationOutcome, RoundState};
pub use pool::{Backend, OperationKind, PhaseStats, RangeOperation, WorkerPool};
pub use reduce::{reduce_min, scan_min_by, Extremum, ExtremumScan, ReductionState};

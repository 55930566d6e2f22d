//! Fork-join data-parallel engine with sequential baselines and a speedup
//! harness. Work is split into contiguous ranges, one worker per range, and
//! every phase joins all of its workers before the next one starts.

pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod graph;
pub mod kernels;
pub mod parallel;

pub use error::{EngineError, Result};

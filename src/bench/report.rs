//! Append benchmark rows to a CSV log for trend tracking.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::bench::BenchmarkResult;
use crate::error::Result;
use crate::parallel::Backend;

/// One CSV row: a measured run and what was measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRecord {
    pub recorded_at: String,
    pub algorithm: String,
    pub size: usize,
    pub backend: Backend,
    pub workers: usize,
    pub sequential_ms: f64,
    pub parallel_ms: f64,
    pub speedup: f64,
    pub efficiency: f64,
}

impl BenchmarkRecord {
    /// Stamp `result` with the current UTC time.
    pub fn new(algorithm: &str, size: usize, backend: Backend, result: &BenchmarkResult) -> Self {
        Self {
            recorded_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            algorithm: algorithm.to_string(),
            size,
            backend,
            workers: result.workers,
            sequential_ms: result.sequential_ms,
            parallel_ms: result.parallel_ms,
            speedup: result.speedup,
            efficiency: result.efficiency,
        }
    }
}

/// Append `records` to the CSV file at `path`, writing the header row first
/// if the file is new or empty.
pub fn append_csv(path: impl AsRef<Path>, records: &[BenchmarkRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(csv::Error::from)?;
    let is_empty = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_empty)
        .from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    tracing::debug!(path = %path.display(), rows = records.len(), "appended benchmark rows");
    Ok(())
}

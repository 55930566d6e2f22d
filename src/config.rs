//! Run configuration: YAML files with defaults for every missing field, plus
//! a `FORKJOIN_WORKERS` environment override for the worker count.
//!
//! Validation happens here so the engine only ever sees a `NonZeroUsize`
//! worker count and a positive iteration limit.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::generate::Rng;
use crate::parallel::{Backend, WorkerPool};

/// Environment variable that overrides [EngineConfig::workers].
pub const WORKERS_ENV: &str = "FORKJOIN_WORKERS";

pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

fn default_workers() -> usize {
    thread::available_parallelism().map_or(4, NonZeroUsize::get)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub workers: usize,
    pub max_iterations: usize,
    pub backend: Backend,
    /// Generator seed. None seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            backend: Backend::Threads,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Apply the [WORKERS_ENV] override from the process environment.
    pub fn with_env(self) -> Result<Self> {
        let value = std::env::var(WORKERS_ENV).ok();
        self.with_workers_override(value.as_deref())
    }

    /// Replace the worker count with `value` when one is given.
    pub fn with_workers_override(mut self, value: Option<&str>) -> Result<Self> {
        if let Some(raw) = value {
            self.workers = raw.trim().parse().map_err(|_| EngineError::InvalidConfig {
                field: "workers",
                reason: format!("'{raw}' is not a non-negative integer"),
            })?;
        }
        Ok(self)
    }

    pub fn worker_count(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.workers).ok_or(EngineError::InvalidWorkerCount)
    }

    pub fn validate(&self) -> Result<NonZeroUsize> {
        if self.max_iterations == 0 {
            return Err(EngineError::InvalidConfig {
                field: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        self.worker_count()
    }

    pub fn build_pool(&self) -> Result<WorkerPool> {
        let workers = self.validate()?;
        WorkerPool::new(workers, self.backend)
    }

    pub fn rng(&self) -> Result<Rng> {
        match self.seed {
            Some(seed) => Ok(Rng::new(seed)),
            None => Rng::from_entropy(),
        }
    }
}

/// A benchmark sweep over problem sizes and worker counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub sizes: Vec<usize>,
    pub workers: Vec<usize>,
    /// Edge probability for generated graphs.
    pub density: f64,
    pub max_weight: u64,
    /// Sweeps per Jacobi run.
    pub iterations: usize,
    pub backend: Backend,
    pub seed: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sizes: vec![128, 256, 512],
            workers: vec![2, 4, 8],
            density: 0.5,
            max_weight: 100,
            iterations: 100,
            backend: Backend::Threads,
            seed: None,
        }
    }
}

impl SweepConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Checked worker counts, in sweep order.
    pub fn validate(&self) -> Result<Vec<NonZeroUsize>> {
        if self.sizes.is_empty() {
            return Err(EngineError::InvalidConfig {
                field: "sizes",
                reason: "at least one size is required".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(EngineError::InvalidConfig {
                field: "density",
                reason: format!("{} is not a probability", self.density),
            });
        }
        if self.iterations == 0 {
            return Err(EngineError::InvalidConfig {
                field: "iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.workers.is_empty() {
            return Err(EngineError::InvalidConfig {
                field: "workers",
                reason: "at least one worker count is required".to_string(),
            });
        }
        self.workers
            .iter()
            .map(|&w| NonZeroUsize::new(w).ok_or(EngineError::InvalidWorkerCount))
            .collect()
    }

    pub fn rng(&self) -> Result<Rng> {
        match self.seed {
            Some(seed) => Ok(Rng::new(seed)),
            None => Rng::from_entropy(),
        }
    }
}

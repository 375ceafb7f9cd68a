//! Parallel processing utilities
//!
//! Per-sample scoring is embarrassingly parallel: every row is scored against
//! read-only fitted state. Work runs on the global rayon pool unless a
//! [`ParallelConfig`] pins it to a dedicated pool.

use crate::error::{OutlierError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads (None = use the global rayon pool)
    #[serde(default)]
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n);
        self
    }

    /// Get the number of threads that will be used
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }

    /// Run `op` inside a pool sized by this configuration.
    pub fn install<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match self.n_threads {
            None => Ok(op()),
            Some(0) => Err(OutlierError::invalid_parameter(
                "n_threads",
                0,
                "must be at least 1",
            )),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| OutlierError::ThreadPoolError(e.to_string()))?;
                Ok(pool.install(op))
            }
        }
    }
}

/// Parallel map over `0..n`, preserving index order in the output.
pub fn map_indices<U, F>(n: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Send + Sync,
{
    (0..n).into_par_iter().map(f).collect()
}

//! Score combination module
//!
//! Merges a matrix of normalized scores (rows = samples, columns =
//! detectors) into one consensus score per sample:
//! - Average (optionally weighted)
//! - Maximization
//! - Average of Maximum (AOM)
//! - Maximum of Average (MOA)
//!
//! AOM and MOA split the detector columns into groups with a
//! [`GroupPartition`]. Random grouping is driven by an explicit seed, so the
//! same seed always yields the same consensus scores.

mod grouping;
mod rules;

pub use grouping::{GroupPartition, Grouping};
pub use rules::{aom, aom_with_partition, average, maximization, moa, moa_with_partition};

use crate::error::{OutlierError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A combination rule together with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CombinationStrategy {
    Average {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weights: Option<Vec<f64>>,
    },
    Maximization,
    Aom {
        n_groups: usize,
        #[serde(default)]
        grouping: Grouping,
    },
    Moa {
        n_groups: usize,
        #[serde(default)]
        grouping: Grouping,
    },
}

impl Default for CombinationStrategy {
    fn default() -> Self {
        CombinationStrategy::Average { weights: None }
    }
}

impl CombinationStrategy {
    /// Build a strategy from its name (`average`, `maximization`, `aom`,
    /// `moa`) and the group parameters used by AOM / MOA.
    ///
    /// A missing seed means random grouping with the default seed.
    pub fn from_name(name: &str, n_groups: Option<usize>, seed: Option<u64>) -> Result<Self> {
        let grouping = seed.map_or_else(Grouping::default, |seed| Grouping::Random { seed });
        let require_groups = || {
            n_groups.ok_or_else(|| {
                OutlierError::ConfigError(format!("strategy '{}' requires n_groups", name))
            })
        };

        match name.to_ascii_lowercase().as_str() {
            "average" => Ok(CombinationStrategy::Average { weights: None }),
            "maximization" => Ok(CombinationStrategy::Maximization),
            "aom" => Ok(CombinationStrategy::Aom {
                n_groups: require_groups()?,
                grouping,
            }),
            "moa" => Ok(CombinationStrategy::Moa {
                n_groups: require_groups()?,
                grouping,
            }),
            other => Err(OutlierError::ConfigError(format!(
                "unknown combination strategy '{}', expected one of: average, maximization, aom, moa",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CombinationStrategy::Average { .. } => "average",
            CombinationStrategy::Maximization => "maximization",
            CombinationStrategy::Aom { .. } => "aom",
            CombinationStrategy::Moa { .. } => "moa",
        }
    }
}

/// Combine a normalized score matrix into one consensus score per row
pub fn combine(scores: &Array2<f64>, strategy: &CombinationStrategy) -> Result<Array1<f64>> {
    debug!(
        n_samples = scores.nrows(),
        n_detectors = scores.ncols(),
        strategy = strategy.name(),
        "Combining scores"
    );

    match strategy {
        CombinationStrategy::Average { weights } => average(scores, weights.as_deref()),
        CombinationStrategy::Maximization => maximization(scores),
        CombinationStrategy::Aom { n_groups, grouping } => aom(scores, *n_groups, *grouping),
        CombinationStrategy::Moa { n_groups, grouping } => moa(scores, *n_groups, *grouping),
    }
}

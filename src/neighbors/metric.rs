//! Distance metrics for nearest-neighbor search

use crate::error::{OutlierError, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A symmetric distance between two points of equal length.
///
/// Nearest-neighbor semantics assume the triangle inequality holds; this is
/// not checked.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64;
}

/// Built-in metrics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// L2 distance
    #[default]
    Euclidean,
    /// L1 distance
    Manhattan,
    /// L-infinity distance
    Chebyshev,
    /// Lp distance, `p >= 1`
    Minkowski { p: f64 },
}

impl Metric {
    /// Reject parameters that do not define a metric.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Metric::Minkowski { p } if !(p.is_finite() && p >= 1.0) => Err(
                OutlierError::invalid_parameter("p", p, "Minkowski p must be finite and >= 1"),
            ),
            _ => Ok(()),
        }
    }
}

impl DistanceMetric for Metric {
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs());
        match *self {
            Metric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            Metric::Manhattan => diffs.sum(),
            Metric::Chebyshev => diffs.fold(0.0, f64::max),
            Metric::Minkowski { p } => diffs.map(|d| d.powf(p)).sum::<f64>().powf(1.0 / p),
        }
    }
}

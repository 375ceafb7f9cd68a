//! k-nearest-neighbor distance scoring

use crate::anomaly::{is_training_matrix, FittedScorer, OutlierScorer};
use crate::error::{OutlierError, Result};
use crate::neighbors::{DistanceIndex, Metric, Neighbor};
use crate::utils::validation::{check_n_features, check_training_array};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// How the k neighbor distances are reduced to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnnMethod {
    /// Distance to the k-th nearest neighbor
    #[default]
    Largest,
    /// Mean of the k distances
    Mean,
    /// Median of the k distances
    Median,
}

impl KnnMethod {
    /// Reduce an ascending neighborhood to a single score
    pub fn reduce(&self, neighbors: &[Neighbor]) -> f64 {
        let k = neighbors.len();
        if k == 0 {
            return 0.0;
        }
        match self {
            KnnMethod::Largest => neighbors[k - 1].distance,
            KnnMethod::Mean => neighbors.iter().map(|n| n.distance).sum::<f64>() / k as f64,
            KnnMethod::Median => {
                // Neighborhoods are sorted ascending
                if k % 2 == 1 {
                    neighbors[k / 2].distance
                } else {
                    (neighbors[k / 2 - 1].distance + neighbors[k / 2].distance) / 2.0
                }
            }
        }
    }
}

impl FromStr for KnnMethod {
    type Err = OutlierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "largest" => Ok(KnnMethod::Largest),
            "mean" => Ok(KnnMethod::Mean),
            "median" => Ok(KnnMethod::Median),
            other => Err(OutlierError::ConfigError(format!(
                "unknown kNN method '{}', expected one of: largest, mean, median",
                other
            ))),
        }
    }
}

/// kNN outlier detector: the score of a point is a reduction of the
/// distances to its k nearest training neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnDetector {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance reduction policy
    pub method: KnnMethod,
    /// Distance metric
    pub metric: Metric,
}

impl Default for KnnDetector {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnDetector {
    /// Create a new kNN detector using the `largest` policy
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            method: KnnMethod::Largest,
            metric: Metric::Euclidean,
        }
    }

    /// Set the distance reduction policy
    pub fn with_method(mut self, method: KnnMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the distance metric
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }
}

impl OutlierScorer for KnnDetector {
    type Model = KnnModel;

    fn fit(&self, x: &Array2<f64>) -> Result<KnnModel> {
        check_training_array(x.view())?;
        self.metric.validate()?;
        debug!(
            n_samples = x.nrows(),
            n_features = x.ncols(),
            n_neighbors = self.n_neighbors,
            method = ?self.method,
            "Fitting kNN detector"
        );

        let index = DistanceIndex::new(x.clone(), self.metric)?;
        let neighborhoods = index.kneighbors_self(self.n_neighbors)?;
        let training_scores: Array1<f64> = neighborhoods
            .iter()
            .map(|neighbors| self.method.reduce(neighbors))
            .collect();

        Ok(KnnModel {
            index,
            n_neighbors: self.n_neighbors,
            method: self.method,
            training_scores,
        })
    }
}

/// Fitted kNN detector
#[derive(Debug, Clone)]
pub struct KnnModel {
    index: DistanceIndex,
    n_neighbors: usize,
    method: KnnMethod,
    training_scores: Array1<f64>,
}

impl KnnModel {
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn method(&self) -> KnnMethod {
        self.method
    }

    /// The training index
    pub fn index(&self) -> &DistanceIndex {
        &self.index
    }
}

impl FittedScorer for KnnModel {
    fn training_scores(&self) -> &Array1<f64> {
        &self.training_scores
    }

    fn n_features(&self) -> usize {
        self.index.n_features()
    }

    fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_n_features(x.view(), self.n_features())?;
        if is_training_matrix(x, self.index.reference()) {
            return Ok(self.training_scores.clone());
        }

        let neighborhoods = self.index.kneighbors(x.view(), self.n_neighbors)?;
        Ok(neighborhoods
            .iter()
            .map(|neighbors| self.method.reduce(neighbors))
            .collect())
    }
}

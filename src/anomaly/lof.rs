//! Local Outlier Factor (LOF) scoring

use crate::anomaly::{is_training_matrix, FittedScorer, OutlierScorer};
use crate::error::Result;
use crate::neighbors::{DistanceIndex, Metric, Neighbor};
use crate::utils::map_indices;
use crate::utils::validation::{check_n_features, check_training_array};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Added to the mean reachability distance before taking the reciprocal, so
/// coincident points get a large but finite density.
const LRD_EPSILON: f64 = 1e-10;

/// Per-point LOF quantities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LofDetails {
    /// LOF scores for each point
    pub lof_scores: Array1<f64>,
    /// k-distances for each point
    pub k_distances: Array1<f64>,
    /// Local reachability densities
    pub lrd: Array1<f64>,
}

/// Local Outlier Factor anomaly detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOutlierFactor {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: Metric,
}

impl LocalOutlierFactor {
    /// Create new LOF detector
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            metric: Metric::Euclidean,
        }
    }

    /// Set the distance metric
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }
}

impl Default for LocalOutlierFactor {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Reachability distance from a point to `neighbor`: never smaller than the
/// neighbor's own k-distance.
fn reachability_distance(neighbor: &Neighbor, k_distances: &Array1<f64>) -> f64 {
    k_distances[neighbor.index].max(neighbor.distance)
}

/// Local reachability density: reciprocal of the mean reachability distance
fn local_reachability_density(neighbors: &[Neighbor], k_distances: &Array1<f64>) -> f64 {
    let mean_reach = neighbors
        .iter()
        .map(|n| reachability_distance(n, k_distances))
        .sum::<f64>()
        / neighbors.len() as f64;

    1.0 / (mean_reach + LRD_EPSILON)
}

/// Mean neighbor density relative to the point's own density
fn local_outlier_factor(lrd_point: f64, neighbors: &[Neighbor], lrd: &Array1<f64>) -> f64 {
    let mean_neighbor_lrd =
        neighbors.iter().map(|n| lrd[n.index]).sum::<f64>() / neighbors.len() as f64;
    mean_neighbor_lrd / lrd_point
}

impl OutlierScorer for LocalOutlierFactor {
    type Model = LofModel;

    fn fit(&self, x: &Array2<f64>) -> Result<LofModel> {
        check_training_array(x.view())?;
        self.metric.validate()?;
        debug!(
            n_samples = x.nrows(),
            n_features = x.ncols(),
            n_neighbors = self.n_neighbors,
            "Fitting LOF detector"
        );

        let index = DistanceIndex::new(x.clone(), self.metric)?;
        let neighborhoods = index.kneighbors_self(self.n_neighbors)?;

        // k-distance = distance to the farthest of the k neighbors
        let k_distances: Array1<f64> = neighborhoods
            .iter()
            .map(|neighbors| neighbors.last().map_or(0.0, |n| n.distance))
            .collect();

        let lrd: Array1<f64> = map_indices(neighborhoods.len(), |i| {
            local_reachability_density(&neighborhoods[i], &k_distances)
        })
        .into();

        let lof_scores: Array1<f64> = map_indices(neighborhoods.len(), |i| {
            local_outlier_factor(lrd[i], &neighborhoods[i], &lrd)
        })
        .into();

        Ok(LofModel {
            index,
            n_neighbors: self.n_neighbors,
            training: LofDetails {
                lof_scores,
                k_distances,
                lrd,
            },
        })
    }
}

/// Fitted LOF detector
#[derive(Debug, Clone)]
pub struct LofModel {
    index: DistanceIndex,
    n_neighbors: usize,
    training: LofDetails,
}

impl LofModel {
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// LOF scores, k-distances and densities of the training rows
    pub fn training_details(&self) -> &LofDetails {
        &self.training
    }

    /// LOF quantities for new points, measured against the training set
    pub fn details(&self, x: &Array2<f64>) -> Result<LofDetails> {
        check_n_features(x.view(), self.index.n_features())?;
        if is_training_matrix(x, self.index.reference()) {
            return Ok(self.training.clone());
        }

        let neighborhoods = self.index.kneighbors(x.view(), self.n_neighbors)?;
        let train_k_distances = &self.training.k_distances;
        let train_lrd = &self.training.lrd;

        let per_point = map_indices(neighborhoods.len(), |i| {
            let neighbors = &neighborhoods[i];
            let k_dist = neighbors.last().map_or(0.0, |n| n.distance);
            let lrd = local_reachability_density(neighbors, train_k_distances);
            let lof = local_outlier_factor(lrd, neighbors, train_lrd);
            (lof, k_dist, lrd)
        });

        Ok(LofDetails {
            lof_scores: per_point.iter().map(|p| p.0).collect(),
            k_distances: per_point.iter().map(|p| p.1).collect(),
            lrd: per_point.iter().map(|p| p.2).collect(),
        })
    }
}

impl FittedScorer for LofModel {
    fn training_scores(&self) -> &Array1<f64> {
        &self.training.lof_scores
    }

    fn n_features(&self) -> usize {
        self.index.n_features()
    }

    fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.details(x)?.lof_scores)
    }
}

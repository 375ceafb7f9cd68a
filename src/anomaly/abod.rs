//! Angle-based Outlier Detection (ABOD and FastABOD)
//!
//! For a point `p`, every pair `(a, b)` of candidate points contributes the
//! weighted cosine `<a - p, b - p> / (|a - p|^2 * |b - p|^2)`. Points deep
//! inside a cluster see other points in every direction and get a widely
//! spread distribution; outliers see everything inside a narrow cone. The
//! score is the negated variance, so low variance means a high score.
//!
//! - [`AbodMethod::Full`] uses every training point as a candidate, `O(n^2)`
//!   pairs per point.
//! - [`AbodMethod::Fast`] only uses the `k` nearest training points, `O(k^2)`
//!   pairs per point, trading accuracy for speed.

use crate::anomaly::{is_training_matrix, FittedScorer, OutlierScorer};
use crate::error::{OutlierError, Result};
use crate::neighbors::{DistanceIndex, Metric};
use crate::utils::map_indices;
use crate::utils::validation::{check_n_features, check_training_array};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Squared norms below this are clamped before dividing
const NORM_SQ_FLOOR: f64 = 1e-12;

/// Candidate selection for ABOD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbodMethod {
    /// k nearest neighbors only
    #[default]
    Fast,
    /// All training points
    Full,
}

/// Angle-based outlier detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbodDetector {
    pub method: AbodMethod,
    /// Neighbors used by [`AbodMethod::Fast`]
    pub n_neighbors: usize,
    /// Metric used to select the fast neighborhood
    pub metric: Metric,
}

impl Default for AbodDetector {
    fn default() -> Self {
        Self::fast(5)
    }
}

impl AbodDetector {
    /// FastABOD with `n_neighbors` candidates per point
    pub fn fast(n_neighbors: usize) -> Self {
        Self {
            method: AbodMethod::Fast,
            n_neighbors,
            metric: Metric::Euclidean,
        }
    }

    /// Exact ABOD over all training points
    pub fn full() -> Self {
        Self {
            method: AbodMethod::Full,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }
}

/// Population variance of weighted cosines over all candidate pairs.
///
/// Candidates that coincide with `point` form no angle and are skipped. With
/// fewer than one usable pair the variance is 0.
fn angle_variance<'a, I>(point: ArrayView1<'_, f64>, candidates: I) -> f64
where
    I: IntoIterator<Item = ArrayView1<'a, f64>>,
{
    let offsets: Vec<(Array1<f64>, f64)> = candidates
        .into_iter()
        .filter_map(|c| {
            let diff = &c - &point;
            let norm_sq = diff.dot(&diff);
            (norm_sq > 0.0).then(|| (diff, norm_sq.max(NORM_SQ_FLOOR)))
        })
        .collect();

    // Welford's online mean/variance
    let mut count = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, (a, a_sq)) in offsets.iter().enumerate() {
        for (b, b_sq) in &offsets[i + 1..] {
            let wcos = a.dot(b) / (a_sq * b_sq);
            count += 1;
            let delta = wcos - mean;
            mean += delta / count as f64;
            m2 += delta * (wcos - mean);
        }
    }

    if count == 0 {
        0.0
    } else {
        m2 / count as f64
    }
}

impl OutlierScorer for AbodDetector {
    type Model = AbodModel;

    fn fit(&self, x: &Array2<f64>) -> Result<AbodModel> {
        check_training_array(x.view())?;
        self.metric.validate()?;
        let n = x.nrows();
        debug!(
            n_samples = n,
            n_features = x.ncols(),
            method = ?self.method,
            n_neighbors = self.n_neighbors,
            "Fitting ABOD detector"
        );

        let index = DistanceIndex::new(x.clone(), self.metric)?;
        let training_scores: Array1<f64> = match self.method {
            AbodMethod::Fast => {
                if self.n_neighbors < 2 {
                    return Err(OutlierError::invalid_parameter(
                        "n_neighbors",
                        self.n_neighbors,
                        "FastABOD needs at least 2 neighbors to form an angle",
                    ));
                }
                let neighborhoods = index.kneighbors_self(self.n_neighbors)?;
                map_indices(n, |i| {
                    let candidates = neighborhoods[i].iter().map(|nb| x.row(nb.index));
                    -angle_variance(x.row(i), candidates)
                })
                .into()
            }
            AbodMethod::Full => {
                if n < 3 {
                    return Err(OutlierError::insufficient("ABOD training samples", 3, n));
                }
                map_indices(n, |i| {
                    let candidates = (0..n).filter(|&j| j != i).map(|j| x.row(j));
                    -angle_variance(x.row(i), candidates)
                })
                .into()
            }
        };

        Ok(AbodModel {
            index,
            method: self.method,
            n_neighbors: self.n_neighbors,
            training_scores,
        })
    }
}

/// Fitted ABOD detector
#[derive(Debug, Clone)]
pub struct AbodModel {
    index: DistanceIndex,
    method: AbodMethod,
    n_neighbors: usize,
    training_scores: Array1<f64>,
}

impl AbodModel {
    pub fn method(&self) -> AbodMethod {
        self.method
    }
}

impl FittedScorer for AbodModel {
    fn training_scores(&self) -> &Array1<f64> {
        &self.training_scores
    }

    fn n_features(&self) -> usize {
        self.index.n_features()
    }

    fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_n_features(x.view(), self.n_features())?;
        let x_train = self.index.reference();
        if is_training_matrix(x, x_train) {
            return Ok(self.training_scores.clone());
        }

        let scores = match self.method {
            AbodMethod::Fast => {
                let neighborhoods = self.index.kneighbors(x.view(), self.n_neighbors)?;
                map_indices(x.nrows(), |i| {
                    let candidates = neighborhoods[i].iter().map(|nb| x_train.row(nb.index));
                    -angle_variance(x.row(i), candidates)
                })
            }
            AbodMethod::Full => map_indices(x.nrows(), |i| {
                -angle_variance(x.row(i), x_train.rows())
            }),
        };
        Ok(scores.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, array};

    fn cluster_with_outlier() -> Array2<f64> {
        let mut data = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                data.push(i as f64);
                data.push(j as f64);
            }
        }
        data.extend_from_slice(&[20.0, 20.0]);
        Array2::from_shape_vec((17, 2), data).unwrap()
    }

    #[test]
    fn test_angle_variance_known_value() {
        // Candidates at (1,0), (0,1), (-1,0): wcos values 0, -1, 0
        let point = arr1(&[0.0, 0.0]);
        let cands = array![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]];
        let var = angle_variance(point.view(), cands.rows());
        // mean -1/3, variance = (1/9 + 4/9 + 1/9) / 3
        assert!((var - 2.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_variance_skips_coincident() {
        let point = arr1(&[1.0, 1.0]);
        let cands = array![[1.0, 1.0], [2.0, 1.0]];
        // Only one usable candidate: no pair, variance 0
        assert_eq!(angle_variance(point.view(), cands.rows()), 0.0);
    }

    #[test]
    fn test_full_abod_outlier_highest() {
        let x = cluster_with_outlier();
        let scores = AbodDetector::full().fit_score(&x).unwrap();
        assert_eq!(scores.len(), 17);
        assert!(scores.iter().all(|&s| s <= 0.0));
        let max_idx = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(max_idx, 16);
    }

    #[test]
    fn test_fast_abod_outlier_highest() {
        let x = cluster_with_outlier();
        let scores = AbodDetector::fast(5).fit_score(&x).unwrap();
        let inlier_max = scores.iter().take(16).cloned().fold(f64::MIN, f64::max);
        assert!(scores[16] > inlier_max);
    }

    #[test]
    fn test_abod_score_new_points() {
        let x = cluster_with_outlier();
        for detector in [AbodDetector::full(), AbodDetector::fast(6)] {
            let model = detector.fit(&x).unwrap();
            let scores = model.score(&array![[1.5, 1.5], [-15.0, 30.0]]).unwrap();
            assert!(scores[1] > scores[0]);
            assert_eq!(model.score(&x).unwrap(), *model.training_scores());
        }
    }

    #[test]
    fn test_abod_parameter_checks() {
        let x = cluster_with_outlier();
        assert!(matches!(
            AbodDetector::fast(1).fit(&x).unwrap_err(),
            OutlierError::InvalidParameter { .. }
        ));
        assert!(matches!(
            AbodDetector::fast(17).fit(&x).unwrap_err(),
            OutlierError::InsufficientData { .. }
        ));
        assert!(matches!(
            AbodDetector::full().fit(&array![[0.0], [1.0]]).unwrap_err(),
            OutlierError::InsufficientData { .. }
        ));
    }
}

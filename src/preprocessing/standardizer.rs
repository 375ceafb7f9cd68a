//! Z-score normalization of raw outlier scores
//!
//! Raw scores from different detectors live on unrelated scales. Each score
//! vector is centered and scaled by the mean and standard deviation of its
//! training scores; held-out scores reuse those statistics so train and test
//! stay on one scale.

use crate::error::{OutlierError, Result};
use crate::utils::validation::check_scores;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do with a zero-variance training score vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Fail with [`OutlierError::DegenerateScore`]
    #[default]
    Fail,
    /// Leave scores unchanged (mean 0, std 1)
    PassThrough,
}

/// Score standardizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreStandardizer {
    pub degenerate: DegeneratePolicy,
}

impl ScoreStandardizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate = policy;
        self
    }

    /// Compute mean and population standard deviation of training scores
    pub fn fit(&self, scores: ArrayView1<'_, f64>) -> Result<FittedStandardizer> {
        check_scores(scores)?;

        let n = scores.len() as f64;
        let mean = scores.sum() / n;
        let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();

        // A constant vector can still leave a rounding-level std
        let first = scores[0];
        let constant = scores.iter().all(|&s| s == first);
        if !constant && std > 0.0 && std.is_finite() {
            return Ok(FittedStandardizer { mean, std });
        }

        match self.degenerate {
            DegeneratePolicy::Fail => Err(OutlierError::DegenerateScore(format!(
                "score vector of length {} has zero variance (all values {})",
                scores.len(),
                mean
            ))),
            DegeneratePolicy::PassThrough => {
                warn!(
                    n_scores = scores.len(),
                    value = mean,
                    "Zero-variance scores passed through unnormalized"
                );
                Ok(FittedStandardizer {
                    mean: 0.0,
                    std: 1.0,
                })
            }
        }
    }

    /// Fit on `scores` and return them standardized
    pub fn fit_transform(&self, scores: ArrayView1<'_, f64>) -> Result<(FittedStandardizer, Array1<f64>)> {
        let fitted = self.fit(scores)?;
        let z = fitted.transform(scores);
        Ok((fitted, z))
    }

    /// Standardize each column of a training score matrix (rows = samples,
    /// columns = detectors) by its own statistics, and apply the same
    /// statistics to the matching columns of an optional test matrix.
    pub fn standardize_columns(
        &self,
        train: &Array2<f64>,
        test: Option<&Array2<f64>>,
    ) -> Result<StandardizedScores> {
        if let Some(test) = test {
            if test.ncols() != train.ncols() {
                return Err(OutlierError::InvalidInput(format!(
                    "test scores have {} columns, training scores have {}",
                    test.ncols(),
                    train.ncols()
                )));
            }
        }

        let fitted = train
            .axis_iter(Axis(1))
            .map(|column| self.fit(column))
            .collect::<Result<Vec<_>>>()?;

        let apply = |scores: &Array2<f64>| -> Result<Array2<f64>> {
            let mut out = scores.clone();
            for (mut column, f) in out.axis_iter_mut(Axis(1)).zip(fitted.iter()) {
                check_scores(column.view())?;
                column.mapv_inplace(|s| (s - f.mean) / f.std);
            }
            Ok(out)
        };

        let train_z = apply(train)?;
        let test_z = test.map(apply).transpose()?;

        Ok(StandardizedScores {
            train: train_z,
            test: test_z,
            statistics: fitted,
        })
    }
}

/// Stored training statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedStandardizer {
    pub mean: f64,
    pub std: f64,
}

impl FittedStandardizer {
    /// `(x - mean) / std`
    pub fn transform(&self, scores: ArrayView1<'_, f64>) -> Array1<f64> {
        scores.mapv(|s| (s - self.mean) / self.std)
    }

    /// `z * std + mean`
    pub fn inverse_transform(&self, z: ArrayView1<'_, f64>) -> Array1<f64> {
        z.mapv(|v| v * self.std + self.mean)
    }
}

/// Output of [`ScoreStandardizer::standardize_columns`]
#[derive(Debug, Clone)]
pub struct StandardizedScores {
    pub train: Array2<f64>,
    pub test: Option<Array2<f64>>,
    /// Per-column training statistics
    pub statistics: Vec<FittedStandardizer>,
}

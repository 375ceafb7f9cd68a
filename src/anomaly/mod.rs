//! Outlier scoring module
//!
//! Provides unsupervised outlier scorers:
//! - k-nearest-neighbor distance (largest, mean, median)
//! - Local Outlier Factor (LOF)
//! - Histogram-based Outlier Score (HBOS)
//! - Angle-based Outlier Detection (ABOD, FastABOD)
//!
//! Every scorer is a configuration value whose [`OutlierScorer::fit`] returns
//! an immutable fitted model. A fitted model can be shared across threads and
//! used for any number of [`FittedScorer::score`] calls.

mod abod;
mod hbos;
mod knn;
mod lof;
mod threshold;

pub use abod::{AbodDetector, AbodMethod, AbodModel};
pub use hbos::{BinCount, Binning, FeatureHistogram, HbosDetector, HbosModel, HistogramBin};
pub use knn::{KnnDetector, KnnMethod, KnnModel};
pub use lof::{LocalOutlierFactor, LofDetails, LofModel};
pub use threshold::{AnomalyResult, ContaminationThreshold};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// An unfitted outlier scorer
pub trait OutlierScorer: Send + Sync {
    /// Fitted state produced by [`OutlierScorer::fit`]
    type Model: FittedScorer;

    /// Fit the scorer on training data
    fn fit(&self, x: &Array2<f64>) -> Result<Self::Model>;

    /// Fit and return the raw training scores
    fn fit_score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.fit(x)?.training_scores().clone())
    }
}

/// A fitted outlier scorer
pub trait FittedScorer: Send + Sync {
    /// Raw scores of the training rows (higher = more anomalous)
    fn training_scores(&self) -> &Array1<f64>;

    /// Number of features seen during fit
    fn n_features(&self) -> usize;

    /// Raw scores for new data.
    ///
    /// Scoring the training matrix itself reproduces
    /// [`FittedScorer::training_scores`] exactly.
    fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// True when `x` is the training matrix, so that training rows are scored with
/// self-excluding neighborhoods.
pub(crate) fn is_training_matrix(x: &Array2<f64>, x_train: &Array2<f64>) -> bool {
    x.dim() == x_train.dim() && x == x_train
}

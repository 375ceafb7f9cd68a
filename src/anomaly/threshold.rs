//! Contamination-based thresholding of outlier scores

use crate::error::{OutlierError, Result};
use crate::utils::validation::check_scores;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Anomaly detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Anomaly scores (higher = more anomalous)
    pub scores: Array1<f64>,
    /// Binary labels (1 = outlier, 0 = inlier)
    pub labels: Array1<u8>,
    /// Threshold used for classification
    pub threshold: f64,
    /// Number of anomalies detected
    pub n_anomalies: usize,
}

/// Score cutoff derived from the expected fraction of outliers in the
/// training data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContaminationThreshold {
    contamination: f64,
    threshold: f64,
    train_min: f64,
    train_max: f64,
}

impl ContaminationThreshold {
    /// Fit on raw training scores.
    ///
    /// The threshold is the `100 * (1 - contamination)` percentile of the
    /// training scores, linearly interpolated.
    pub fn fit(training_scores: &Array1<f64>, contamination: f64) -> Result<Self> {
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(OutlierError::invalid_parameter(
                "contamination",
                contamination,
                "must be in (0, 0.5]",
            ));
        }
        check_scores(training_scores.view())?;

        let mut sorted = training_scores.to_vec();
        sorted.sort_by(f64::total_cmp);

        Ok(Self {
            contamination,
            threshold: percentile(&sorted, 1.0 - contamination),
            train_min: sorted[0],
            train_max: sorted[sorted.len() - 1],
        })
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Binary labels: 1 for scores strictly above the threshold
    pub fn predict(&self, scores: &Array1<f64>) -> Array1<u8> {
        scores.mapv(|s| u8::from(s > self.threshold))
    }

    /// Outlier probability by min-max scaling against the training scores,
    /// clipped to `[0, 1]`
    pub fn predict_proba(&self, scores: &Array1<f64>) -> Array1<f64> {
        let range = self.train_max - self.train_min;
        let range = if range > 0.0 { range } else { 1.0 };
        scores.mapv(|s| ((s - self.train_min) / range).clamp(0.0, 1.0))
    }

    /// Scores, labels and counts in one value
    pub fn detect(&self, scores: Array1<f64>) -> AnomalyResult {
        let labels = self.predict(&scores);
        let n_anomalies = labels.iter().filter(|&&l| l == 1).count();

        AnomalyResult {
            scores,
            labels,
            threshold: self.threshold,
            n_anomalies,
        }
    }
}

/// Linear-interpolated quantile `q` in `[0, 1]` of ascending `sorted`
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

//! Multi-detector outlier ensemble

use super::config::EnsembleConfig;
use crate::anomaly::{ContaminationThreshold, FittedScorer};
use crate::combination::{combine, CombinationStrategy};
use crate::error::{OutlierError, Result};
use crate::preprocessing::FittedStandardizer;
use crate::utils::validation::{check_n_features, check_training_array};
use crate::utils::ParallelConfig;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Place score vectors side by side as matrix columns
fn stack_columns(columns: &[Array1<f64>], n_rows: usize) -> Array2<f64> {
    let mut matrix = Array2::zeros((n_rows, columns.len()));
    for (mut target, column) in matrix.axis_iter_mut(Axis(1)).zip(columns.iter()) {
        target.assign(column);
    }
    matrix
}

/// Runs several detectors, normalizes each detector's scores against its
/// training scores and combines them into one consensus score.
#[derive(Debug, Clone)]
pub struct OutlierEnsemble {
    config: EnsembleConfig,
}

impl OutlierEnsemble {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Fit every detector on `x`
    pub fn fit(&self, x: &Array2<f64>) -> Result<FittedEnsemble> {
        self.config.validate()?;
        check_training_array(x.view())?;
        let start = Instant::now();

        let detectors = &self.config.detectors;
        let models: Vec<Box<dyn FittedScorer>> = self.config.parallel.install(|| {
            detectors
                .par_iter()
                .map(|spec| {
                    debug!(detector = spec.name(), "Fitting ensemble member");
                    spec.fit(x)
                })
                .collect::<Result<Vec<_>>>()
        })??;

        let raw: Vec<Array1<f64>> = models.iter().map(|m| m.training_scores().clone()).collect();
        let standardizers = raw
            .iter()
            .map(|scores| self.config.standardizer.fit(scores.view()))
            .collect::<Result<Vec<FittedStandardizer>>>()?;

        let normalized: Vec<Array1<f64>> = raw
            .iter()
            .zip(standardizers.iter())
            .map(|(scores, s)| s.transform(scores.view()))
            .collect();
        let normalized_training = stack_columns(&normalized, x.nrows());
        let training_scores = combine(&normalized_training, &self.config.combination)?;

        let threshold = self
            .config
            .contamination
            .map(|c| ContaminationThreshold::fit(&training_scores, c))
            .transpose()?;

        info!(
            n_samples = x.nrows(),
            n_detectors = models.len(),
            strategy = self.config.combination.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ensemble fitted"
        );

        Ok(FittedEnsemble {
            models,
            standardizers,
            combination: self.config.combination.clone(),
            parallel: self.config.parallel.clone(),
            n_features: x.ncols(),
            normalized_training,
            training_scores,
            threshold,
        })
    }
}

/// Fitted ensemble: fitted detectors plus the per-detector training
/// statistics used to normalize new scores.
pub struct FittedEnsemble {
    models: Vec<Box<dyn FittedScorer>>,
    standardizers: Vec<FittedStandardizer>,
    combination: CombinationStrategy,
    parallel: ParallelConfig,
    n_features: usize,
    normalized_training: Array2<f64>,
    training_scores: Array1<f64>,
    threshold: Option<ContaminationThreshold>,
}

impl FittedEnsemble {
    pub fn n_detectors(&self) -> usize {
        self.models.len()
    }

    /// Per-detector training statistics, in detector order
    pub fn standardizers(&self) -> &[FittedStandardizer] {
        &self.standardizers
    }

    /// Normalized training score matrix (rows = samples, columns = detectors)
    pub fn normalized_training_scores(&self) -> &Array2<f64> {
        &self.normalized_training
    }

    pub fn threshold(&self) -> Option<&ContaminationThreshold> {
        self.threshold.as_ref()
    }

    /// Normalized score matrix for new data, using the training statistics
    pub fn detector_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_n_features(x.view(), self.n_features)?;

        let models = &self.models;
        let raw: Vec<Array1<f64>> = self.parallel.install(|| {
            models
                .par_iter()
                .map(|m| m.score(x))
                .collect::<Result<Vec<_>>>()
        })??;

        let normalized: Vec<Array1<f64>> = raw
            .iter()
            .zip(self.standardizers.iter())
            .map(|(scores, s)| s.transform(scores.view()))
            .collect();
        Ok(stack_columns(&normalized, x.nrows()))
    }

    fn require_threshold(&self) -> Result<&ContaminationThreshold> {
        self.threshold.as_ref().ok_or_else(|| {
            OutlierError::ConfigError("contamination not configured, labels unavailable".to_string())
        })
    }

    /// Binary labels (1 = outlier) from the contamination threshold
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>> {
        let threshold = self.require_threshold()?;
        Ok(threshold.predict(&self.score(x)?))
    }

    /// Outlier probabilities in `[0, 1]`
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let threshold = self.require_threshold()?;
        Ok(threshold.predict_proba(&self.score(x)?))
    }

    /// Training labels
    pub fn training_labels(&self) -> Result<Array1<u8>> {
        Ok(self.require_threshold()?.predict(&self.training_scores))
    }
}

impl FittedScorer for FittedEnsemble {
    /// Consensus scores of the training rows
    fn training_scores(&self) -> &Array1<f64> {
        &self.training_scores
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let normalized = self.detector_scores(x)?;
        combine(&normalized, &self.combination)
    }
}

impl std::fmt::Debug for FittedEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedEnsemble")
            .field("n_detectors", &self.models.len())
            .field("standardizers", &self.standardizers)
            .field("combination", &self.combination)
            .field("n_features", &self.n_features)
            .field("threshold", &self.threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{HbosDetector, KnnDetector, LocalOutlierFactor};
    use crate::combination::Grouping;
    use crate::preprocessing::{DegeneratePolicy, ScoreStandardizer};
    use ndarray::array;

    fn data() -> Array2<f64> {
        let mut rows = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                rows.push(i as f64 * 0.5);
                rows.push(j as f64 * 0.5);
            }
        }
        rows.extend_from_slice(&[12.0, -9.0]);
        Array2::from_shape_vec((37, 2), rows).unwrap()
    }

    fn config() -> EnsembleConfig {
        EnsembleConfig::new()
            .with_detector(KnnDetector::new(4))
            .with_detector(LocalOutlierFactor::new(5))
            .with_detector(HbosDetector::new())
            .with_combination(CombinationStrategy::Aom {
                n_groups: 2,
                grouping: Grouping::Random { seed: 3 },
            })
            .with_contamination(0.05)
    }

    #[test]
    fn test_ensemble_flags_outlier() {
        let x = data();
        let fitted = OutlierEnsemble::new(config()).fit(&x).unwrap();

        assert_eq!(fitted.n_detectors(), 3);
        assert_eq!(fitted.normalized_training_scores().dim(), (37, 3));
        let scores = fitted.training_scores();
        let top = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(top, 36);
        assert_eq!(fitted.training_labels().unwrap()[36], 1);
    }

    #[test]
    fn test_ensemble_score_training_reproduces() {
        let x = data();
        let fitted = OutlierEnsemble::new(config()).fit(&x).unwrap();
        assert_eq!(fitted.score(&x).unwrap(), *fitted.training_scores());
    }

    #[test]
    fn test_ensemble_new_data() {
        let x = data();
        let fitted = OutlierEnsemble::new(config()).fit(&x).unwrap();
        let labels = fitted.predict(&array![[1.2, 1.3], [40.0, 40.0]]).unwrap();
        assert_eq!(labels[1], 1);
        let proba = fitted.predict_proba(&array![[40.0, 40.0]]).unwrap();
        assert_eq!(proba[0], 1.0);
    }

    #[test]
    fn test_ensemble_without_contamination_has_no_labels() {
        let x = data();
        let cfg = EnsembleConfig::new().with_detector(KnnDetector::new(3));
        let fitted = OutlierEnsemble::new(cfg).fit(&x).unwrap();
        assert!(matches!(
            fitted.predict(&x).unwrap_err(),
            OutlierError::ConfigError(_)
        ));
    }

    #[test]
    fn test_ensemble_degenerate_detector() {
        // Every point has an identical neighbor at distance 0
        let x = array![[0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [1.0, 1.0]];
        let cfg = EnsembleConfig::new().with_detector(KnnDetector::new(1));
        assert!(matches!(
            OutlierEnsemble::new(cfg.clone()).fit(&x).unwrap_err(),
            OutlierError::DegenerateScore(_)
        ));

        let cfg = cfg.with_standardizer(
            ScoreStandardizer::new().with_policy(DegeneratePolicy::PassThrough),
        );
        let fitted = OutlierEnsemble::new(cfg).fit(&x).unwrap();
        assert!(fitted.training_scores().iter().all(|&s| s == 0.0));
    }
}

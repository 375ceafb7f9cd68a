//! Ensemble configuration

use crate::anomaly::{
    AbodDetector, FittedScorer, HbosDetector, KnnDetector, LocalOutlierFactor, OutlierScorer,
};
use crate::combination::CombinationStrategy;
use crate::error::{OutlierError, Result};
use crate::preprocessing::ScoreStandardizer;
use crate::utils::ParallelConfig;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One detector of an ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectorSpec {
    Knn(KnnDetector),
    Lof(LocalOutlierFactor),
    Hbos(HbosDetector),
    Abod(AbodDetector),
}

impl DetectorSpec {
    pub fn name(&self) -> &'static str {
        match self {
            DetectorSpec::Knn(_) => "knn",
            DetectorSpec::Lof(_) => "lof",
            DetectorSpec::Hbos(_) => "hbos",
            DetectorSpec::Abod(_) => "abod",
        }
    }

    /// Fit the wrapped detector
    pub fn fit(&self, x: &Array2<f64>) -> Result<Box<dyn FittedScorer>> {
        Ok(match self {
            DetectorSpec::Knn(d) => Box::new(d.fit(x)?),
            DetectorSpec::Lof(d) => Box::new(d.fit(x)?),
            DetectorSpec::Hbos(d) => Box::new(d.fit(x)?),
            DetectorSpec::Abod(d) => Box::new(d.fit(x)?),
        })
    }
}

impl From<KnnDetector> for DetectorSpec {
    fn from(d: KnnDetector) -> Self {
        DetectorSpec::Knn(d)
    }
}

impl From<LocalOutlierFactor> for DetectorSpec {
    fn from(d: LocalOutlierFactor) -> Self {
        DetectorSpec::Lof(d)
    }
}

impl From<HbosDetector> for DetectorSpec {
    fn from(d: HbosDetector) -> Self {
        DetectorSpec::Hbos(d)
    }
}

impl From<AbodDetector> for DetectorSpec {
    fn from(d: AbodDetector) -> Self {
        DetectorSpec::Abod(d)
    }
}

/// Configuration for an outlier ensemble
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Detectors, one score column each, in this order
    pub detectors: Vec<DetectorSpec>,
    /// How normalized columns are merged
    #[serde(default)]
    pub combination: CombinationStrategy,
    /// Normalization of each detector's scores
    #[serde(default)]
    pub standardizer: ScoreStandardizer,
    /// Expected outlier fraction; enables labels when set
    #[serde(default)]
    pub contamination: Option<f64>,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl EnsembleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detector
    pub fn with_detector(mut self, detector: impl Into<DetectorSpec>) -> Self {
        self.detectors.push(detector.into());
        self
    }

    pub fn with_combination(mut self, combination: CombinationStrategy) -> Self {
        self.combination = combination;
        self
    }

    pub fn with_standardizer(mut self, standardizer: ScoreStandardizer) -> Self {
        self.standardizer = standardizer;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = Some(contamination);
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check settings that can be checked without data
    pub fn validate(&self) -> Result<()> {
        if self.detectors.is_empty() {
            return Err(OutlierError::ConfigError(
                "ensemble needs at least one detector".to_string(),
            ));
        }
        let n_groups = match self.combination {
            CombinationStrategy::Aom { n_groups, .. } | CombinationStrategy::Moa { n_groups, .. } => {
                Some(n_groups)
            }
            _ => None,
        };
        if let Some(n_groups) = n_groups {
            if n_groups == 0 || n_groups > self.detectors.len() {
                return Err(OutlierError::ConfigError(format!(
                    "n_groups must be in [1, {}] (one per detector at most), got {}",
                    self.detectors.len(),
                    n_groups
                )));
            }
        }
        if let CombinationStrategy::Average { weights: Some(w) } = &self.combination {
            if w.len() != self.detectors.len() {
                return Err(OutlierError::ConfigError(format!(
                    "expected {} weights, got {}",
                    self.detectors.len(),
                    w.len()
                )));
            }
        }
        if let Some(c) = self.contamination {
            if !(c > 0.0 && c <= 0.5) {
                return Err(OutlierError::invalid_parameter(
                    "contamination",
                    c,
                    "must be in (0, 0.5]",
                ));
            }
        }
        Ok(())
    }
}

//! Outlier Ensemble - unsupervised outlier scoring and score combination
//!
//! This crate assigns every row of a numeric matrix an outlier score (higher
//! means more anomalous) and merges the scores of several detectors into one
//! consensus score.
//!
//! # Modules
//!
//! ## Scoring
//! - [`neighbors`] - k-nearest-neighbor index with pluggable metrics
//! - [`anomaly`] - kNN, LOF, HBOS and ABOD scorers, contamination thresholds
//!
//! ## Combination
//! - [`preprocessing`] - z-score normalization of raw scores
//! - [`combination`] - Average, Maximization, AOM and MOA
//! - [`ensemble`] - configurable multi-detector pipeline
//!
//! ## Utilities
//! - [`utils`] - input validation and parallel helpers
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use outlier_ensemble::prelude::*;
//!
//! let x = array![[0.0, 0.1], [0.2, 0.0], [0.1, 0.2], [0.0, 0.0], [8.0, 9.0]];
//! let model = KnnDetector::new(2).fit(&x).unwrap();
//! let scores = model.training_scores();
//! assert!(scores[4] > scores[0]);
//! ```

// Core error handling
pub mod error;

// Scoring
pub mod anomaly;
pub mod neighbors;

// Combination
pub mod combination;
pub mod ensemble;
pub mod preprocessing;

// Utilities
pub mod utils;

pub use error::{OutlierError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{OutlierError, Result};

    // Neighbors
    pub use crate::neighbors::{DistanceIndex, DistanceMetric, Metric, Neighbor};

    // Scorers
    pub use crate::anomaly::{
        AbodDetector, AbodMethod, BinCount, Binning, ContaminationThreshold, FittedScorer,
        HbosDetector, KnnDetector, KnnMethod, LocalOutlierFactor, OutlierScorer,
    };

    // Normalization and combination
    pub use crate::combination::{combine, CombinationStrategy, GroupPartition, Grouping};
    pub use crate::preprocessing::{DegeneratePolicy, FittedStandardizer, ScoreStandardizer};

    // Ensemble
    pub use crate::ensemble::{DetectorSpec, EnsembleConfig, FittedEnsemble, OutlierEnsemble};

    pub use crate::utils::ParallelConfig;
}

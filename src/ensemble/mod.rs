//! Outlier ensemble module
//!
//! Provides a configurable multi-detector pipeline:
//! - [`EnsembleConfig`] - detectors, combination strategy, normalization
//!   policy and contamination, loadable from JSON
//! - [`OutlierEnsemble`] - fits every detector and standardizes its scores
//! - [`FittedEnsemble`] - consensus scores, labels and probabilities

mod config;
mod outlier_ensemble;

pub use config::{DetectorSpec, EnsembleConfig};
pub use outlier_ensemble::{FittedEnsemble, OutlierEnsemble};

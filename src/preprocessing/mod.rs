//! Score preprocessing module
//!
//! Provides normalization of raw detector scores ahead of combination:
//! - Z-score standardization with stored training statistics
//! - Column-wise standardization of score matrices
//! - Explicit policy for zero-variance score vectors

mod standardizer;

pub use standardizer::{DegeneratePolicy, FittedStandardizer, ScoreStandardizer, StandardizedScores};

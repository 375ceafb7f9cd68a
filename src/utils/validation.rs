//! Input validation shared by scorers, normalizer and combiners

use crate::error::{OutlierError, Result};
use ndarray::{ArrayView1, ArrayView2};

/// Check that a matrix is non-empty and contains only finite values.
pub fn check_array(x: ArrayView2<'_, f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(OutlierError::InvalidInput(format!(
            "expected a non-empty matrix, got shape ({}, {})",
            x.nrows(),
            x.ncols()
        )));
    }

    for (row_idx, row) in x.rows().into_iter().enumerate() {
        if let Some(col_idx) = row.iter().position(|v| !v.is_finite()) {
            return Err(OutlierError::InvalidInput(format!(
                "non-finite value {} at row {}, column {}",
                row[col_idx], row_idx, col_idx
            )));
        }
    }

    Ok(())
}

/// Check a training matrix: finite values and at least two samples.
pub fn check_training_array(x: ArrayView2<'_, f64>) -> Result<()> {
    check_array(x)?;
    if x.nrows() < 2 {
        return Err(OutlierError::insufficient("training", 2, x.nrows()));
    }
    Ok(())
}

/// Check that `x` has the number of features seen during fit.
pub fn check_n_features(x: ArrayView2<'_, f64>, expected: usize) -> Result<()> {
    check_array(x)?;
    if x.ncols() != expected {
        return Err(OutlierError::InvalidInput(format!(
            "expected {} features, got {}",
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

/// Check that a score vector is non-empty and finite.
pub fn check_scores(scores: ArrayView1<'_, f64>) -> Result<()> {
    if scores.is_empty() {
        return Err(OutlierError::InvalidInput("empty score vector".to_string()));
    }
    if let Some(idx) = scores.iter().position(|v| !v.is_finite()) {
        return Err(OutlierError::InvalidInput(format!(
            "non-finite score {} at index {}",
            scores[idx], idx
        )));
    }
    Ok(())
}

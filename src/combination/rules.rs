//! Row-wise combination rules over a score matrix (rows = samples,
//! columns = detectors)

use super::grouping::{GroupPartition, Grouping};
use crate::error::{OutlierError, Result};
use crate::utils::validation::check_array;
use ndarray::{Array1, Array2, Axis};

fn row_mean(scores: &Array2<f64>) -> Result<Array1<f64>> {
    scores
        .mean_axis(Axis(1))
        .ok_or_else(|| OutlierError::InvalidInput("score matrix has no columns".to_string()))
}

fn row_max(scores: &Array2<f64>) -> Array1<f64> {
    scores.fold_axis(Axis(1), f64::NEG_INFINITY, |&acc, &s| acc.max(s))
}

/// Row-wise mean, optionally weighted per detector
pub fn average(scores: &Array2<f64>, weights: Option<&[f64]>) -> Result<Array1<f64>> {
    check_array(scores.view())?;

    let Some(weights) = weights else {
        return row_mean(scores);
    };

    if weights.len() != scores.ncols() {
        return Err(OutlierError::ConfigError(format!(
            "expected {} weights, got {}",
            scores.ncols(),
            weights.len()
        )));
    }
    if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
        return Err(OutlierError::invalid_parameter(
            "weights",
            w,
            "weights must be finite and non-negative",
        ));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(OutlierError::invalid_parameter(
            "weights",
            total,
            "weights must have a positive sum",
        ));
    }

    let w = Array1::from(weights.to_vec());
    Ok(scores.dot(&w) / total)
}

/// Row-wise maximum
pub fn maximization(scores: &Array2<f64>) -> Result<Array1<f64>> {
    check_array(scores.view())?;
    Ok(row_max(scores))
}

/// Per-group reduction: an `n_samples x n_groups` matrix
fn reduce_groups<F>(scores: &Array2<f64>, partition: &GroupPartition, reduce: F) -> Result<Array2<f64>>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>>,
{
    check_array(scores.view())?;
    if partition.n_columns() != scores.ncols() {
        return Err(OutlierError::ConfigError(format!(
            "partition covers {} columns, score matrix has {}",
            partition.n_columns(),
            scores.ncols()
        )));
    }
    partition.validate()?;

    let mut reduced = Array2::zeros((scores.nrows(), partition.n_groups()));
    for (g, group) in partition.groups().iter().enumerate() {
        let members = scores.select(Axis(1), group);
        reduced.column_mut(g).assign(&reduce(&members)?);
    }
    Ok(reduced)
}

/// Average of Maximum over an explicit partition
pub fn aom_with_partition(scores: &Array2<f64>, partition: &GroupPartition) -> Result<Array1<f64>> {
    let group_max = reduce_groups(scores, partition, |m| Ok(row_max(m)))?;
    row_mean(&group_max)
}

/// Maximum of Average over an explicit partition
pub fn moa_with_partition(scores: &Array2<f64>, partition: &GroupPartition) -> Result<Array1<f64>> {
    let group_mean = reduce_groups(scores, partition, row_mean)?;
    Ok(row_max(&group_mean))
}

/// Average of Maximum: max within each of `n_groups` groups, then the mean
/// of the group maxima.
pub fn aom(scores: &Array2<f64>, n_groups: usize, grouping: Grouping) -> Result<Array1<f64>> {
    let partition = GroupPartition::new(scores.ncols(), n_groups, grouping)?;
    aom_with_partition(scores, &partition)
}

/// Maximum of Average: mean within each of `n_groups` groups, then the max
/// of the group means.
pub fn moa(scores: &Array2<f64>, n_groups: usize, grouping: Grouping) -> Result<Array1<f64>> {
    let partition = GroupPartition::new(scores.ncols(), n_groups, grouping)?;
    moa_with_partition(scores, &partition)
}

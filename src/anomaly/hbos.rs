//! Histogram-based Outlier Score (HBOS)
//!
//! Each feature gets its own histogram built over the training data. The
//! score of a point is the sum over features of `ln(1 / density)` of the bin
//! it falls into, so rare placements in any feature raise the score.
//!
//! Features are treated as independent: correlations between features are
//! not modeled and an outlier that is only visible in the joint distribution
//! will not be found.

use crate::anomaly::{FittedScorer, OutlierScorer};
use crate::error::{OutlierError, Result};
use crate::utils::map_indices;
use crate::utils::validation::{check_n_features, check_training_array};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of bins per feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinCount {
    /// `ceil(sqrt(n_samples))`
    #[default]
    Auto,
    /// A fixed number of bins, at most the number of training samples
    Fixed(usize),
}

impl BinCount {
    /// Resolve to a concrete bin count for `n_samples` training rows
    pub fn resolve(&self, n_samples: usize) -> Result<usize> {
        match *self {
            BinCount::Auto => Ok(((n_samples as f64).sqrt().ceil() as usize).max(1)),
            BinCount::Fixed(0) => Err(OutlierError::invalid_parameter(
                "n_bins",
                0,
                "must be at least 1",
            )),
            BinCount::Fixed(b) if b > n_samples => {
                Err(OutlierError::insufficient("n_bins", b, n_samples))
            }
            BinCount::Fixed(b) => Ok(b),
        }
    }
}

/// Bin layout strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binning {
    /// Equal-width bins over the observed range
    #[default]
    Static,
    /// Equal-frequency bins; runs of identical values are never split
    Dynamic,
}

/// One bin of a feature histogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub density: f64,
}

/// Histogram of a single feature.
///
/// Bins are contiguous: the upper edge of bin `i` is the lower edge of bin
/// `i + 1`. Densities integrate to one over the training range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureHistogram {
    edges: Vec<f64>,
    counts: Vec<usize>,
    densities: Vec<f64>,
    min_density: f64,
}

impl FeatureHistogram {
    /// Equal-width histogram over `values`
    pub fn fit_static(values: ArrayView1<'_, f64>, n_bins: usize) -> Result<Self> {
        check_values(values)?;
        let n_bins = n_bins.max(1);
        let (lo, hi) = value_range(values);
        let width = (hi - lo) / n_bins as f64;

        let mut edges: Vec<f64> = (0..n_bins).map(|i| lo + i as f64 * width).collect();
        edges.push(hi);

        let mut counts = vec![0usize; n_bins];
        for &v in values.iter() {
            counts[locate(&edges, v)] += 1;
        }

        Ok(Self::from_counts(edges, counts, values.len()))
    }

    /// Equal-frequency histogram over `values`
    pub fn fit_dynamic(values: ArrayView1<'_, f64>, n_bins: usize) -> Result<Self> {
        check_values(values)?;
        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let per_bin = n.div_ceil(n_bins.max(1)).max(1);

        let mut edges = Vec::new();
        let mut counts = Vec::new();
        let mut start = 0;
        while start < n {
            let mut end = (start + per_bin).min(n);
            while end < n && sorted[end] == sorted[end - 1] {
                end += 1;
            }
            edges.push(sorted[start]);
            counts.push(end - start);
            start = end;
        }
        edges.push(sorted[n - 1]);

        // A trailing run of identical values has zero width: fold it into
        // the previous bin.
        let last = counts.len() - 1;
        if last > 0 && edges[last] == edges[last + 1] {
            let tail = counts.pop().unwrap_or(0);
            counts[last - 1] += tail;
            edges.remove(last);
        }

        if counts.len() == 1 && edges[0] == edges[1] {
            let (lo, hi) = value_range(values);
            edges = vec![lo, hi];
        }

        Ok(Self::from_counts(edges, counts, n))
    }

    fn from_counts(edges: Vec<f64>, counts: Vec<usize>, n_samples: usize) -> Self {
        let densities: Vec<f64> = counts
            .iter()
            .zip(edges.windows(2))
            .map(|(&c, e)| c as f64 / (n_samples as f64 * (e[1] - e[0])))
            .collect();
        let min_density = densities.iter().cloned().fold(f64::INFINITY, f64::min);

        Self {
            edges,
            counts,
            densities,
            min_density,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Lower edge of the first bin and upper edge of the last bin
    pub fn range(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.edges.len() - 1])
    }

    pub fn bins(&self) -> impl Iterator<Item = HistogramBin> + '_ {
        self.edges
            .windows(2)
            .zip(self.counts.iter().zip(self.densities.iter()))
            .map(|(e, (&count, &density))| HistogramBin {
                lower: e[0],
                upper: e[1],
                count,
                density,
            })
    }

    /// Density for `value`.
    ///
    /// Values outside the training range take the lowest bin density of the
    /// feature. A positive `tol` lets values within `tol` edge-bin widths of
    /// the range take the edge bin's density instead.
    pub fn density(&self, value: f64, tol: f64) -> f64 {
        let (lo, hi) = self.range();
        let last = self.n_bins() - 1;

        if value < lo {
            let width = self.edges[1] - self.edges[0];
            if lo - value <= tol * width {
                self.densities[0]
            } else {
                self.min_density
            }
        } else if value > hi {
            let width = self.edges[last + 1] - self.edges[last];
            if value - hi <= tol * width {
                self.densities[last]
            } else {
                self.min_density
            }
        } else {
            self.densities[locate(&self.edges, value)]
        }
    }
}

fn check_values(values: ArrayView1<'_, f64>) -> Result<()> {
    if values.is_empty() {
        return Err(OutlierError::InvalidInput(
            "cannot build a histogram from an empty feature".to_string(),
        ));
    }
    if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
        return Err(OutlierError::InvalidInput(format!(
            "non-finite feature value at index {}",
            idx
        )));
    }
    Ok(())
}

/// Observed range, widened to one unit around a constant feature
fn value_range(values: ArrayView1<'_, f64>) -> (f64, f64) {
    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// Bin index of an in-range value; the last bin includes its upper edge.
fn locate(edges: &[f64], value: f64) -> usize {
    let n_bins = edges.len() - 1;
    edges
        .partition_point(|&e| e <= value)
        .saturating_sub(1)
        .min(n_bins - 1)
}

/// HBOS detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HbosDetector {
    /// Number of bins per feature
    pub n_bins: BinCount,
    /// Bin layout
    pub binning: Binning,
    /// Lower bound applied to densities before taking the logarithm
    pub density_floor: f64,
    /// Out-of-range tolerance, in edge-bin widths; 0 sends every
    /// out-of-range value to the minimum density
    pub tol: f64,
}

impl Default for HbosDetector {
    fn default() -> Self {
        Self {
            n_bins: BinCount::Auto,
            binning: Binning::Static,
            density_floor: 1e-10,
            tol: 0.0,
        }
    }
}

impl HbosDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed number of bins per feature
    pub fn with_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = BinCount::Fixed(n_bins);
        self
    }

    pub fn with_binning(mut self, binning: Binning) -> Self {
        self.binning = binning;
        self
    }

    pub fn with_density_floor(mut self, floor: f64) -> Self {
        self.density_floor = floor;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.density_floor.is_finite() && self.density_floor > 0.0) {
            return Err(OutlierError::invalid_parameter(
                "density_floor",
                self.density_floor,
                "must be finite and positive",
            ));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(OutlierError::invalid_parameter(
                "tol",
                self.tol,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

impl OutlierScorer for HbosDetector {
    type Model = HbosModel;

    fn fit(&self, x: &Array2<f64>) -> Result<HbosModel> {
        check_training_array(x.view())?;
        self.validate()?;
        let n_bins = self.n_bins.resolve(x.nrows())?;
        debug!(
            n_samples = x.nrows(),
            n_features = x.ncols(),
            n_bins,
            binning = ?self.binning,
            "Fitting HBOS detector"
        );

        let histograms = map_indices(x.ncols(), |j| match self.binning {
            Binning::Static => FeatureHistogram::fit_static(x.column(j), n_bins),
            Binning::Dynamic => FeatureHistogram::fit_dynamic(x.column(j), n_bins),
        })
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        let mut model = HbosModel {
            histograms,
            density_floor: self.density_floor,
            tol: self.tol,
            training_scores: Array1::zeros(0),
        };
        model.training_scores = model.raw_scores(x);
        Ok(model)
    }
}

/// Fitted HBOS detector: one histogram per feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HbosModel {
    histograms: Vec<FeatureHistogram>,
    density_floor: f64,
    tol: f64,
    training_scores: Array1<f64>,
}

impl HbosModel {
    pub fn histograms(&self) -> &[FeatureHistogram] {
        &self.histograms
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Array1<f64> {
        map_indices(x.nrows(), |i| {
            x.row(i)
                .iter()
                .zip(self.histograms.iter())
                .map(|(&v, hist)| -hist.density(v, self.tol).max(self.density_floor).ln())
                .sum::<f64>()
        })
        .into()
    }
}

impl FittedScorer for HbosModel {
    fn training_scores(&self) -> &Array1<f64> {
        &self.training_scores
    }

    fn n_features(&self) -> usize {
        self.histograms.len()
    }

    fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_n_features(x.view(), self.n_features())?;
        Ok(self.raw_scores(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, array};

    #[test]
    fn test_static_bins_partition_range() {
        let values = arr1(&[0.0, 1.0, 2.0, 3.0, 4.0, 10.0]);
        let hist = FeatureHistogram::fit_static(values.view(), 5).unwrap();
        let bins: Vec<HistogramBin> = hist.bins().collect();

        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[4].upper, 10.0);
        assert!(bins.windows(2).all(|w| w[0].upper == w[1].lower));
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 6);
        // Bin [0, 2) holds 0 and 1, bin [8, 10] holds 10
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[4].count, 1);

        let area: f64 = bins.iter().map(|b| b.density * (b.upper - b.lower)).sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dynamic_bins_keep_ties_together() {
        let values = arr1(&[1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let hist = FeatureHistogram::fit_dynamic(values.view(), 4).unwrap();
        let bins: Vec<HistogramBin> = hist.bins().collect();

        // Target two per bin; the run of 1.0 forces three into the first bin
        assert_eq!(bins[0].count, 3);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 8);
        assert!(bins.iter().all(|b| b.upper > b.lower));
        assert!(bins.windows(2).all(|w| w[0].upper == w[1].lower));

        let area: f64 = bins.iter().map(|b| b.density * (b.upper - b.lower)).sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dynamic_zero_width_tail_merged() {
        let values = arr1(&[0.0, 1.0, 5.0, 5.0]);
        let hist = FeatureHistogram::fit_dynamic(values.view(), 2).unwrap();
        assert_eq!(hist.n_bins(), 1);
        assert_eq!(hist.range(), (0.0, 5.0));
    }

    #[test]
    fn test_constant_feature() {
        let values = arr1(&[3.0, 3.0, 3.0]);
        let hist = FeatureHistogram::fit_static(values.view(), 2).unwrap();
        assert_eq!(hist.range(), (2.5, 3.5));
        let dynamic = FeatureHistogram::fit_dynamic(values.view(), 2).unwrap();
        assert_eq!(dynamic.range(), (2.5, 3.5));
        assert!((dynamic.density(3.0, 0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_density() {
        let values = arr1(&[0.0, 0.1, 0.2, 0.3, 0.4, 10.0]);
        let hist = FeatureHistogram::fit_static(values.view(), 2).unwrap();
        let min_density = hist.bins().map(|b| b.density).fold(f64::INFINITY, f64::min);
        let edge_density = hist.bins().next().unwrap().density;

        // No tolerance: anything outside the range gets the minimum density
        assert_eq!(hist.density(-1.0, 0.0), min_density);
        assert_eq!(hist.density(10.5, 0.0), min_density);
        // Within half a bin width below the range: edge bin density
        assert_eq!(hist.density(-1.0, 0.5), edge_density);
        // Far away: minimum density, never zero
        assert_eq!(hist.density(100.0, 0.5), min_density);
        assert!(hist.density(-100.0, 0.5) > 0.0);
    }

    #[test]
    fn test_out_of_range_scores_at_least_sparsest_bin() {
        let mut column = vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        column.push(10.0);
        let x = Array2::from_shape_vec((10, 1), column).unwrap();
        let model = HbosDetector::new().with_bins(2).fit(&x).unwrap();

        // Below the range, inside the densest bin, inside the sparse bin
        let s = model.score(&array![[-1.0], [0.3], [10.0]]).unwrap();
        assert!(s[0] >= s[2]);
        assert!(s[0] > s[1]);

        // Opting into a tolerance maps a near miss to the edge bin
        let tolerant = HbosDetector::new().with_bins(2).with_tol(0.5).fit(&x).unwrap();
        let s = tolerant.score(&array![[-1.0], [0.3]]).unwrap();
        assert_eq!(s[0], s[1]);
    }

    #[test]
    fn test_empty_feature_rejected() {
        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            FeatureHistogram::fit_static(empty.view(), 3).unwrap_err(),
            OutlierError::InvalidInput(_)
        ));
        assert!(matches!(
            FeatureHistogram::fit_dynamic(empty.view(), 3).unwrap_err(),
            OutlierError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_hbos_sparse_point_scores_higher() {
        // Dense column near 0, sparse tail up to 10, in both features
        let mut data = Vec::new();
        for i in 0..40 {
            let v = (i % 4) as f64 * 0.1;
            data.push(v);
            data.push(v);
        }
        for i in 0..10 {
            let v = 1.0 + i as f64;
            data.push(v);
            data.push(v);
        }
        let x = Array2::from_shape_vec((50, 2), data).unwrap();
        let model = HbosDetector::new().with_bins(5).fit(&x).unwrap();

        let scores = model.score(&array![[0.1, 0.1], [5.5, 5.5]]).unwrap();
        assert!(scores[1] > scores[0]);
        assert_eq!(model.training_scores().len(), 50);
    }

    #[test]
    fn test_hbos_bin_count_validation() {
        let x = array![[0.0], [1.0], [2.0]];
        assert!(matches!(
            HbosDetector::new().with_bins(4).fit(&x).unwrap_err(),
            OutlierError::InsufficientData { .. }
        ));
        assert!(matches!(
            HbosDetector::new().with_bins(0).fit(&x).unwrap_err(),
            OutlierError::InvalidParameter { .. }
        ));
        assert_eq!(BinCount::Auto.resolve(50).unwrap(), 8);
    }

    #[test]
    fn test_hbos_reproducible() {
        let x = array![[0.0, 1.0], [0.5, 1.5], [1.0, 1.0], [4.0, 0.0]];
        let model = HbosDetector::new().with_binning(Binning::Dynamic).fit(&x).unwrap();
        assert_eq!(model.score(&x).unwrap(), *model.training_scores());
    }
}

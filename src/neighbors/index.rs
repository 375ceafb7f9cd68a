//! Brute-force k-nearest-neighbor index

use super::metric::{DistanceMetric, Metric};
use crate::error::{OutlierError, Result};
use crate::utils::map_indices;
use crate::utils::validation::{check_array, check_n_features};
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A reference point returned by a neighbor query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row index in the reference matrix
    pub index: usize,
    /// Distance from the query point
    pub distance: f64,
}

/// Heap entry ordered by (distance, index) so that equal distances keep the
/// lower original index.
#[derive(Debug, Clone, Copy)]
struct Candidate(f64, usize);

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: peek() returns the current worst neighbor
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Nearest-neighbor index over a fixed reference matrix.
///
/// Supports both self-queries (the query row is excluded from its own
/// neighborhood) and queries with external points against the reference set.
#[derive(Debug, Clone)]
pub struct DistanceIndex<M = Metric> {
    reference: Array2<f64>,
    metric: M,
}

impl<M: DistanceMetric> DistanceIndex<M> {
    /// Build an index over `reference`.
    pub fn new(reference: Array2<f64>, metric: M) -> Result<Self> {
        check_array(reference.view())?;
        Ok(Self { reference, metric })
    }

    /// Number of reference rows
    pub fn n_reference(&self) -> usize {
        self.reference.nrows()
    }

    /// Number of features per point
    pub fn n_features(&self) -> usize {
        self.reference.ncols()
    }

    /// The reference matrix the index was built from
    pub fn reference(&self) -> &Array2<f64> {
        &self.reference
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Distance between two points under the index metric
    pub fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        self.metric.distance(a, b)
    }

    /// The `k` reference points closest to `point`, ascending by distance.
    pub fn query(&self, point: ArrayView1<'_, f64>, k: usize) -> Result<Vec<Neighbor>> {
        if point.len() != self.n_features() {
            return Err(OutlierError::InvalidInput(format!(
                "query point has {} features, index has {}",
                point.len(),
                self.n_features()
            )));
        }
        if let Some(idx) = point.iter().position(|v| !v.is_finite()) {
            return Err(OutlierError::InvalidInput(format!(
                "non-finite value in query point at position {}",
                idx
            )));
        }
        check_k(k, self.n_reference())?;
        Ok(self.select(point, k, None))
    }

    /// The `k` neighbors of reference row `i`, excluding row `i` itself.
    pub fn query_self(&self, i: usize, k: usize) -> Result<Vec<Neighbor>> {
        if i >= self.n_reference() {
            return Err(OutlierError::InvalidInput(format!(
                "reference index {} out of bounds for {} rows",
                i,
                self.n_reference()
            )));
        }
        check_k(k, self.n_reference() - 1)?;
        Ok(self.select(self.reference.row(i), k, Some(i)))
    }

    /// Neighborhoods of every row of `x` against the reference set.
    pub fn kneighbors(&self, x: ArrayView2<'_, f64>, k: usize) -> Result<Vec<Vec<Neighbor>>> {
        check_n_features(x, self.n_features())?;
        check_k(k, self.n_reference())?;
        Ok(map_indices(x.nrows(), |i| self.select(x.row(i), k, None)))
    }

    /// Self-excluding neighborhoods of every reference row.
    pub fn kneighbors_self(&self, k: usize) -> Result<Vec<Vec<Neighbor>>> {
        check_k(k, self.n_reference() - 1)?;
        Ok(map_indices(self.n_reference(), |i| {
            self.select(self.reference.row(i), k, Some(i))
        }))
    }

    fn select(&self, point: ArrayView1<'_, f64>, k: usize, exclude: Option<usize>) -> Vec<Neighbor> {
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);

        for (i, row) in self.reference.rows().into_iter().enumerate() {
            if Some(i) == exclude {
                continue;
            }

            let candidate = Candidate(self.metric.distance(point, row), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|Candidate(distance, index)| Neighbor { index, distance })
            .collect()
    }
}

fn check_k(k: usize, available: usize) -> Result<()> {
    if k == 0 {
        return Err(OutlierError::invalid_parameter(
            "n_neighbors",
            k,
            "must be at least 1",
        ));
    }
    if k > available {
        return Err(OutlierError::insufficient("n_neighbors", k, available));
    }
    Ok(())
}

//! Nearest-neighbor search
//!
//! Provides the distance index shared by the proximity-based and angle-based
//! scorers:
//! - [`DistanceMetric`] / [`Metric`] - pluggable symmetric distances
//! - [`DistanceIndex`] - k-nearest-neighbor queries with optional self-exclusion

mod index;
mod metric;

pub use index::{DistanceIndex, Neighbor};
pub use metric::{DistanceMetric, Metric};

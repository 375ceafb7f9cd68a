//! Utility functions and types

mod parallel;
pub mod validation;

pub use parallel::{map_indices, ParallelConfig};

//! Partitioning of detector columns into groups for AOM / MOA

use crate::error::{OutlierError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// How columns are assigned to groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Seeded shuffle of the columns, then a consecutive split
    Random { seed: u64 },
    /// Consecutive split of the columns in their given order
    Contiguous,
}

impl Default for Grouping {
    fn default() -> Self {
        Grouping::Random { seed: 42 }
    }
}

/// A partition of `n_columns` column indices into non-empty, disjoint,
/// exhaustive groups.
///
/// Indices inside a group are ascending and groups are ordered by their
/// smallest index, so a partition into singletons (or a single group)
/// visits columns in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPartition {
    groups: Vec<Vec<usize>>,
    n_columns: usize,
}

impl GroupPartition {
    /// Split `n_columns` into `n_groups` groups whose sizes differ by at most
    /// one; the first `n_columns % n_groups` groups take the extra column.
    pub fn new(n_columns: usize, n_groups: usize, grouping: Grouping) -> Result<Self> {
        if n_groups == 0 || n_groups > n_columns {
            return Err(OutlierError::ConfigError(format!(
                "n_groups must be in [1, {}], got {}",
                n_columns, n_groups
            )));
        }

        let mut order: Vec<usize> = (0..n_columns).collect();
        if let Grouping::Random { seed } = grouping {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }

        let base = n_columns / n_groups;
        let extra = n_columns % n_groups;
        let mut groups = Vec::with_capacity(n_groups);
        let mut start = 0;
        for g in 0..n_groups {
            let size = base + usize::from(g < extra);
            groups.push(order[start..start + size].to_vec());
            start += size;
        }

        Self::from_groups(groups, n_columns)
    }

    /// Use a caller-supplied partition after validating it
    pub fn from_groups(mut groups: Vec<Vec<usize>>, n_columns: usize) -> Result<Self> {
        for group in &mut groups {
            group.sort_unstable();
        }
        groups.sort_by_key(|g| g.first().copied().unwrap_or(usize::MAX));

        let partition = Self { groups, n_columns };
        partition.validate()?;
        Ok(partition)
    }

    /// Check that groups are non-empty, disjoint and cover every column.
    pub fn validate(&self) -> Result<()> {
        let mut seen = vec![false; self.n_columns];
        for (g, group) in self.groups.iter().enumerate() {
            if group.is_empty() {
                return Err(OutlierError::ConfigError(format!("group {} is empty", g)));
            }
            for &col in group {
                if col >= self.n_columns {
                    return Err(OutlierError::ConfigError(format!(
                        "group {} references column {}, only {} columns",
                        g, col, self.n_columns
                    )));
                }
                if seen[col] {
                    return Err(OutlierError::ConfigError(format!(
                        "column {} assigned to more than one group",
                        col
                    )));
                }
                seen[col] = true;
            }
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(OutlierError::ConfigError(format!(
                "column {} not assigned to any group",
                missing
            )));
        }
        Ok(())
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_split_sizes() {
        let p = GroupPartition::new(7, 3, Grouping::Contiguous).unwrap();
        assert_eq!(p.groups(), &[vec![0, 1, 2], vec![3, 4], vec![5, 6]]);
    }

    #[test]
    fn test_random_split_is_seeded() {
        let a = GroupPartition::new(10, 3, Grouping::Random { seed: 7 }).unwrap();
        let b = GroupPartition::new(10, 3, Grouping::Random { seed: 7 }).unwrap();
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.groups().iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        let mut sizes: Vec<usize> = a.groups().iter().map(|g| g.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![3, 3, 4]);
    }

    #[test]
    fn test_n_groups_out_of_range() {
        assert!(matches!(
            GroupPartition::new(3, 0, Grouping::Contiguous).unwrap_err(),
            OutlierError::ConfigError(_)
        ));
        assert!(GroupPartition::new(3, 4, Grouping::default()).is_err());
    }

    #[test]
    fn test_from_groups_validation() {
        assert!(GroupPartition::from_groups(vec![vec![2, 0], vec![1]], 3).is_ok());
        // overlap
        assert!(GroupPartition::from_groups(vec![vec![0, 1], vec![1, 2]], 3).is_err());
        // missing column 2
        assert!(GroupPartition::from_groups(vec![vec![0], vec![1]], 3).is_err());
        // empty group
        assert!(GroupPartition::from_groups(vec![vec![0, 1, 2], vec![]], 3).is_err());
        // out of range
        assert!(GroupPartition::from_groups(vec![vec![0, 1, 2, 3]], 3).is_err());
    }

    #[test]
    fn test_groups_are_normalized() {
        let p = GroupPartition::from_groups(vec![vec![3, 1], vec![2, 0]], 4).unwrap();
        assert_eq!(p.groups(), &[vec![0, 2], vec![1, 3]]);
    }
}

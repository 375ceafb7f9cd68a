//! Integration test: normalization and score combination

use ndarray::{array, Array1, Array2};
use outlier_ensemble::combination::{aom, average, maximization, moa};
use outlier_ensemble::prelude::*;

fn assert_close(a: &Array1<f64>, b: &Array1<f64>) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-12, "{} != {}", x, y);
    }
}

fn score_matrix() -> Array2<f64> {
    array![
        [0.3, -1.2, 2.0, 0.4, -0.1],
        [1.5, 0.2, -0.7, 0.9, 1.1],
        [-2.0, -0.4, 0.1, -1.3, 0.6],
        [0.0, 3.1, 0.8, -0.2, -0.9],
    ]
}

#[test]
fn test_three_detector_arithmetic() {
    // columns [1, 0, -1], [0, 1, -1], [-1, -1, 2]
    let s = Array2::from_shape_vec(
        (3, 3),
        vec![1.0, 0.0, -1.0, 0.0, 1.0, -1.0, -1.0, -1.0, 2.0],
    )
    .unwrap()
    .reversed_axes();

    let avg = combine(&s, &CombinationStrategy::default()).unwrap();
    assert_eq!(avg, array![0.0, 0.0, 0.0]);

    let max = combine(&s, &CombinationStrategy::Maximization).unwrap();
    assert_eq!(max, array![1.0, 1.0, 2.0]);
}

#[test]
fn test_average_never_exceeds_maximization() {
    let s = score_matrix();
    let avg = average(&s, None).unwrap();
    let max = maximization(&s).unwrap();
    for (a, m) in avg.iter().zip(max.iter()) {
        assert!(a <= m);
    }
}

#[test]
fn test_grouped_rules_reduce_at_extremes() {
    let s = score_matrix();
    let m = s.ncols();
    let avg = average(&s, None).unwrap();
    let max = maximization(&s).unwrap();

    for seed in [0, 7, 42] {
        let grouping = Grouping::Random { seed };
        assert_close(&aom(&s, 1, grouping).unwrap(), &max);
        assert_close(&moa(&s, 1, grouping).unwrap(), &avg);
        assert_close(&aom(&s, m, grouping).unwrap(), &avg);
        assert_close(&moa(&s, m, grouping).unwrap(), &max);
    }
}

#[test]
fn test_grouped_rules_bounded_by_average_and_max() {
    let s = score_matrix();
    let avg = average(&s, None).unwrap();
    let max = maximization(&s).unwrap();
    let aom_scores = aom(&s, 2, Grouping::default()).unwrap();
    let moa_scores = moa(&s, 2, Grouping::default()).unwrap();
    for i in 0..s.nrows() {
        assert!(aom_scores[i] >= avg[i] - 1e-12 && aom_scores[i] <= max[i] + 1e-12);
        assert!(moa_scores[i] >= avg[i] - 1e-12 && moa_scores[i] <= max[i] + 1e-12);
    }
}

#[test]
fn test_seed_reproducibility() {
    let s = score_matrix();
    let strategy = CombinationStrategy::from_name("aom", Some(2), Some(1234)).unwrap();
    let a = combine(&s, &strategy).unwrap();
    let b = combine(&s, &strategy).unwrap();
    assert_eq!(a, b);

    let p1 = GroupPartition::new(5, 3, Grouping::Random { seed: 99 }).unwrap();
    let p2 = GroupPartition::new(5, 3, Grouping::Random { seed: 99 }).unwrap();
    assert_eq!(p1, p2);
}

#[test]
fn test_partition_is_exhaustive_and_balanced() {
    for n_groups in 1..=7 {
        let p = GroupPartition::new(7, n_groups, Grouping::Random { seed: 5 }).unwrap();
        let mut seen: Vec<usize> = p.groups().iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());

        let sizes: Vec<usize> = p.groups().iter().map(Vec::len).collect();
        let min = *sizes.iter().min().unwrap();
        let max = *sizes.iter().max().unwrap();
        assert!(max - min <= 1);
        assert!(min >= 1);
    }
}

#[test]
fn test_invalid_group_count() {
    let s = score_matrix();
    for n_groups in [0, 6] {
        let err = combine(
            &s,
            &CombinationStrategy::Aom {
                n_groups,
                grouping: Grouping::Contiguous,
            },
        )
        .unwrap_err();
        assert!(matches!(err, OutlierError::ConfigError(_)));
    }
}

#[test]
fn test_standardize_then_combine() {
    let raw_a = array![1.0, 2.0, 3.0, 10.0];
    let raw_b = array![100.0, 120.0, 110.0, 400.0];
    let standardizer = ScoreStandardizer::new();

    let (_, za) = standardizer.fit_transform(raw_a.view()).unwrap();
    let (_, zb) = standardizer.fit_transform(raw_b.view()).unwrap();
    for z in [&za, &zb] {
        assert!(z.mean().unwrap().abs() < 1e-12);
        let var = z.mapv(|v| v * v).mean().unwrap();
        assert!((var - 1.0).abs() < 1e-12);
    }

    let mut s = Array2::zeros((4, 2));
    s.column_mut(0).assign(&za);
    s.column_mut(1).assign(&zb);
    let consensus = combine(&s, &CombinationStrategy::default()).unwrap();
    let top = consensus
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(top, 3);
}

#[test]
fn test_constant_scores_are_degenerate() {
    let flat = array![0.5, 0.5, 0.5];
    assert!(matches!(
        ScoreStandardizer::new().fit(flat.view()).unwrap_err(),
        OutlierError::DegenerateScore(_)
    ));
    let fitted = ScoreStandardizer::new()
        .with_policy(DegeneratePolicy::PassThrough)
        .fit(flat.view())
        .unwrap();
    assert_eq!(fitted.transform(flat.view()), flat);
}

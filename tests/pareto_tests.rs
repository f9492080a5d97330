// tests/pareto_tests.rs
//! Non-dominated sorting and crowding distance on random populations

use featsel_core::selection::pso::{crowding_distances, crowding_sort, dominates, fronts, nondominated_sort, truncate};
use proptest::prelude::*;

/// Scores shaped like the swarm's: integer accuracy, negated energy
fn population() -> impl Strategy<Value = Vec<[f64; 2]>> {
    prop::collection::vec((0u32..500, 0u32..200), 1..40)
        .prop_map(|points| points.into_iter().map(|(a, e)| [a as f64, -(e as f64) / 4.0]).collect())
}

#[test]
fn test_single_member_is_its_own_front() {
    let (front, rest) = nondominated_sort(vec![[420.0, -12.5]]);
    assert_eq!(front, vec![[420.0, -12.5]]);
    assert!(rest.is_empty());
}

#[test]
fn test_small_fronts_are_all_boundary() {
    let d = crowding_distances(&[[1.0, 2.0], [2.0, 1.0]]);
    assert!(d.iter().all(|d| d.is_infinite()));
}

#[test]
fn test_crowding_sort_keeps_boundaries_first() {
    let front = vec![[5.0, 0.0], [4.0, 1.0], [3.9, 1.1], [1.0, 4.0], [0.0, 5.0]];
    let sorted = crowding_sort(front);
    let head = &sorted[..2];
    assert!(head.contains(&[5.0, 0.0]));
    assert!(head.contains(&[0.0, 5.0]));
    // The tightly packed pair is the most crowded
    assert!(sorted[3..].contains(&[3.9, 1.1]) || sorted[3..].contains(&[4.0, 1.0]));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_front_members_do_not_dominate_each_other(points in population()) {
        let (front, _) = nondominated_sort(points);
        for a in &front {
            for b in &front {
                prop_assert!(!dominates(*a, *b));
            }
        }
    }

    #[test]
    fn prop_every_rest_member_is_covered_by_the_front(points in population()) {
        let (front, rest) = nondominated_sort(points);
        for r in &rest {
            let covered = front.iter().any(|f| dominates(*f, *r) || f == r);
            prop_assert!(covered, "{:?} is not covered by {:?}", r, front);
        }
    }

    #[test]
    fn prop_sort_partitions_the_population(points in population()) {
        let n = points.len();
        let (front, rest) = nondominated_sort(points);
        prop_assert!(!front.is_empty());
        prop_assert_eq!(front.len() + rest.len(), n);
    }

    #[test]
    fn prop_fronts_cover_everything(points in population()) {
        let n = points.len();
        let all = fronts(points);
        prop_assert_eq!(all.iter().map(Vec::len).sum::<usize>(), n);
    }

    #[test]
    fn prop_crowding_boundaries_are_infinite(points in population()) {
        let (front, _) = nondominated_sort(points);
        let d = crowding_distances(&front);
        prop_assert_eq!(d.len(), front.len());
        prop_assert!(d.iter().all(|d| *d >= 0.0));

        for dimension in 0..2 {
            let best = front.iter().map(|p| p[dimension]).fold(f64::NEG_INFINITY, f64::max);
            let worst = front.iter().map(|p| p[dimension]).fold(f64::INFINITY, f64::min);
            for (p, d) in front.iter().zip(&d) {
                if p[dimension] == best || p[dimension] == worst {
                    // Fronts have no duplicates, so extremes are unique per dimension
                    prop_assert!(d.is_infinite());
                }
            }
        }
    }

    #[test]
    fn prop_truncate_respects_capacity(points in population(), capacity in 1usize..30) {
        let n = points.len();
        let next = truncate(points.clone(), capacity);
        prop_assert_eq!(next.len(), n.min(capacity));

        // The best front survives whenever it fits
        let (front, _) = nondominated_sort(points);
        if front.len() <= capacity {
            for member in &front {
                prop_assert!(next.contains(member));
            }
        }
    }
}

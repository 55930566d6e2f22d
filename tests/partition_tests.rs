use std::num::NonZeroUsize;

use forkjoin::parallel::{Partition, Range};

fn k(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn seven_units_over_three_workers() {
    let plan = Partition::plan(7, k(3));
    assert_eq!(plan.ranges(), &[Range::new(0, 3), Range::new(3, 5), Range::new(5, 7)]);
}

#[test]
fn ranges_cover_disjointly_and_balance() {
    for units in 0..=64 {
        for workers in 1..=17 {
            let plan = Partition::plan(units, k(workers));
            if units == 0 {
                assert!(plan.is_empty());
                continue;
            }
            assert_eq!(plan.len(), workers, "units={units} workers={workers}");

            let mut cursor = 0;
            for range in plan.iter() {
                assert_eq!(range.start, cursor, "gap or overlap at units={units} workers={workers}");
                assert!(range.end >= range.start);
                cursor = range.end;
            }
            assert_eq!(cursor, units);

            let sizes: Vec<usize> = plan.iter().map(|r| r.len()).collect();
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(max - min <= 1, "unbalanced sizes {sizes:?}");
            assert_eq!(plan.active(), units.min(workers));
        }
    }
}

#[test]
fn larger_ranges_come_first() {
    let sizes: Vec<usize> = Partition::plan(10, k(4)).iter().map(|r| r.len()).collect();
    assert_eq!(sizes, vec![3, 3, 2, 2]);
}

#[test]
fn planning_is_deterministic() {
    assert_eq!(Partition::plan(1001, k(7)), Partition::plan(1001, k(7)));
}

#[test]
fn more_workers_than_units_leaves_trailing_ranges_empty() {
    let plan = Partition::plan(3, k(5));
    let sizes: Vec<usize> = plan.iter().map(|r| r.len()).collect();
    assert_eq!(sizes, vec![1, 1, 1, 0, 0]);
}

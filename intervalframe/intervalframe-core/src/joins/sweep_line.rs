//! Sweep-line overlap scan of one group.
//!
//! Both sides are visited in `(start, row_id)` order. Right intervals are
//! admitted once their start is below the current left end, and evicted as
//! soon as their end is at or before the current left start. Left starts never
//! decrease, so an evicted interval cannot overlap any later left interval.
//!
//! Left ends are not monotonic: a long left interval may admit right intervals
//! that a later, shorter one must not see. The active set is therefore kept
//! ordered by position in the sorted right side, and only the prefix starting
//! below the current left end is reported. A min-heap on `end` drives eviction.
//! Every visited entry is a match, so the cost of a query is its output size
//! plus logarithmic bookkeeping.

use crate::joins::intervals::Interval;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

/// Returns, for every interval of `left` (same positions), the right intervals overlapping it.
pub fn sweep(left: &[Interval], right: &[Interval]) -> Vec<Vec<Interval>> {
    let mut matches: Vec<Vec<Interval>> = vec![Vec::new(); left.len()];

    let mut left_order: Vec<usize> = (0..left.len()).filter(|&i| !left[i].is_empty()).collect();
    left_order.sort_unstable_by_key(|&i| (left[i].start, left[i].row_id));

    let mut right_sorted: Vec<Interval> = right.iter().filter(|r| !r.is_empty()).copied().collect();
    right_sorted.sort_unstable_by_key(|r| (r.start, r.row_id));

    // (end, position in right_sorted)
    let mut by_end: BinaryHeap<Reverse<(i64, usize)>> = BinaryHeap::new();
    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut next = 0;

    for i in left_order {
        let query = &left[i];
        while next < right_sorted.len() && right_sorted[next].start < query.end {
            by_end.push(Reverse((right_sorted[next].end, next)));
            active.insert(next);
            next += 1;
        }
        while let Some(&Reverse((end, pos))) = by_end.peek() {
            if end > query.start {
                break;
            }
            by_end.pop();
            active.remove(&pos);
        }
        let below = right_sorted.partition_point(|r| r.start < query.end);
        matches[i].extend(active.range(..below).map(|&pos| right_sorted[pos]));
    }
    matches
}

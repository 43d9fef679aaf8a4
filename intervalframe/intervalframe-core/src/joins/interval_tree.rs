//! Augmented interval tree over a sorted array.
//!
//! Intervals are sorted by `(start, row_id)` and the tree is implicit: the node
//! of a sub-range `[lo, hi)` is its midpoint, its children the two halves. Each
//! node stores the maximum `end` of its subtree, which lets a query skip every
//! subtree that ends at or before the query start.

use crate::joins::intervals::Interval;

#[derive(Debug, Clone)]
pub struct IntervalTree {
    intervals: Vec<Interval>,
    max_end: Vec<i64>,
}

#[inline]
fn midpoint(lo: usize, hi: usize) -> usize {
    lo + (hi - lo) / 2
}

impl IntervalTree {
    pub fn new(intervals: &[Interval]) -> Self {
        let mut intervals: Vec<Interval> =
            intervals.iter().filter(|i| !i.is_empty()).copied().collect();
        intervals.sort_unstable_by_key(|i| (i.start, i.row_id));
        let mut tree = IntervalTree {
            max_end: vec![i64::MIN; intervals.len()],
            intervals,
        };
        tree.index(0, tree.intervals.len());
        tree
    }

    fn index(&mut self, lo: usize, hi: usize) -> i64 {
        if lo >= hi {
            return i64::MIN;
        }
        let mid = midpoint(lo, hi);
        let left = self.index(lo, mid);
        let right = self.index(mid + 1, hi);
        let max = self.intervals[mid].end.max(left).max(right);
        self.max_end[mid] = max;
        max
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Calls `f` for every stored interval overlapping `query`.
    pub fn query<F>(&self, query: &Interval, mut f: F)
    where
        F: FnMut(&Interval),
    {
        if query.is_empty() {
            return;
        }
        let mut stack = vec![(0, self.intervals.len())];
        while let Some((lo, hi)) = stack.pop() {
            if lo >= hi {
                continue;
            }
            let mid = midpoint(lo, hi);
            // nothing in this subtree reaches past the query start
            if self.max_end[mid] <= query.start {
                continue;
            }
            let node = &self.intervals[mid];
            if node.overlaps(query) {
                f(node);
            }
            stack.push((lo, mid));
            if node.start < query.end {
                stack.push((mid + 1, hi));
            }
        }
    }

    pub fn overlapping(&self, query: &Interval) -> Vec<Interval> {
        let mut result = Vec::new();
        self.query(query, |i| result.push(*i));
        result
    }
}

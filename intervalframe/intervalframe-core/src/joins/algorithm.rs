use crate::joins::interval_tree::IntervalTree;
use crate::joins::intervals::{Interval, Position};
use crate::session_context::Algorithm;
use bio::data_structures::interval_tree as rust_bio;
use std::fmt;
use std::fmt::{Debug, Formatter};

/// Overlap index built from the right-hand intervals of one group.
pub enum IntervalJoinAlgorithm {
    IntervalTree(IntervalTree),
    /// Entries carry the position of the interval in `intervals`.
    ArrayIntervalTree {
        tree: rust_bio::ArrayBackedIntervalTree<i64, Position>,
        intervals: Vec<Interval>,
    },
}

impl Debug for IntervalJoinAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IntervalJoinAlgorithm::IntervalTree(tree) => {
                f.debug_tuple("IntervalTree").field(&tree.len()).finish()
            }
            IntervalJoinAlgorithm::ArrayIntervalTree { intervals, .. } => f
                .debug_tuple("ArrayIntervalTree")
                .field(&intervals.len())
                .finish(),
        }
    }
}

impl IntervalJoinAlgorithm {
    /// `None` for [`Algorithm::SweepLine`], which scans instead of indexing.
    pub fn new(alg: &Algorithm, intervals: &[Interval]) -> Option<IntervalJoinAlgorithm> {
        match alg {
            Algorithm::SweepLine => None,
            Algorithm::IntervalTree => {
                Some(IntervalJoinAlgorithm::IntervalTree(IntervalTree::new(intervals)))
            }
            Algorithm::ArrayIntervalTree => {
                let intervals: Vec<Interval> =
                    intervals.iter().filter(|i| !i.is_empty()).copied().collect();
                let tree = intervals
                    .iter()
                    .enumerate()
                    .map(|(pos, i)| (i.start..i.end, pos))
                    .collect::<rust_bio::ArrayBackedIntervalTree<i64, Position>>();
                Some(IntervalJoinAlgorithm::ArrayIntervalTree { tree, intervals })
            }
        }
    }

    /// Calls `f` for every indexed interval overlapping `query`, in no particular order.
    pub fn get<F>(&self, query: &Interval, mut f: F)
    where
        F: FnMut(&Interval),
    {
        if query.is_empty() {
            return;
        }
        match self {
            IntervalJoinAlgorithm::IntervalTree(tree) => tree.query(query, f),
            IntervalJoinAlgorithm::ArrayIntervalTree { tree, intervals } => {
                for entry in tree.find(query.start..query.end) {
                    f(&intervals[*entry.data()])
                }
            }
        }
    }

    pub fn overlapping(&self, query: &Interval) -> Vec<Interval> {
        let mut result = Vec::new();
        self.get(query, |i| result.push(*i));
        result
    }
}

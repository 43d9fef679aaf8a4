use crate::joins::algorithm::IntervalJoinAlgorithm;
use crate::joins::intervals::{Interval, Position};
use crate::joins::partition::Group;
use crate::joins::sweep_line::sweep;
use crate::session_context::Algorithm;
use log::trace;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Row ids of one left and one right input row whose intervals overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchedPair {
    pub left: Position,
    pub right: Position,
}

/// Pairs of one group: left intervals in original order, each followed by its
/// matches ordered by right start, then right row.
pub fn scan_group(group: &Group, algorithm: &Algorithm) -> Vec<MatchedPair> {
    if !group.is_joinable() {
        return Vec::new();
    }
    let mut pairs = Vec::new();
    let mut emit = |left: &Interval, mut matches: Vec<Interval>| {
        matches.sort_unstable_by_key(|r| (r.start, r.row_id));
        pairs.extend(matches.into_iter().map(|r| MatchedPair {
            left: left.row_id,
            right: r.row_id,
        }));
    };

    match IntervalJoinAlgorithm::new(algorithm, &group.right) {
        Some(index) => {
            for left in &group.left {
                emit(left, index.overlapping(left));
            }
        }
        None => {
            for (left, matches) in group.left.iter().zip(sweep(&group.left, &group.right)) {
                emit(left, matches);
            }
        }
    }
    trace!(
        "Scanned group of {} left and {} right intervals: {} pairs",
        group.left.len(),
        group.right.len(),
        pairs.len()
    );
    pairs
}

pub(crate) fn worker_count(target_partitions: usize) -> usize {
    if target_partitions > 0 {
        target_partitions
    } else {
        std::thread::available_parallelism().map_or(1, |n| n.get())
    }
}

/// Scans every group and concatenates the pairs in group order.
///
/// Groups are claimed by up to `workers` threads; each worker owns the index
/// and the pair buffer of the group it is processing. The result does not
/// depend on the number of workers.
pub fn scan_groups(groups: &[Group], algorithm: &Algorithm, workers: usize) -> Vec<MatchedPair> {
    let joinable: Vec<usize> = (0..groups.len())
        .filter(|&i| groups[i].is_joinable())
        .collect();
    let worker_count = workers.max(1).min(joinable.len());

    if worker_count <= 1 {
        return joinable
            .into_iter()
            .flat_map(|i| scan_group(&groups[i], algorithm))
            .collect();
    }

    let next_idx = AtomicUsize::new(0);
    let mut slots: Vec<Vec<MatchedPair>> = vec![Vec::new(); joinable.len()];
    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let joinable = &joinable;
            let next_idx = &next_idx;
            handles.push(scope.spawn(move || {
                let mut local = Vec::new();
                loop {
                    let idx = next_idx.fetch_add(1, Ordering::Relaxed);
                    if idx >= joinable.len() {
                        break;
                    }
                    local.push((idx, scan_group(&groups[joinable[idx]], algorithm)));
                }
                local
            }));
        }
        for handle in handles {
            match handle.join() {
                Ok(local) => {
                    for (idx, pairs) in local {
                        slots[idx] = pairs;
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    });
    slots.into_iter().flatten().collect()
}

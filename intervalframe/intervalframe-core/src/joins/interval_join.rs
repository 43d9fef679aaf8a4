use crate::error::{Result, Side};
use crate::joins::intervals::{extract, ColIntervals, ExtractStats, ExtractedSide, JoinColumns};
use crate::joins::partition::partition;
use crate::joins::scan::{scan_groups, worker_count, MatchedPair};
use crate::joins::utils::{assemble, build_join_schema, take_rows};
use crate::session_context::IntervalJoinConfig;
use datafusion::arrow::record_batch::RecordBatch;
use log::{debug, info};
use std::time::Instant;

/// Overlap operations between two record batches.
///
/// The value only holds the column selectors and configuration; every call
/// builds its own groups and indexes and leaves the inputs untouched.
#[derive(Debug, Clone)]
pub struct IntervalJoin {
    on: ColIntervals,
    by: Vec<String>,
    config: IntervalJoinConfig,
}

/// Matched pairs of one call, with what extraction saw on each side.
struct Matches {
    pairs: Vec<MatchedPair>,
    left: ExtractedSide,
    right_stats: ExtractStats,
    groups: usize,
}

impl IntervalJoin {
    pub fn new(on: ColIntervals, by: Vec<String>, config: IntervalJoinConfig) -> Self {
        IntervalJoin { on, by, config }
    }

    /// Every pair of overlapping left and right rows of the same group.
    ///
    /// Output columns are the left columns followed by the right columns,
    /// colliding right names suffixed with [`IntervalJoinConfig::suffix`].
    pub fn join(&self, left: &RecordBatch, right: &RecordBatch) -> Result<RecordBatch> {
        let start = Instant::now();
        let schema = build_join_schema(&left.schema(), &right.schema(), &self.config.suffix)?;
        let matches = self.matches(left, right)?;
        let batch = assemble(schema, left, right, &matches.pairs)?;
        self.log_done("join", start, left, right, &matches, batch.num_rows());
        Ok(batch)
    }

    /// Left rows overlapping at least one right row of their group, in input order.
    pub fn overlap(&self, left: &RecordBatch, right: &RecordBatch) -> Result<RecordBatch> {
        let start = Instant::now();
        let matches = self.matches(left, right)?;
        let matched = matched_left_rows(left.num_rows(), &matches.pairs);
        let rows: Vec<usize> = (0..left.num_rows()).filter(|&i| matched[i]).collect();
        let batch = take_rows(left, &rows)?;
        self.log_done("overlap", start, left, right, &matches, batch.num_rows());
        Ok(batch)
    }

    /// Left rows overlapping no right row of their group, in input order.
    ///
    /// Rows with a null key or bound are kept since they match nothing; rows
    /// removed by [`InvalidIntervalPolicy::Drop`](crate::InvalidIntervalPolicy::Drop)
    /// are not. For the right rows overlapping no left row, swap the inputs
    /// (and the column selectors of [`ColIntervals`]).
    pub fn nonoverlapping(&self, left: &RecordBatch, right: &RecordBatch) -> Result<RecordBatch> {
        let start = Instant::now();
        let matches = self.matches(left, right)?;
        let mut excluded = matched_left_rows(left.num_rows(), &matches.pairs);
        for &row in &matches.left.dropped {
            excluded[row] = true;
        }
        let rows: Vec<usize> = (0..left.num_rows()).filter(|&i| !excluded[i]).collect();
        let batch = take_rows(left, &rows)?;
        self.log_done("nonoverlapping", start, left, right, &matches, batch.num_rows());
        Ok(batch)
    }

    fn matches(&self, left: &RecordBatch, right: &RecordBatch) -> Result<Matches> {
        let columns = JoinColumns::resolve(&left.schema(), &right.schema(), &self.on, &self.by)?;
        let converter = columns.key_converter()?;
        let policy = self.config.invalid_intervals;
        let closed = self.config.closed_intervals;

        let left_side = extract(
            left,
            Side::Left,
            &columns.left,
            converter.as_ref(),
            policy,
            closed,
        )?;
        let right_side = extract(
            right,
            Side::Right,
            &columns.right,
            converter.as_ref(),
            policy,
            closed,
        )?;

        let groups = partition(&left_side, &right_side);
        let workers = worker_count(self.config.target_partitions);
        debug!(
            "Scanning {} groups with {} using up to {} workers",
            groups.len(),
            self.config.algorithm,
            workers
        );
        let pairs = scan_groups(&groups, &self.config.algorithm, workers);

        Ok(Matches {
            pairs,
            right_stats: right_side.stats,
            left: left_side,
            groups: groups.len(),
        })
    }

    fn log_done(
        &self,
        operation: &str,
        start: Instant,
        left: &RecordBatch,
        right: &RecordBatch,
        matches: &Matches,
        output_rows: usize,
    ) {
        let left_stats = &matches.left.stats;
        let right_stats = &matches.right_stats;
        info!(
            "Interval {} ({}) of {} x {} rows in {} groups: {} pairs, {} output rows in {:?}",
            operation,
            self.config.algorithm,
            left.num_rows(),
            right.num_rows(),
            matches.groups,
            matches.pairs.len(),
            output_rows,
            start.elapsed()
        );
        let skipped = left_stats.null_keys
            + left_stats.null_bounds
            + right_stats.null_keys
            + right_stats.null_bounds;
        if skipped > 0 {
            debug!(
                "Skipped {} rows with null keys or bounds (left: {:?}, right: {:?})",
                skipped, left_stats, right_stats
            );
        }
    }
}

fn matched_left_rows(num_rows: usize, pairs: &[MatchedPair]) -> Vec<bool> {
    let mut matched = vec![false; num_rows];
    for pair in pairs {
        matched[pair.left] = true;
    }
    matched
}

fn owned(by: &[&str]) -> Vec<String> {
    by.iter().map(|s| s.to_string()).collect()
}

/// See [`IntervalJoin::join`].
pub fn join(
    left: &RecordBatch,
    right: &RecordBatch,
    on: &ColIntervals,
    by: &[&str],
    config: IntervalJoinConfig,
) -> Result<RecordBatch> {
    IntervalJoin::new(on.clone(), owned(by), config).join(left, right)
}

/// See [`IntervalJoin::overlap`].
pub fn overlap(
    left: &RecordBatch,
    right: &RecordBatch,
    on: &ColIntervals,
    by: &[&str],
    config: IntervalJoinConfig,
) -> Result<RecordBatch> {
    IntervalJoin::new(on.clone(), owned(by), config).overlap(left, right)
}

/// See [`IntervalJoin::nonoverlapping`].
pub fn nonoverlapping(
    left: &RecordBatch,
    right: &RecordBatch,
    on: &ColIntervals,
    by: &[&str],
    config: IntervalJoinConfig,
) -> Result<RecordBatch> {
    IntervalJoin::new(on.clone(), owned(by), config).nonoverlapping(left, right)
}

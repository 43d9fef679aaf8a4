use crate::joins::intervals::{ExtractedSide, Interval};
use ahash::RandomState;
use datafusion::arrow::row::Row;
use hashbrown::HashMap;
use log::debug;

/// Intervals of both inputs sharing one group key, each side in original row order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Group {
    pub left: Vec<Interval>,
    pub right: Vec<Interval>,
}

impl Group {
    /// Only groups with intervals on both sides can produce pairs.
    pub fn is_joinable(&self) -> bool {
        !self.left.is_empty() && !self.right.is_empty()
    }
}

/// Groups in order of first appearance, scanning the left input first.
pub(crate) fn partition(left: &ExtractedSide, right: &ExtractedSide) -> Vec<Group> {
    let groups = match (&left.keys, &right.keys) {
        (Some(left_keys), Some(right_keys)) => {
            // fixed seeds keep group numbering identical across runs
            let mut group_of: HashMap<Row<'_>, usize, RandomState> =
                HashMap::with_capacity_and_hasher(
                    left.intervals.len(),
                    RandomState::with_seeds(0, 0, 0, 0),
                );
            let mut groups: Vec<Group> = Vec::new();

            for interval in &left.intervals {
                let key = left_keys.row(interval.row_id);
                let idx = *group_of.entry(key).or_insert_with(|| {
                    groups.push(Group::default());
                    groups.len() - 1
                });
                groups[idx].left.push(*interval);
            }
            for interval in &right.intervals {
                let key = right_keys.row(interval.row_id);
                let idx = *group_of.entry(key).or_insert_with(|| {
                    groups.push(Group::default());
                    groups.len() - 1
                });
                groups[idx].right.push(*interval);
            }
            groups
        }
        _ => vec![Group {
            left: left.intervals.clone(),
            right: right.intervals.clone(),
        }],
    };

    debug!(
        "Partitioned {} left and {} right intervals into {} groups ({} joinable)",
        left.intervals.len(),
        right.intervals.len(),
        groups.len(),
        groups.iter().filter(|g| g.is_joinable()).count()
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Side;
    use crate::joins::intervals::{extract, ColIntervals, JoinColumns};
    use crate::session_context::InvalidIntervalPolicy;
    use datafusion::arrow::array::{Int64Array, StringArray};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use datafusion::arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn batch(contig: Vec<Option<&str>>, start: Vec<i64>, end: Vec<i64>) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("contig", DataType::Utf8, true),
            Field::new("start", DataType::Int64, false),
            Field::new("end", DataType::Int64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(contig)),
                Arc::new(Int64Array::from(start)),
                Arc::new(Int64Array::from(end)),
            ],
        )
        .unwrap()
    }

    fn groups_of(left: &RecordBatch, right: &RecordBatch, by: &[&str]) -> Vec<Group> {
        let by: Vec<String> = by.iter().map(|s| s.to_string()).collect();
        let cols = JoinColumns::resolve(
            left.schema().as_ref(),
            right.schema().as_ref(),
            &ColIntervals::same("start", "end"),
            &by,
        )
        .unwrap();
        let converter = cols.key_converter().unwrap();
        let l = extract(
            left,
            Side::Left,
            &cols.left,
            converter.as_ref(),
            InvalidIntervalPolicy::Reject,
            false,
        )
        .unwrap();
        let r = extract(
            right,
            Side::Right,
            &cols.right,
            converter.as_ref(),
            InvalidIntervalPolicy::Reject,
            false,
        )
        .unwrap();
        partition(&l, &r)
    }

    #[test]
    fn groups_by_first_appearance_keeping_row_order() {
        let left = batch(
            vec![Some("chr2"), Some("chr1"), Some("chr2")],
            vec![1, 2, 3],
            vec![10, 20, 30],
        );
        let right = batch(
            vec![Some("chr1"), Some("chrX"), Some("chr2")],
            vec![4, 5, 6],
            vec![40, 50, 60],
        );
        let groups = groups_of(&left, &right, &["contig"]);

        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups[0],
            Group {
                left: vec![Interval::new(1, 10, 0), Interval::new(3, 30, 2)],
                right: vec![Interval::new(6, 60, 2)],
            }
        );
        assert_eq!(
            groups[1],
            Group {
                left: vec![Interval::new(2, 20, 1)],
                right: vec![Interval::new(4, 40, 0)],
            }
        );
        // right-only group is kept, with nothing to join
        assert!(groups[2].left.is_empty());
        assert!(!groups[2].is_joinable());
    }

    #[test]
    fn null_keys_never_form_a_group() {
        let left = batch(vec![None, Some("chr1")], vec![1, 2], vec![10, 20]);
        let right = batch(vec![None], vec![1], vec![10]);
        let groups = groups_of(&left, &right, &["contig"]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].left, vec![Interval::new(2, 20, 1)]);
        assert!(groups[0].right.is_empty());
    }

    #[test]
    fn no_keys_is_a_single_group() {
        let left = batch(vec![Some("chr1"), None], vec![1, 2], vec![10, 20]);
        let right = batch(vec![Some("chr2")], vec![1], vec![10]);
        let groups = groups_of(&left, &right, &[]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].left.len(), 2);
        assert_eq!(groups[0].right.len(), 1);
    }
}

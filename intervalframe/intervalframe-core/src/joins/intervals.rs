use crate::error::{IntervalJoinError, Result, Side};
use crate::session_context::InvalidIntervalPolicy;
use datafusion::arrow::array::{Array, ArrayRef, AsArray};
use datafusion::arrow::compute::{cast_with_options, CastOptions};
use datafusion::arrow::datatypes::{DataType, Int64Type, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::row::{RowConverter, Rows, SortField};
use log::debug;

pub type Position = usize;

/// A half-open interval `[start, end)` of one input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
    pub row_id: Position,
}

impl Interval {
    pub fn new(start: i64, end: i64, row_id: Position) -> Self {
        Interval { start, end, row_id }
    }

    /// A zero-width interval contains no points and overlaps nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True iff the two intervals share at least one point.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }
}

/// Names of the two columns holding the bounds of an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColInterval {
    start: String,
    end: String,
}

impl ColInterval {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        ColInterval {
            start: start.into(),
            end: end.into(),
        }
    }
    pub fn start(&self) -> &str {
        &self.start
    }
    pub fn end(&self) -> &str {
        &self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColIntervals {
    pub left_interval: ColInterval,
    pub right_interval: ColInterval,
}

impl ColIntervals {
    pub fn new(left_interval: ColInterval, right_interval: ColInterval) -> Self {
        ColIntervals {
            left_interval,
            right_interval,
        }
    }

    /// Both inputs store their bounds under the same column names.
    pub fn same(start: &str, end: &str) -> Self {
        Self::new(ColInterval::new(start, end), ColInterval::new(start, end))
    }
}

/// Physical column positions of one side, resolved once against its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedColumns {
    pub start: usize,
    pub end: usize,
    pub keys: Vec<usize>,
}

/// Column layout of both inputs, checked before any row is read.
#[derive(Debug)]
pub(crate) struct JoinColumns {
    pub left: ResolvedColumns,
    pub right: ResolvedColumns,
    /// Present iff there is at least one grouping column.
    pub key_fields: Option<Vec<SortField>>,
}

/// Boundary columns of all four roles must agree on this kind.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BoundaryKind {
    Integer,
    Temporal(DataType),
}

fn boundary_kind(data_type: &DataType) -> Option<BoundaryKind> {
    match data_type {
        dt if dt.is_integer() => Some(BoundaryKind::Integer),
        DataType::Date32 | DataType::Date64 => Some(BoundaryKind::Temporal(data_type.clone())),
        DataType::Timestamp(unit, _) => {
            Some(BoundaryKind::Temporal(DataType::Timestamp(*unit, None)))
        }
        _ => None,
    }
}

fn index_of(schema: &Schema, side: Side, column: &str) -> Result<usize> {
    schema
        .index_of(column)
        .map_err(|_| IntervalJoinError::MissingColumn {
            side,
            column: column.to_string(),
        })
}

impl JoinColumns {
    pub fn resolve(
        left: &Schema,
        right: &Schema,
        on: &ColIntervals,
        by: &[String],
    ) -> Result<JoinColumns> {
        let left_cols = Self::resolve_side(left, Side::Left, &on.left_interval, by)?;
        let right_cols = Self::resolve_side(right, Side::Right, &on.right_interval, by)?;

        let bounds = [
            (Side::Left, left, left_cols.start),
            (Side::Left, left, left_cols.end),
            (Side::Right, right, right_cols.start),
            (Side::Right, right, right_cols.end),
        ];
        let mut expected: Option<BoundaryKind> = None;
        for (side, schema, idx) in bounds {
            let field = schema.field(idx);
            let kind = boundary_kind(field.data_type()).ok_or_else(|| {
                IntervalJoinError::TypeMismatch {
                    side,
                    column: field.name().clone(),
                    data_type: field.data_type().clone(),
                    expected: "an integer, date or timestamp type".to_string(),
                }
            })?;
            match &expected {
                None => expected = Some(kind),
                Some(e) if *e == kind => {}
                Some(e) => {
                    return Err(IntervalJoinError::TypeMismatch {
                        side,
                        column: field.name().clone(),
                        data_type: field.data_type().clone(),
                        expected: match e {
                            BoundaryKind::Integer => "an integer type".to_string(),
                            BoundaryKind::Temporal(dt) => dt.to_string(),
                        },
                    })
                }
            }
        }

        let key_fields = if by.is_empty() {
            None
        } else {
            let mut fields = Vec::with_capacity(by.len());
            for (&l, &r) in left_cols.keys.iter().zip(right_cols.keys.iter()) {
                let lf = left.field(l);
                let rf = right.field(r);
                if lf.data_type().is_nested() {
                    return Err(IntervalJoinError::TypeMismatch {
                        side: Side::Left,
                        column: lf.name().clone(),
                        data_type: lf.data_type().clone(),
                        expected: "a non-nested type".to_string(),
                    });
                }
                if lf.data_type() != rf.data_type() {
                    return Err(IntervalJoinError::TypeMismatch {
                        side: Side::Right,
                        column: rf.name().clone(),
                        data_type: rf.data_type().clone(),
                        expected: lf.data_type().to_string(),
                    });
                }
                fields.push(SortField::new(lf.data_type().clone()));
            }
            if !RowConverter::supports_fields(&fields) {
                let lf = left.field(left_cols.keys[0]);
                return Err(IntervalJoinError::TypeMismatch {
                    side: Side::Left,
                    column: lf.name().clone(),
                    data_type: lf.data_type().clone(),
                    expected: "an equality-comparable type".to_string(),
                });
            }
            Some(fields)
        };

        Ok(JoinColumns {
            left: left_cols,
            right: right_cols,
            key_fields,
        })
    }

    fn resolve_side(
        schema: &Schema,
        side: Side,
        interval: &ColInterval,
        by: &[String],
    ) -> Result<ResolvedColumns> {
        Ok(ResolvedColumns {
            start: index_of(schema, side, interval.start())?,
            end: index_of(schema, side, interval.end())?,
            keys: by
                .iter()
                .map(|k| index_of(schema, side, k))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    /// One converter shared by both sides, so that encoded keys compare byte-wise.
    pub fn key_converter(&self) -> Result<Option<RowConverter>> {
        match &self.key_fields {
            Some(fields) => Ok(Some(RowConverter::new(fields.clone())?)),
            None => Ok(None),
        }
    }
}

/// Rows that did not become intervals, by reason.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub rows: usize,
    /// Rows with a null in some grouping column.
    pub null_keys: usize,
    /// Rows with a null start or end.
    pub null_bounds: usize,
    /// Rows with `start > end` removed under [`InvalidIntervalPolicy::Drop`].
    pub dropped_invalid: usize,
}

/// Intervals of one input, in original row order.
#[derive(Debug)]
pub(crate) struct ExtractedSide {
    pub intervals: Vec<Interval>,
    /// Encoded group key of every input row, if grouping.
    pub keys: Option<Rows>,
    /// Rows removed by [`InvalidIntervalPolicy::Drop`], ascending.
    pub dropped: Vec<Position>,
    pub stats: ExtractStats,
}

fn evaluate_as_i64(
    array: &ArrayRef,
) -> Result<datafusion::arrow::array::PrimitiveArray<Int64Type>> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let array = cast_with_options(array, &DataType::Int64, &options)?;
    Ok(array.as_primitive::<Int64Type>().to_owned())
}

pub(crate) fn extract(
    batch: &RecordBatch,
    side: Side,
    columns: &ResolvedColumns,
    converter: Option<&RowConverter>,
    policy: InvalidIntervalPolicy,
    closed_intervals: bool,
) -> Result<ExtractedSide> {
    let starts = evaluate_as_i64(batch.column(columns.start))?;
    let ends = evaluate_as_i64(batch.column(columns.end))?;
    let key_arrays: Vec<ArrayRef> = columns
        .keys
        .iter()
        .map(|&k| batch.column(k).clone())
        .collect();
    let keys = match converter {
        Some(converter) => Some(converter.convert_columns(&key_arrays)?),
        None => None,
    };

    let mut stats = ExtractStats {
        rows: batch.num_rows(),
        ..Default::default()
    };
    let mut intervals = Vec::with_capacity(batch.num_rows());
    let mut dropped = Vec::new();

    for row in 0..batch.num_rows() {
        if starts.is_null(row) || ends.is_null(row) {
            stats.null_bounds += 1;
            continue;
        }
        let (start, end) = (starts.value(row), ends.value(row));
        if start > end {
            match policy {
                InvalidIntervalPolicy::Reject => {
                    return Err(IntervalJoinError::InvalidInterval {
                        side,
                        row,
                        start,
                        end,
                    })
                }
                InvalidIntervalPolicy::Drop => {
                    stats.dropped_invalid += 1;
                    dropped.push(row);
                    continue;
                }
            }
        }
        if key_arrays.iter().any(|a| a.is_null(row)) {
            stats.null_keys += 1;
            continue;
        }
        // closed [start, end] covers the same integers as [start, end + 1);
        // an end of i64::MAX saturates, so that one point is left out
        let end = if closed_intervals {
            end.saturating_add(1)
        } else {
            end
        };
        intervals.push(Interval::new(start, end, row));
    }

    debug!(
        "Extracted {} intervals from {} input: {:?}",
        intervals.len(),
        side,
        stats
    );

    Ok(ExtractedSide {
        intervals,
        keys,
        dropped,
        stats,
    })
}

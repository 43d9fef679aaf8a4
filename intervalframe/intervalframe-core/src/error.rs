use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use std::fmt;

pub type Result<T, E = IntervalJoinError> = std::result::Result<T, E>;

/// Input of a two-sided interval operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntervalJoinError {
    #[error("column '{column}' not found in {side} input")]
    MissingColumn { side: Side, column: String },

    #[error("column '{column}' of {side} input has type {data_type}, expected {expected}")]
    TypeMismatch {
        side: Side,
        column: String,
        data_type: DataType,
        expected: String,
    },

    #[error("invalid interval in row {row} of {side} input: start {start} > end {end}")]
    InvalidInterval {
        side: Side,
        row: usize,
        start: i64,
        end: i64,
    },

    #[error("invalid value for interval_frame.{key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

impl From<IntervalJoinError> for DataFusionError {
    fn from(e: IntervalJoinError) -> Self {
        match e {
            IntervalJoinError::Arrow(e) => DataFusionError::ArrowError(e, None),
            other => DataFusionError::External(Box::new(other)),
        }
    }
}

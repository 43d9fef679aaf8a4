//! Overlap joins between two Arrow record batches carrying half-open
//! `[start, end)` intervals, optionally partitioned by equality on key columns.
//!
//! ```no_run
//! use intervalframe_core::joins::{ColIntervals, IntervalJoin};
//! use intervalframe_core::session_context::IntervalJoinConfig;
//! # fn run(reads: datafusion::arrow::record_batch::RecordBatch,
//! #        targets: datafusion::arrow::record_batch::RecordBatch)
//! #        -> intervalframe_core::error::Result<()> {
//! let join = IntervalJoin::new(
//!     ColIntervals::same("pos_start", "pos_end"),
//!     vec!["contig".to_string()],
//!     IntervalJoinConfig::default(),
//! );
//! let pairs = join.join(&reads, &targets)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod joins;
pub mod session_context;

pub use error::{IntervalJoinError, Result, Side};
pub use joins::{join, nonoverlapping, overlap, ColInterval, ColIntervals, IntervalJoin};
pub use session_context::{
    Algorithm, IntervalFrameSessionExt, IntervalJoinConfig, InvalidIntervalPolicy,
};

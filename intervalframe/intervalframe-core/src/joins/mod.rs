mod algorithm;
mod interval_join;
pub mod interval_tree;
mod intervals;
mod partition;
mod scan;
pub mod sweep_line;
mod utils;

pub use algorithm::IntervalJoinAlgorithm;
pub use interval_join::{join, nonoverlapping, overlap, IntervalJoin};
pub use intervals::{ColInterval, ColIntervals, ExtractStats, Interval, Position};
pub use partition::Group;
pub use scan::{scan_group, scan_groups, MatchedPair};
pub use utils::build_join_schema;

use clap::{Parser, ValueEnum};
use datafusion::config::ConfigOptions;
use datafusion::prelude::{CsvReadOptions, SessionConfig, SessionContext};
use intervalframe_core::joins::{ColInterval, ColIntervals};
use intervalframe_core::session_context::{
    Algorithm, IntervalFrameSessionExt, IntervalJoinConfig, InvalidIntervalPolicy,
};
use log::info;
use std::error::Error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Operation {
    Join,
    Overlap,
    Nonoverlapping,
}

/// Overlap operations between two CSV files of intervals.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Left input CSV file (with header)
    #[arg(long)]
    left: String,

    /// Right input CSV file (with header)
    #[arg(long)]
    right: String,

    /// Start and end columns, comma separated
    #[arg(long, value_parser = parse_col_interval, default_value = "start,end")]
    on: ColInterval,

    /// Start and end columns of the right input, if named differently
    #[arg(long, value_parser = parse_col_interval)]
    right_on: Option<ColInterval>,

    /// Grouping column present in both inputs
    #[arg(long)]
    by: Vec<String>,

    #[arg(long, value_enum, default_value_t = Operation::Join)]
    operation: Operation,

    #[arg(long, default_value_t = Algorithm::default())]
    algorithm: Algorithm,

    /// Appended to right column names colliding with left ones
    #[arg(long, default_value = "_right")]
    suffix: String,

    /// Treat intervals as closed [start, end]
    #[arg(long)]
    closed: bool,

    /// Skip rows with start > end instead of failing
    #[arg(long)]
    drop_invalid: bool,

    /// Worker threads for the scan, 0 for all available cores
    #[arg(long, default_value_t = 0)]
    target_partitions: usize,
}

fn parse_col_interval(s: &str) -> Result<ColInterval, String> {
    match s.split_once(',') {
        Some((start, end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
            Ok(ColInterval::new(start.trim(), end.trim()))
        }
        _ => Err(format!("expected 'start,end', got '{s}'")),
    }
}

impl Args {
    fn interval_join_config(&self) -> IntervalJoinConfig {
        let mut config = IntervalJoinConfig::default();
        config.algorithm = self.algorithm;
        config.suffix = self.suffix.clone();
        config.closed_intervals = self.closed;
        config.target_partitions = self.target_partitions;
        config.invalid_intervals = if self.drop_invalid {
            InvalidIntervalPolicy::Drop
        } else {
            InvalidIntervalPolicy::Reject
        };
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let rocket = emojis::get_by_shortcode("rocket").map_or("", |e| e.as_str());
    info!("Starting intervalframe CLI {rocket}...");

    let config = SessionConfig::from(ConfigOptions::new())
        .with_option_extension(args.interval_join_config());
    let ctx = SessionContext::new_with_interval_frame(config);

    let left = ctx.read_csv(args.left.as_str(), CsvReadOptions::new()).await?;
    let right = ctx.read_csv(args.right.as_str(), CsvReadOptions::new()).await?;
    let on = ColIntervals::new(
        args.on.clone(),
        args.right_on.clone().unwrap_or_else(|| args.on.clone()),
    );

    let df = match args.operation {
        Operation::Join => ctx.interval_join(left, right, on, args.by.clone()).await?,
        Operation::Overlap => ctx.interval_overlap(left, right, on, args.by.clone()).await?,
        Operation::Nonoverlapping => {
            ctx.interval_nonoverlapping(left, right, on, args.by.clone())
                .await?
        }
    };
    df.show().await?;
    Ok(())
}

use crate::joins::{ColIntervals, IntervalJoin};
use crate::Result as JoinResult;
use async_trait::async_trait;
use datafusion::arrow::compute::concat_batches;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::extensions_options;
use datafusion::config::ConfigExtension;
use datafusion::dataframe::DataFrame;
use datafusion::error::Result;
use datafusion::execution::context::SessionState;
use datafusion::execution::runtime_env::RuntimeEnv;
use datafusion::prelude::{SessionConfig, SessionContext};
use log::info;
use std::str::FromStr;
use std::sync::Arc;

/// Extension trait for [`SessionContext`] that adds interval operations on [`DataFrame`]s.
#[async_trait]
pub trait IntervalFrameSessionExt {
    fn new_with_interval_frame(config: SessionConfig) -> SessionContext;
    fn with_config_rt_interval_frame(
        config: SessionConfig,
        runtime: Arc<RuntimeEnv>,
    ) -> SessionContext;

    /// The [`IntervalJoinConfig`] registered on this session, or the defaults.
    fn interval_join_config(&self) -> IntervalJoinConfig;

    async fn interval_join(
        &self,
        left: DataFrame,
        right: DataFrame,
        on: ColIntervals,
        by: Vec<String>,
    ) -> Result<DataFrame>;

    async fn interval_overlap(
        &self,
        left: DataFrame,
        right: DataFrame,
        on: ColIntervals,
        by: Vec<String>,
    ) -> Result<DataFrame>;

    async fn interval_nonoverlapping(
        &self,
        left: DataFrame,
        right: DataFrame,
        on: ColIntervals,
        by: Vec<String>,
    ) -> Result<DataFrame>;
}

#[async_trait]
impl IntervalFrameSessionExt for SessionContext {
    fn new_with_interval_frame(config: SessionConfig) -> SessionContext {
        let plugin = emojis::get_by_shortcode("electric_plug").map_or("", |e| e.as_str());
        info!("Loading IntervalFrameSessionExt {plugin}...");
        let runtime = Arc::new(RuntimeEnv::default());
        Self::with_config_rt_interval_frame(config, runtime)
    }

    fn with_config_rt_interval_frame(
        config: SessionConfig,
        runtime: Arc<RuntimeEnv>,
    ) -> SessionContext {
        let config = if config
            .options()
            .extensions
            .get::<IntervalJoinConfig>()
            .is_none()
        {
            config.with_option_extension(IntervalJoinConfig::default())
        } else {
            config
        };
        let state = SessionState::new_with_config_rt(config, runtime);
        let ctx = SessionContext::new_with_state(state);
        let hammer = emojis::get_by_shortcode("hammer_and_wrench").map_or("", |e| e.as_str());
        info!("Initialized interval operations {hammer}...");
        ctx
    }

    fn interval_join_config(&self) -> IntervalJoinConfig {
        self.copied_config()
            .options()
            .extensions
            .get::<IntervalJoinConfig>()
            .cloned()
            .unwrap_or_default()
    }

    async fn interval_join(
        &self,
        left: DataFrame,
        right: DataFrame,
        on: ColIntervals,
        by: Vec<String>,
    ) -> Result<DataFrame> {
        let join = IntervalJoin::new(on, by, self.interval_join_config());
        run_on_frames(self, left, right, |l, r| join.join(l, r)).await
    }

    async fn interval_overlap(
        &self,
        left: DataFrame,
        right: DataFrame,
        on: ColIntervals,
        by: Vec<String>,
    ) -> Result<DataFrame> {
        let join = IntervalJoin::new(on, by, self.interval_join_config());
        run_on_frames(self, left, right, |l, r| join.overlap(l, r)).await
    }

    async fn interval_nonoverlapping(
        &self,
        left: DataFrame,
        right: DataFrame,
        on: ColIntervals,
        by: Vec<String>,
    ) -> Result<DataFrame> {
        let join = IntervalJoin::new(on, by, self.interval_join_config());
        run_on_frames(self, left, right, |l, r| join.nonoverlapping(l, r)).await
    }
}

async fn run_on_frames<F>(
    ctx: &SessionContext,
    left: DataFrame,
    right: DataFrame,
    op: F,
) -> Result<DataFrame>
where
    F: FnOnce(&RecordBatch, &RecordBatch) -> JoinResult<RecordBatch>,
{
    let left = collect_single_batch(left).await?;
    let right = collect_single_batch(right).await?;
    let result = op(&left, &right)?;
    ctx.read_batch(result)
}

async fn collect_single_batch(df: DataFrame) -> Result<RecordBatch> {
    let schema = df.schema().inner().clone();
    let batches = df.collect().await?;
    Ok(concat_batches(&schema, &batches)?)
}

extensions_options! {
    pub struct IntervalJoinConfig {
        pub algorithm: Algorithm, default = Algorithm::default()
        pub invalid_intervals: InvalidIntervalPolicy, default = InvalidIntervalPolicy::default()
        /// Appended to colliding right column names; must not be empty
        pub suffix: String, default = String::from("_right")
        /// Read bounds as `[start, end]`; an end of `i64::MAX` keeps its half-open meaning
        pub closed_intervals: bool, default = false
        pub target_partitions: usize, default = 0
    }
}

impl ConfigExtension for IntervalJoinConfig {
    const PREFIX: &'static str = "interval_frame";
}

#[derive(Debug, Eq, PartialEq, Default, Clone, Copy)]
pub enum Algorithm {
    #[default]
    SweepLine,
    IntervalTree,
    ArrayIntervalTree,
}

#[derive(Debug)]
pub struct ParseAlgorithmError(String);

impl std::fmt::Display for ParseAlgorithmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseAlgorithmError {}

impl FromStr for Algorithm {
    type Err = ParseAlgorithmError;

    #[inline]
    fn from_str(s: &str) -> std::result::Result<Algorithm, Self::Err> {
        match s.to_lowercase().as_str() {
            "sweepline" => Ok(Algorithm::SweepLine),
            "intervaltree" => Ok(Algorithm::IntervalTree),
            "arrayintervaltree" => Ok(Algorithm::ArrayIntervalTree),
            _ => Err(ParseAlgorithmError(format!(
                "Can't parse '{}' as Algorithm",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let val = match self {
            Algorithm::SweepLine => "SweepLine",
            Algorithm::IntervalTree => "IntervalTree",
            Algorithm::ArrayIntervalTree => "ArrayIntervalTree",
        };
        write!(f, "{}", val)
    }
}

/// What to do with a row whose interval has `start > end`.
#[derive(Debug, Eq, PartialEq, Default, Clone, Copy)]
pub enum InvalidIntervalPolicy {
    /// Fail the whole operation with `InvalidInterval`.
    #[default]
    Reject,
    /// Exclude the row from matching, grouping and output.
    Drop,
}

impl FromStr for InvalidIntervalPolicy {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> std::result::Result<InvalidIntervalPolicy, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(InvalidIntervalPolicy::Reject),
            "drop" => Ok(InvalidIntervalPolicy::Drop),
            _ => Err(ParseAlgorithmError(format!(
                "Can't parse '{}' as InvalidIntervalPolicy",
                s
            ))),
        }
    }
}

impl std::fmt::Display for InvalidIntervalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let val = match self {
            InvalidIntervalPolicy::Reject => "Reject",
            InvalidIntervalPolicy::Drop => "Drop",
        };
        write!(f, "{}", val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::config::ConfigOptions;

    #[test]
    fn algorithm_round_trips_through_display() {
        for alg in [
            Algorithm::SweepLine,
            Algorithm::IntervalTree,
            Algorithm::ArrayIntervalTree,
        ] {
            assert_eq!(alg.to_string().parse::<Algorithm>().unwrap(), alg);
        }
        assert_eq!(
            "INTERVALTREE".parse::<Algorithm>().unwrap(),
            Algorithm::IntervalTree
        );
        let err = "coitrees".parse::<Algorithm>().unwrap_err();
        assert_eq!(err.to_string(), "Can't parse 'coitrees' as Algorithm");
    }

    #[test]
    fn invalid_interval_policy_parses() {
        assert_eq!(
            "drop".parse::<InvalidIntervalPolicy>().unwrap(),
            InvalidIntervalPolicy::Drop
        );
        assert!("ignore".parse::<InvalidIntervalPolicy>().is_err());
    }

    #[test]
    fn defaults() {
        let config = IntervalJoinConfig::default();
        assert_eq!(config.algorithm, Algorithm::SweepLine);
        assert_eq!(config.invalid_intervals, InvalidIntervalPolicy::Reject);
        assert_eq!(config.suffix, "_right");
        assert!(!config.closed_intervals);
        assert_eq!(config.target_partitions, 0);
    }

    #[tokio::test]
    async fn set_options_through_sql() -> Result<()> {
        let config = SessionConfig::from(ConfigOptions::new())
            .with_option_extension(IntervalJoinConfig::default());
        let ctx = SessionContext::new_with_interval_frame(config);

        ctx.sql("SET interval_frame.algorithm = IntervalTree").await?;
        ctx.sql("SET interval_frame.suffix = '_b'").await?;
        ctx.sql("SET interval_frame.closed_intervals = true").await?;

        let config = ctx.interval_join_config();
        assert_eq!(config.algorithm, Algorithm::IntervalTree);
        assert_eq!(config.suffix, "_b");
        assert!(config.closed_intervals);
        Ok(())
    }

    #[test]
    fn registers_config_when_missing() {
        let ctx = SessionContext::new_with_interval_frame(SessionConfig::new());
        let config = ctx.interval_join_config();
        assert_eq!(config.algorithm, Algorithm::default());
        assert_eq!(config.suffix, "_right");
    }
}

//! Per-date liquidity pipeline and run loop.
//!
//! For each evaluation date: select the universe, compute metrics, aggregate,
//! orthogonalize raw liquidity against size and optionally persist the five
//! tables. Dates are processed strictly in order with a cooldown between
//! them.

use crate::aggregate::{CrossSection, aggregate};
use crate::coordinator::{Coordinator, ExecutionMode};
use crate::error::{PipelineError, Result};
use crate::report::{DateReport, RunSummary};
use crate::universe::{Universe, select_universe};
use chrono::NaiveDate;
use fremantle_data::dates::compact;
use fremantle_data::{
    FactorSink, FactorTable, MarketDataProvider, SecurityBasics, SecurityBasicsProvider,
    SizeFactorReader, TradingCalendar,
};
use fremantle_factors::{LiquidityCalculator, LiquidityConfig};
use fremantle_risk::{OrthogonalizeConfig, Orthogonalizer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for [`LiquidityPipeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Metric windows, weights and listing threshold
    pub liquidity: LiquidityConfig,
    /// Clipping and regression settings
    pub orthogonalize: OrthogonalizeConfig,
    /// Sequential or parallel batches (default: sequential)
    pub mode: ExecutionMode,
    /// Worker pool size in parallel mode (default: 4)
    pub workers: usize,
    /// Pause between evaluation dates in seconds (default: 180)
    pub cooldown_secs: u64,
    /// Namespace the tables are persisted under (default: `liquidity`)
    pub factor_name: String,
    /// Namespace the size factor is read from (default: `size`)
    pub size_factor_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            liquidity: LiquidityConfig::default(),
            orthogonalize: OrthogonalizeConfig::default(),
            mode: ExecutionMode::Sequential,
            workers: 4,
            cooldown_secs: 180,
            factor_name: "liquidity".to_string(),
            size_factor_name: "size".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Pause between evaluation dates.
    pub const fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.liquidity.validate()?;
        self.orthogonalize.robust.validate()?;
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.factor_name.is_empty() || self.size_factor_name.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "factor names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Collaborators the pipeline reads from.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    /// Trading calendar
    pub calendar: &'a dyn TradingCalendar,
    /// Security reference table
    pub basics: &'a dyn SecurityBasicsProvider,
    /// Daily turnover
    pub market: &'a dyn MarketDataProvider,
    /// Size factor loadings
    pub size: &'a dyn SizeFactorReader,
}

impl fmt::Debug for Sources<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sources").finish_non_exhaustive()
    }
}

impl<'a> Sources<'a> {
    /// Read everything from one store.
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: TradingCalendar + SecurityBasicsProvider + MarketDataProvider + SizeFactorReader,
    {
        Self {
            calendar: store,
            basics: store,
            market: store,
            size: store,
        }
    }
}

/// Which dates to process and whether to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// First date of the range, or the single date
    pub start: NaiveDate,
    /// Last date of the range; `None` evaluates a single date
    pub end: Option<NaiveDate>,
    /// Keep only the last trading day of each month (default: true)
    pub month_end: bool,
    /// Hand the tables to the sinks (default: false)
    pub save: bool,
}

impl RunRequest {
    /// Request a single evaluation date on or before `start`.
    pub const fn new(start: NaiveDate) -> Self {
        Self {
            start,
            end: None,
            month_end: true,
            save: false,
        }
    }

    /// Evaluate every trading day in `[start, end]`.
    pub const fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the month-end filter.
    pub const fn with_month_end(mut self, month_end: bool) -> Self {
        self.month_end = month_end;
        self
    }

    /// Set the save flag.
    pub const fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }
}

/// Tables and diagnostics of one evaluation date.
#[derive(Debug, Clone, PartialEq)]
pub struct DateResult {
    /// Diagnostics
    pub report: DateReport,
    /// Raw metric tables
    pub tables: CrossSection,
    /// Raw liquidity orthogonalized against size
    pub liquidity: FactorTable,
}

/// Names of the five tables persisted for `evaluation_date`, in write order.
pub fn table_names(evaluation_date: NaiveDate) -> [String; 5] {
    let key = compact(evaluation_date);
    [
        format!("stom_{key}"),
        format!("stoq_{key}"),
        format!("stoa_{key}"),
        format!("rawliquidity_{key}"),
        key,
    ]
}

/// Liquidity factor pipeline, constructed once per run.
#[derive(Debug, Clone)]
pub struct LiquidityPipeline {
    config: PipelineConfig,
    calculator: LiquidityCalculator,
    coordinator: Coordinator,
    orthogonalizer: Orthogonalizer,
}

impl LiquidityPipeline {
    /// Validate `config` and build the pipeline.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            calculator: LiquidityCalculator::with_config(config.liquidity.clone()),
            coordinator: Coordinator::new(config.mode, config.workers),
            orthogonalizer: Orthogonalizer::with_config(config.orthogonalize),
            config,
        })
    }

    /// The pipeline's configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Evaluation dates selected by `request`, ascending.
    ///
    /// Without an end date this is the last trading day on or before `start`.
    pub fn evaluation_dates(
        &self,
        calendar: &dyn TradingCalendar,
        request: &RunRequest,
    ) -> Result<Vec<NaiveDate>> {
        let days = match request.end {
            Some(end) => calendar.trading_days(request.start, end)?,
            None => calendar.trading_days_ending(request.start, 1)?,
        };

        if !request.month_end {
            return Ok(days);
        }

        let mut selected = Vec::with_capacity(days.len());
        for day in days {
            if calendar.is_month_end(day)? {
                selected.push(day);
            }
        }
        Ok(selected)
    }

    /// Compute the tables of one evaluation date without persisting them.
    pub fn compute_date(
        &self,
        sources: &Sources<'_>,
        evaluation_date: NaiveDate,
    ) -> Result<DateResult> {
        let basics = sources.basics.security_basics()?;
        self.compute_with_basics(sources, &basics, evaluation_date)
    }

    fn compute_with_basics(
        &self,
        sources: &Sources<'_>,
        basics: &[SecurityBasics],
        evaluation_date: NaiveDate,
    ) -> Result<DateResult> {
        let date_label = sources.calendar.next_trading_day(evaluation_date)?;
        let universe = select_universe(basics, evaluation_date, self.config.liquidity.listed_days);
        info!(
            date = %evaluation_date,
            label = %date_label,
            universe = universe.size(),
            "computing liquidity factor loadings"
        );

        let batch = self.coordinator.run(
            &self.calculator,
            sources.market,
            universe.ids(),
            evaluation_date,
            date_label,
        )?;
        let tables = aggregate(&batch.rows)?;

        let size = sources.size.size_factor(evaluation_date)?;
        if size.is_empty() {
            warn!(date = %evaluation_date, "size factor table is empty");
        }
        let orthogonalized = self
            .orthogonalizer
            .orthogonalize(&tables.raw_liquidity, &size)?;
        let join = orthogonalized.stats;
        if join.factor_only > 0 || join.reference_only > 0 || join.non_finite > 0 {
            info!(
                date = %evaluation_date,
                joined = join.joined,
                liquidity_only = join.factor_only,
                size_only = join.reference_only,
                non_finite = join.non_finite,
                "inner join dropped securities"
            );
        }

        Ok(DateResult {
            report: DateReport {
                evaluation_date,
                date_label,
                universe_size: universe.size(),
                computed: batch.rows.len(),
                skipped: batch.skipped,
                join,
                persisted: false,
            },
            tables,
            liquidity: orthogonalized.table,
        })
    }

    /// Hand the five tables of `result` to every sink.
    pub fn persist(&self, sinks: &[&dyn FactorSink], result: &mut DateResult) -> Result<()> {
        let [stom, stoq, stoa, raw, final_name] = table_names(result.report.evaluation_date);
        let named = [
            (stom, &result.tables.stom),
            (stoq, &result.tables.stoq),
            (stoa, &result.tables.stoa),
            (raw, &result.tables.raw_liquidity),
            (final_name, &result.liquidity),
        ];

        for sink in sinks {
            for (name, table) in &named {
                sink.persist(name, table)?;
            }
        }

        result.report.persisted = !sinks.is_empty();
        info!(
            date = %result.report.evaluation_date,
            sinks = sinks.len(),
            rows = result.liquidity.len(),
            "persisted liquidity tables"
        );
        Ok(())
    }

    /// Compute one date and persist it when `save` is set.
    pub fn run_date(
        &self,
        sources: &Sources<'_>,
        sinks: &[&dyn FactorSink],
        evaluation_date: NaiveDate,
        save: bool,
    ) -> Result<DateResult> {
        let mut result = self.compute_date(sources, evaluation_date)?;
        if save {
            self.persist(sinks, &mut result)?;
        }
        Ok(result)
    }

    /// Process every date selected by `request`.
    pub fn run(
        &self,
        sources: &Sources<'_>,
        sinks: &[&dyn FactorSink],
        request: &RunRequest,
    ) -> Result<RunSummary> {
        self.run_with(sources, sinks, request, |_| {})
    }

    /// Process every date selected by `request`, passing each result to
    /// `on_date` as soon as it is complete.
    pub fn run_with<F>(
        &self,
        sources: &Sources<'_>,
        sinks: &[&dyn FactorSink],
        request: &RunRequest,
        mut on_date: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&DateResult),
    {
        let dates = self.evaluation_dates(sources.calendar, request)?;
        if dates.is_empty() {
            warn!(start = %request.start, end = ?request.end, "no evaluation dates selected");
            return Ok(RunSummary::default());
        }
        if request.save && sinks.is_empty() {
            warn!("save requested without any sink");
        }

        let basics = sources.basics.security_basics()?;
        let cooldown = self.config.cooldown();
        let mut summary = RunSummary::default();

        for (i, &date) in dates.iter().enumerate() {
            let mut result = self.compute_with_basics(sources, &basics, date)?;
            if request.save {
                self.persist(sinks, &mut result)?;
            }
            on_date(&result);
            summary.reports.push(result.report);

            if i + 1 < dates.len() && !cooldown.is_zero() {
                info!(secs = cooldown.as_secs(), "suspending before next date");
                thread::sleep(cooldown);
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fremantle_data::MemoryStore;
    use fremantle_factors::{ClipMethod, FactorError};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> MemoryStore {
        MemoryStore::new().with_trading_days([
            date(2017, 12, 27),
            date(2017, 12, 28),
            date(2017, 12, 29),
            date(2018, 1, 2),
            date(2018, 1, 3),
            date(2018, 1, 31),
            date(2018, 2, 1),
        ])
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.cooldown(), Duration::from_secs(180));
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert_eq!(config.factor_name, "liquidity");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"mode":"parallel","workers":8,"liquidity":{"stom_days":20}}"#)
                .unwrap();
        assert_eq!(config.mode, ExecutionMode::Parallel);
        assert_eq!(config.workers, 8);
        assert_eq!(config.liquidity.stom_days, 20);
        assert_eq!(config.liquidity.stoa_months, 12);
        assert_eq!(config.cooldown_secs, 180);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = PipelineConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            LiquidityPipeline::new(config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inverted_percentile_clip_rejected() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"orthogonalize":{"robust":{"clip":{"method":"percentile","lower":0.9,"upper":0.1}}}}"#,
        )
        .unwrap();
        assert!(matches!(
            LiquidityPipeline::new(config),
            Err(PipelineError::Factor(FactorError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_negative_mad_multiple_rejected() {
        let mut config = PipelineConfig::default();
        config.orthogonalize.robust.clip = ClipMethod::Mad { multiple: -1.0 };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Factor(FactorError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(
            table_names(date(2017, 12, 29)),
            [
                "stom_20171229",
                "stoq_20171229",
                "stoa_20171229",
                "rawliquidity_20171229",
                "20171229",
            ]
        );
    }

    #[test]
    fn test_month_end_filter() {
        let pipeline = LiquidityPipeline::new(PipelineConfig::default()).unwrap();
        let request = RunRequest::new(date(2017, 12, 27)).with_end(date(2018, 1, 31));
        let dates = pipeline.evaluation_dates(&calendar(), &request).unwrap();
        assert_eq!(dates, vec![date(2017, 12, 29), date(2018, 1, 31)]);

        let all = pipeline
            .evaluation_dates(&calendar(), &request.with_month_end(false))
            .unwrap();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_single_date_uses_last_trading_day() {
        let pipeline = LiquidityPipeline::new(PipelineConfig::default()).unwrap();
        // 2017-12-30 is a Saturday
        let request = RunRequest::new(date(2017, 12, 30)).with_month_end(false);
        let dates = pipeline.evaluation_dates(&calendar(), &request).unwrap();
        assert_eq!(dates, vec![date(2017, 12, 29)]);
    }
}

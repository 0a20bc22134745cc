//! Execution coordinator.
//!
//! Runs the liquidity calculator over a universe, either in order on the
//! calling thread or one task per security on a fixed-size rayon pool. In
//! parallel mode each task publishes its outcome to an mpsc channel; the
//! channel is drained only after the pool scope has joined every task.
//!
//! Every security yields exactly one outcome in both modes. Errors and panics
//! inside a task are caught at the task boundary and recorded as skips.

use crate::error::Result;
use crate::report::{SkipReason, SkippedSecurity};
use chrono::NaiveDate;
use fremantle_data::{MarketDataProvider, SecurityId};
use fremantle_factors::{FactorError, LiquidityCalculator, RawMetricRow};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use tracing::{debug, warn};

/// How a batch of securities is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One security after another on the calling thread
    #[default]
    Sequential,
    /// One task per security on a worker pool
    Parallel,
}

/// Outcome of one per-security task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Metrics were computed
    Computed(RawMetricRow),
    /// The security was left out
    Skipped(SkippedSecurity),
}

/// Collected outcomes of one batch, each list sorted by security id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Computed rows
    pub rows: Vec<RawMetricRow>,
    /// Skipped securities
    pub skipped: Vec<SkippedSecurity>,
}

impl FromIterator<TaskOutcome> for BatchOutcome {
    fn from_iter<I: IntoIterator<Item = TaskOutcome>>(iter: I) -> Self {
        let mut batch = Self::default();
        for outcome in iter {
            match outcome {
                TaskOutcome::Computed(row) => batch.rows.push(row),
                TaskOutcome::Skipped(skip) => batch.skipped.push(skip),
            }
        }
        batch.rows.sort_by(|a, b| a.id.cmp(&b.id));
        batch.skipped.sort_by(|a, b| a.id.cmp(&b.id));
        batch
    }
}

/// Dispatches per-security calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinator {
    mode: ExecutionMode,
    workers: usize,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(ExecutionMode::Sequential, 4)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "task panicked".to_string())
}

fn evaluate(
    calculator: &LiquidityCalculator,
    market: &dyn MarketDataProvider,
    id: &SecurityId,
    evaluation_date: NaiveDate,
    date_label: NaiveDate,
) -> TaskOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        calculator.calculate(market, id, evaluation_date)
    }));

    let reason = match result {
        Ok(Ok(Some(metrics))) => {
            return TaskOutcome::Computed(RawMetricRow {
                date_label,
                id: id.clone(),
                metrics,
            });
        }
        Ok(Ok(None)) => {
            debug!(%id, "no market data");
            SkipReason::NoMarketData
        }
        Ok(Err(e @ FactorError::NonPositiveTurnover { .. })) => {
            warn!(%id, error = %e, "excluding security");
            SkipReason::Computation(e.to_string())
        }
        Ok(Err(e)) => {
            warn!(%id, error = %e, "liquidity task failed");
            SkipReason::WorkerFailure(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(%id, panic = %message, "liquidity task panicked");
            SkipReason::WorkerFailure(message)
        }
    };

    TaskOutcome::Skipped(SkippedSecurity {
        id: id.clone(),
        reason,
    })
}

impl Coordinator {
    /// Create a coordinator. A worker count of zero is treated as one.
    pub fn new(mode: ExecutionMode, workers: usize) -> Self {
        Self {
            mode,
            workers: workers.max(1),
        }
    }

    /// Execution mode.
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Worker pool size used in parallel mode.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Evaluate every security in `universe`.
    ///
    /// Fails only when the worker pool cannot be built.
    pub fn run(
        &self,
        calculator: &LiquidityCalculator,
        market: &dyn MarketDataProvider,
        universe: &[SecurityId],
        evaluation_date: NaiveDate,
        date_label: NaiveDate,
    ) -> Result<BatchOutcome> {
        let batch = match self.mode {
            ExecutionMode::Sequential => universe
                .iter()
                .map(|id| evaluate(calculator, market, id, evaluation_date, date_label))
                .collect(),
            ExecutionMode::Parallel => {
                self.run_parallel(calculator, market, universe, evaluation_date, date_label)?
            }
        };

        debug!(
            mode = ?self.mode,
            computed = batch.rows.len(),
            skipped = batch.skipped.len(),
            "batch complete"
        );
        Ok(batch)
    }

    fn run_parallel(
        &self,
        calculator: &LiquidityCalculator,
        market: &dyn MarketDataProvider,
        universe: &[SecurityId],
        evaluation_date: NaiveDate,
        date_label: NaiveDate,
    ) -> Result<BatchOutcome> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("liquidity-worker-{i}"))
            .build()?;

        let (tx, rx) = mpsc::channel();
        pool.scope(|scope| {
            for id in universe {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = evaluate(calculator, market, id, evaluation_date, date_label);
                    if tx.send(outcome).is_err() {
                        warn!(%id, "result channel closed");
                    }
                });
            }
        });
        drop(tx);

        Ok(rx.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fremantle_data::{DailyMarketRecord, MemoryStore};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, 2).unwrap()
    }

    fn store() -> MemoryStore {
        let records = |v: f64| vec![DailyMarketRecord::new(date(), v)];
        MemoryStore::new()
            .with_turnover(SecurityId::new("A"), records(0.02))
            .with_turnover(SecurityId::new("B"), records(0.0))
    }

    fn universe() -> Vec<SecurityId> {
        ["C", "B", "A"].into_iter().map(SecurityId::new).collect()
    }

    #[test]
    fn test_sequential_classifies_outcomes() {
        let batch = Coordinator::default()
            .run(
                &LiquidityCalculator::default(),
                &store(),
                &universe(),
                date(),
                date(),
            )
            .unwrap();

        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].id, SecurityId::new("A"));
        assert_eq!(batch.skipped.len(), 2);
        assert!(matches!(batch.skipped[0].reason, SkipReason::Computation(_)));
        assert_eq!(batch.skipped[1].reason, SkipReason::NoMarketData);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let calc = LiquidityCalculator::default();
        let store = store();
        let seq = Coordinator::new(ExecutionMode::Sequential, 1)
            .run(&calc, &store, &universe(), date(), date())
            .unwrap();
        let par = Coordinator::new(ExecutionMode::Parallel, 3)
            .run(&calc, &store, &universe(), date(), date())
            .unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_zero_workers_clamped() {
        assert_eq!(Coordinator::new(ExecutionMode::Parallel, 0).workers(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("bad input");
        assert_eq!(panic_message(payload.as_ref()), "bad input");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "task panicked");
    }

    #[test]
    fn test_empty_universe() {
        let batch = Coordinator::new(ExecutionMode::Parallel, 2)
            .run(&LiquidityCalculator::default(), &store(), &[], date(), date())
            .unwrap();
        assert!(batch.rows.is_empty() && batch.skipped.is_empty());
    }
}

//! Universe selection for the liquidity factor.
//!
//! A security is eligible on an evaluation date when it has been listed for
//! strictly more than `listed_days` calendar days.

use chrono::{Duration, NaiveDate};
use fremantle_data::{SecurityBasics, SecurityId};

/// Trait for security universes.
pub trait Universe {
    /// Every security in the universe, sorted by id.
    fn ids(&self) -> &[SecurityId];

    /// Check if a security is in the universe.
    fn contains(&self, id: &SecurityId) -> bool {
        self.ids().binary_search(id).is_ok()
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.ids().len()
    }
}

/// Securities eligible on one evaluation date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleUniverse {
    evaluation_date: NaiveDate,
    ids: Vec<SecurityId>,
}

impl EligibleUniverse {
    /// Date the universe was selected for.
    pub const fn evaluation_date(&self) -> NaiveDate {
        self.evaluation_date
    }

    /// Consume the universe, returning its ids.
    pub fn into_ids(self) -> Vec<SecurityId> {
        self.ids
    }
}

impl Universe for EligibleUniverse {
    fn ids(&self) -> &[SecurityId] {
        &self.ids
    }
}

/// Select the securities listed before `evaluation_date - listed_days`.
///
/// Duplicate ids are kept once.
pub fn select_universe(
    basics: &[SecurityBasics],
    evaluation_date: NaiveDate,
    listed_days: i64,
) -> EligibleUniverse {
    let cutoff = evaluation_date - Duration::days(listed_days);

    let mut ids: Vec<SecurityId> = basics
        .iter()
        .filter(|b| b.list_date < cutoff)
        .map(|b| b.id.clone())
        .collect();
    ids.sort_unstable();
    ids.dedup();

    EligibleUniverse {
        evaluation_date,
        ids,
    }
}

//! Core domain types shared across the workspace.

use crate::dates::parse_date;
use crate::error::{DataError, Result};
use chrono::NaiveDate;
use derive_more::{Display, Into};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Canonical security identifier, e.g. `SH600000`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, Into,
)]
#[serde(transparent)]
pub struct SecurityId(String);

impl SecurityId {
    /// Build an id from a raw code, canonicalizing it to symbol form.
    ///
    /// Bare six-digit codes receive an exchange prefix (`600000` becomes
    /// `SH600000`, `000001` becomes `SZ000001`, `830799` becomes `BJ830799`),
    /// suffixed codes such as `600000.SH` are rewritten to prefix form and
    /// everything else is upper-cased.
    pub fn new(code: impl AsRef<str>) -> Self {
        let code = code.as_ref().trim().to_uppercase();

        if let Some((digits, exchange)) = code.split_once('.')
            && is_bare_code(digits)
        {
            return Self(format!("{exchange}{digits}"));
        }

        if is_bare_code(&code) {
            let prefix = match code.as_bytes()[0] {
                b'6' | b'9' => "SH",
                b'4' | b'8' => "BJ",
                _ => "SZ",
            };
            return Self(format!("{prefix}{code}"));
        }

        Self(code)
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_bare_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

impl From<&str> for SecurityId {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for SecurityId {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

/// Reference data for one security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityBasics {
    /// Security id
    pub id: SecurityId,
    /// First trading date
    pub list_date: NaiveDate,
}

impl SecurityBasics {
    /// Create a new basics record.
    pub fn new(id: impl Into<SecurityId>, list_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            list_date,
        }
    }
}

/// Unadjusted daily turnover ratio for one security.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyMarketRecord {
    /// Trading date
    pub date: NaiveDate,
    /// Traded volume over shares outstanding
    pub turnover: f64,
}

impl DailyMarketRecord {
    /// Create a new record.
    pub const fn new(date: NaiveDate, turnover: f64) -> Self {
        Self { date, turnover }
    }
}

/// One factor loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    /// Date label the loading is published under
    pub date: NaiveDate,
    /// Security id
    pub id: SecurityId,
    /// Factor loading
    pub factorvalue: f64,
}

impl FactorRow {
    /// Create a new row.
    pub const fn new(date: NaiveDate, id: SecurityId, factorvalue: f64) -> Self {
        Self {
            date,
            id,
            factorvalue,
        }
    }
}

/// Cross-section of one factor for one date label.
///
/// Rows are kept sorted by security id. Every row carries the same date label
/// and each security appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactorTable {
    rows: Vec<FactorRow>,
}

impl FactorTable {
    /// The empty table.
    pub const fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    /// Build a table from rows, validating the table invariants.
    pub fn new(mut rows: Vec<FactorRow>) -> Result<Self> {
        rows.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(pair) = rows.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(DataError::DuplicateSecurity {
                id: pair[0].id.to_string(),
            });
        }

        if let Some(first) = rows.first()
            && let Some(other) = rows.iter().find(|r| r.date != first.date)
        {
            return Err(DataError::MixedDateLabels {
                first: first.date.to_string(),
                other: other.date.to_string(),
            });
        }

        Ok(Self { rows })
    }

    /// Build a table for one date label from `(id, value)` pairs.
    pub fn from_values<I>(date: NaiveDate, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (SecurityId, f64)>,
    {
        Self::new(
            values
                .into_iter()
                .map(|(id, value)| FactorRow::new(date, id, value))
                .collect(),
        )
    }

    /// Number of securities in the table.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows sorted by security id.
    pub fn rows(&self) -> &[FactorRow] {
        &self.rows
    }

    /// Consume the table, returning its rows.
    pub fn into_rows(self) -> Vec<FactorRow> {
        self.rows
    }

    /// The shared date label, `None` for an empty table.
    pub fn date_label(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    /// Security ids in table order.
    pub fn ids(&self) -> impl Iterator<Item = &SecurityId> {
        self.rows.iter().map(|r| &r.id)
    }

    /// Whether the table holds a loading for `id`.
    pub fn contains(&self, id: &SecurityId) -> bool {
        self.get(id).is_some()
    }

    /// Loading for `id`, if present.
    pub fn get(&self, id: &SecurityId) -> Option<f64> {
        self.rows
            .binary_search_by(|r| r.id.cmp(id))
            .ok()
            .map(|i| self.rows[i].factorvalue)
    }

    /// Convert to a DataFrame with columns `date`, `id`, `factorvalue`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.rows.iter().map(|r| r.date.to_string()).collect();
        let ids: Vec<String> = self.rows.iter().map(|r| r.id.to_string()).collect();
        let values: Vec<f64> = self.rows.iter().map(|r| r.factorvalue).collect();

        let df = DataFrame::new(vec![
            Series::new("date".into(), dates).into(),
            Series::new("id".into(), ids).into(),
            Series::new("factorvalue".into(), values).into(),
        ])?;

        Ok(df)
    }

    /// Build a table from a DataFrame with columns `date`, `id`, `factorvalue`.
    ///
    /// The `date` column may be a string or a date column.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let dates = df.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let ids = df.column("id")?.str()?;
        let values = df.column("factorvalue")?.f64()?;

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let date = dates
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
            let id = ids
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing id".to_string()))?;
            let value = values
                .get(i)
                .ok_or_else(|| DataError::Parse(format!("Missing factorvalue for {id}")))?;

            rows.push(FactorRow::new(parse_date(date)?, SecurityId::new(id), value));
        }

        Self::new(rows)
    }
}

impl<'a> IntoIterator for &'a FactorTable {
    type Item = &'a FactorRow;
    type IntoIter = std::slice::Iter<'a, FactorRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, 2).unwrap()
    }

    #[rstest]
    #[case("600000", "SH600000")]
    #[case("000001", "SZ000001")]
    #[case("300750", "SZ300750")]
    #[case("830799", "BJ830799")]
    #[case("sh600000", "SH600000")]
    #[case("600000.SH", "SH600000")]
    #[case("AAPL", "AAPL")]
    fn test_security_id_canonical_form(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(SecurityId::new(raw).as_str(), expected);
    }

    #[test]
    fn test_factor_table_sorted_by_id() {
        let table = FactorTable::from_values(
            date(),
            [
                (SecurityId::new("SZ000002"), 2.0),
                (SecurityId::new("SH600000"), 1.0),
                (SecurityId::new("SZ000001"), 3.0),
            ],
        )
        .unwrap();

        let ids: Vec<&str> = table.ids().map(SecurityId::as_str).collect();
        assert_eq!(ids, vec!["SH600000", "SZ000001", "SZ000002"]);
        assert_eq!(table.get(&SecurityId::new("SZ000001")), Some(3.0));
        assert_eq!(table.date_label(), Some(date()));
    }

    #[test]
    fn test_factor_table_rejects_duplicates() {
        let result = FactorTable::from_values(
            date(),
            [(SecurityId::new("A"), 1.0), (SecurityId::new("A"), 2.0)],
        );
        assert!(matches!(result, Err(DataError::DuplicateSecurity { .. })));
    }

    #[test]
    fn test_factor_table_rejects_mixed_dates() {
        let other = NaiveDate::from_ymd_opt(2018, 1, 3).unwrap();
        let result = FactorTable::new(vec![
            FactorRow::new(date(), SecurityId::new("A"), 1.0),
            FactorRow::new(other, SecurityId::new("B"), 2.0),
        ]);
        assert!(matches!(result, Err(DataError::MixedDateLabels { .. })));
    }

    #[test]
    fn test_empty_table() {
        let table = FactorTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.date_label(), None);
        assert_eq!(table.to_dataframe().unwrap().height(), 0);
    }

    #[test]
    fn test_dataframe_conversion_keeps_rows() {
        let table = FactorTable::from_values(
            date(),
            [(SecurityId::new("A"), 0.5), (SecurityId::new("B"), -1.25)],
        )
        .unwrap();

        let df = table.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert!(df.column("factorvalue").is_ok());

        let back = FactorTable::from_dataframe(&df).unwrap();
        assert_eq!(back, table);
    }
}

//! Export functionality for factor tables.
//!
//! CSV output always carries the `date,id,factorvalue` header, even for an
//! empty table.

use chrono::NaiveDate;
use fremantle_data::dates::parse_date;
use fremantle_data::{DataError, FactorRow, FactorTable, SecurityId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized output was not UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Rows read back do not form a valid factor table.
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

const HEADER: [&str; 3] = ["date", "id", "factorvalue"];

impl Exporter for FactorTable {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(vec![]);
                wtr.write_record(HEADER)?;
                for row in self.rows() {
                    wtr.serialize(row)?;
                }
                let data = String::from_utf8(wtr.into_inner().map_err(|e| e.into_error())?)?;
                Ok(data)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self.rows())?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self.rows())?),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    id: String,
    factorvalue: f64,
}

/// Read a factor table from CSV with a `date,id,factorvalue` header.
///
/// Dates may be `YYYY-MM-DD` or `YYYYMMDD`; ids are canonicalized.
pub fn read_factor_csv<R: Read>(reader: R) -> Result<FactorTable, ExportError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        let CsvRow {
            date,
            id,
            factorvalue,
        } = record?;
        let date: NaiveDate = parse_date(&date)?;
        rows.push(FactorRow::new(date, SecurityId::new(id), factorvalue));
    }
    Ok(FactorTable::new(rows)?)
}

/// Read a factor table from a CSV file.
pub fn read_factor_csv_file(path: &Path) -> Result<FactorTable, ExportError> {
    read_factor_csv(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table() -> FactorTable {
        let date = NaiveDate::from_ymd_opt(2018, 1, 2).unwrap();
        FactorTable::from_values(
            date,
            [
                (SecurityId::new("SZ000001"), -0.25),
                (SecurityId::new("SH600000"), 1.5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_factor_table_export_csv() {
        let csv = table().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,id,factorvalue");
        assert_eq!(lines[1], "2018-01-02,SH600000,1.5");
        assert_eq!(lines[2], "2018-01-02,SZ000001,-0.25");
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let csv = FactorTable::empty()
            .export_to_string(ExportFormat::Csv)
            .unwrap();
        assert_eq!(csv.trim_end(), "date,id,factorvalue");
    }

    #[test]
    fn test_factor_table_export_json() {
        let json = table().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"id\":\"SH600000\""));
        assert!(json.contains("\"factorvalue\":1.5"));

        let pretty = table().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  ")); // Indentation indicates pretty format
    }

    #[test]
    fn test_read_back_csv() {
        let csv = table().export_to_string(ExportFormat::Csv).unwrap();
        let parsed = read_factor_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed, table());
    }

    #[test]
    fn test_read_csv_canonicalizes_ids_and_dates() {
        let input = "date,id,factorvalue\n20180102,600000,0.5\n20180102,000001.SZ,0.1\n";
        let parsed = read_factor_csv(input.as_bytes()).unwrap();
        assert_eq!(parsed.get(&SecurityId::new("SH600000")), Some(0.5));
        assert_eq!(parsed.get(&SecurityId::new("SZ000001")), Some(0.1));
    }

    #[test]
    fn test_read_csv_rejects_duplicates() {
        let input = "date,id,factorvalue\n2018-01-02,A,1.0\n2018-01-02,A,2.0\n";
        assert!(matches!(
            read_factor_csv(input.as_bytes()),
            Err(ExportError::Data(DataError::DuplicateSecurity { .. }))
        ));
    }

    #[rstest]
    #[case(ExportFormat::Csv, "csv")]
    #[case(ExportFormat::Json, "json")]
    #[case(ExportFormat::PrettyJson, "json")]
    fn test_export_format_extension(#[case] format: ExportFormat, #[case] expected: &str) {
        assert_eq!(format.extension(), expected);
    }

    #[rstest]
    #[case(ExportFormat::Csv)]
    #[case(ExportFormat::Json)]
    #[case(ExportFormat::PrettyJson)]
    fn test_every_format_lists_both_securities(#[case] format: ExportFormat) {
        let out = table().export_to_string(format).unwrap();
        assert!(out.contains("SH600000"));
        assert!(out.contains("SZ000001"));
    }
}

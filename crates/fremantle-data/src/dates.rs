//! Date parsing and formatting helpers.

use crate::error::{DataError, Result};
use chrono::NaiveDate;

/// Parse a date given as `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| DataError::InvalidDate(s.to_string()))
}

/// Compact `YYYYMMDD` form used for table names and storage keys.
pub fn compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2017-12-29")]
    #[case("20171229")]
    #[case(" 2017-12-29 ")]
    fn test_parse_date_formats(#[case] input: &str) {
        let date = parse_date(input).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2017, 12, 29).unwrap());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(
            parse_date("29/12/2017"),
            Err(DataError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_compact() {
        let date = NaiveDate::from_ymd_opt(2018, 1, 2).unwrap();
        assert_eq!(compact(date), "20180102");
    }
}

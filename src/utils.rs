use crate::constants::DATE_FORMAT;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Get history data directory from environment variable or use default
pub fn get_market_data_dir() -> PathBuf {
    std::env::var("MSE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Parse a `dd.mm.yyyy` date as used by the exchange
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| Error::Parse(format!("Invalid date '{}' (expected dd.mm.yyyy): {}", s, e)))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a user supplied override date; failures are planning errors
pub fn parse_override_date(label: &str, s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
        Error::Planning(format!(
            "{} date '{}' is not a valid dd.mm.yyyy date",
            label, s
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_date() {
        let date = parse_date("03.11.2014").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2014, 11, 3).unwrap());
        assert_eq!(format_date(date), "03.11.2014");
        assert_eq!(parse_date(" 5.1.2023 ").unwrap(), NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
    }

    #[test]
    fn test_parse_date_rejects_iso() {
        assert!(parse_date("2023-01-05").is_err());
    }

    #[test]
    fn test_override_date_is_planning_error() {
        let err = parse_override_date("from", "31.02.2023").unwrap_err();
        assert!(matches!(err, Error::Planning(_)));
    }
}

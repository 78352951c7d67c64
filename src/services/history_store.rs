//! History file storage
//!
//! One `<CODE>.csv` per instrument under the data directory, written whole
//! through a `.tmp` sibling and a rename so readers only ever see a complete
//! file. Files start with a UTF-8 BOM so spreadsheet tools pick the right
//! encoding; numbers are written in canonical form (`.` decimal, no grouping).

use crate::constants::{history_column as col, ANALYSIS_DIR, HISTORY_FILE_EXTENSION, HISTORY_HEADER};
use crate::error::{Error, Result};
use crate::models::{DailyRecord, HistorySeries, IndicatorPoint, Instrument};
use crate::utils::{format_date, parse_date};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BOM: &str = "\u{feff}";

/// Result of merging fetched records into a persisted series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records that were not already present by date
    pub appended: usize,
    /// Series length after the merge
    pub total: usize,
}

/// Combine a persisted series with new records
///
/// The first record seen for a date wins, so persisted history is never
/// rewritten. The result is sorted ascending by date.
pub fn merge_series(existing: HistorySeries, new_records: &[DailyRecord]) -> (HistorySeries, usize) {
    let mut seen: HashSet<NaiveDate> = HashSet::with_capacity(existing.len() + new_records.len());
    let mut merged: HistorySeries = Vec::with_capacity(existing.len() + new_records.len());

    for record in existing {
        if seen.insert(record.date) {
            merged.push(record);
        }
    }

    let mut appended = 0;
    for record in new_records {
        if seen.insert(record.date) {
            merged.push(record.clone());
            appended += 1;
        }
    }

    merged.sort_by_key(|r| r.date);
    (merged, appended)
}

fn format_number(value: f64) -> String {
    value.to_string()
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

fn record_to_row(record: &DailyRecord) -> Vec<String> {
    vec![
        format_date(record.date),
        record.year().to_string(),
        record.month().to_string(),
        format_number(record.last_price),
        format_optional(record.max_price),
        format_optional(record.min_price),
        format_optional(record.avg_price),
        format_optional(record.percent_change),
        record.quantity.to_string(),
        format_number(record.market_volume),
        record.total_volume.to_string(),
    ]
}

fn row_to_record(row: &csv::StringRecord, path: &Path, line: usize) -> Result<DailyRecord> {
    let bad = |field: &str, value: &str| {
        Error::Parse(format!(
            "{} line {}: invalid {} '{}'",
            path.display(),
            line,
            field,
            value
        ))
    };

    if row.len() != HISTORY_HEADER.len() {
        return Err(Error::Parse(format!(
            "{} line {}: expected {} columns, found {}",
            path.display(),
            line,
            HISTORY_HEADER.len(),
            row.len()
        )));
    }

    let cell = |idx: usize| row.get(idx).unwrap_or("").trim();
    let float = |idx: usize, field: &str| -> Result<f64> {
        cell(idx).parse::<f64>().map_err(|_| bad(field, cell(idx)))
    };
    let optional = |idx: usize, field: &str| -> Result<Option<f64>> {
        if cell(idx).is_empty() {
            Ok(None)
        } else {
            float(idx, field).map(Some)
        }
    };
    let integer = |idx: usize, field: &str| -> Result<u64> {
        cell(idx).parse::<u64>().map_err(|_| bad(field, cell(idx)))
    };

    Ok(DailyRecord {
        date: parse_date(cell(col::DATE)).map_err(|_| bad("date", cell(col::DATE)))?,
        last_price: float(col::LAST_PRICE, "last price")?,
        max_price: optional(col::MAX_PRICE, "max price")?,
        min_price: optional(col::MIN_PRICE, "min price")?,
        avg_price: optional(col::AVG_PRICE, "average price")?,
        percent_change: optional(col::PERCENT_CHANGE, "percent change")?,
        quantity: integer(col::QUANTITY, "quantity")?,
        market_volume: float(col::MARKET_VOLUME, "market volume")?,
        total_volume: integer(col::TOTAL_VOLUME, "total volume")?,
    })
}

/// Write rows to `path` via a temporary sibling and an atomic rename
fn write_atomically(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    let persistence = |e: &dyn std::fmt::Display| {
        Error::Persistence(format!("Failed to write {}: {}", path.display(), e))
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| persistence(&e))?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Persistence(format!("Invalid file path {}", path.display())))?;
    let tmp_path = path.with_file_name(format!("{}.tmp", file_name));

    let mut buffer: Vec<u8> = BOM.as_bytes().to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(header).map_err(|e| persistence(&e))?;
        for row in rows {
            writer.write_record(row).map_err(|e| persistence(&e))?;
        }
        writer.flush().map_err(|e| persistence(&e))?;
    }

    fs::write(&tmp_path, &buffer).map_err(|e| persistence(&e))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(persistence(&e));
    }

    Ok(())
}

/// File-backed store of instrument histories
#[derive(Debug, Clone)]
pub struct HistoryStore {
    base_dir: PathBuf,
}

impl HistoryStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn history_path(&self, instrument: &Instrument) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", instrument.code(), HISTORY_FILE_EXTENSION))
    }

    pub fn analysis_path(&self, instrument: &Instrument) -> PathBuf {
        self.base_dir
            .join(ANALYSIS_DIR)
            .join(format!("{}.{}", instrument.code(), HISTORY_FILE_EXTENSION))
    }

    /// Load the persisted series; an absent file is an empty series
    pub fn read_series(&self, instrument: &Instrument) -> Result<HistorySeries> {
        let path = self.history_path(instrument);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let content = content.strip_prefix(BOM).unwrap_or(&content);

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut series = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row?;
            // +2: header line and 1-based numbering
            series.push(row_to_record(&row, &path, idx + 2)?);
        }

        Ok(series)
    }

    pub fn last_date(&self, instrument: &Instrument) -> Result<Option<NaiveDate>> {
        Ok(self.read_series(instrument)?.iter().map(|r| r.date).max())
    }

    /// Instruments with a history file, sorted by code
    pub fn list_instruments(&self) -> Result<Vec<Instrument>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.base_dir)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", self.base_dir.display(), e)))?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::Io(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(HISTORY_FILE_EXTENSION)
            {
                continue;
            }
            if let Some(code) = path.file_stem().and_then(|s| s.to_str()) {
                match Instrument::parse(code) {
                    Ok(instrument) => instruments.push(instrument),
                    Err(_) => debug!(file = %path.display(), "Skipping non-instrument file"),
                }
            }
        }

        instruments.sort();
        Ok(instruments)
    }

    /// Merge new records into the persisted series
    ///
    /// The file is rewritten only when at least one record was appended.
    pub fn merge(&self, instrument: &Instrument, new_records: &[DailyRecord]) -> Result<MergeOutcome> {
        let existing = self.read_series(instrument)?;
        let (merged, appended) = merge_series(existing, new_records);

        if appended > 0 {
            self.write_series(instrument, &merged)?;
            info!(
                instrument = %instrument,
                appended,
                total = merged.len(),
                "Merged records into history"
            );
        }

        Ok(MergeOutcome {
            appended,
            total: merged.len(),
        })
    }

    fn write_series(&self, instrument: &Instrument, series: &[DailyRecord]) -> Result<()> {
        let header: Vec<String> = HISTORY_HEADER.iter().map(|h| h.to_string()).collect();
        let rows: Vec<Vec<String>> = series.iter().map(record_to_row).collect();
        write_atomically(&self.history_path(instrument), &header, &rows)
    }

    /// Persisted records with `from <= date <= to`
    pub fn filter_range(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HistorySeries> {
        if from > to {
            return Err(Error::Planning(format!(
                "from date {} is after to date {}",
                format_date(from),
                format_date(to)
            )));
        }

        let series = self.read_series(instrument)?;
        Ok(series
            .into_iter()
            .filter(|r| r.date >= from && r.date <= to)
            .collect())
    }

    /// Write the analysis artifact: history columns plus RSI and signal
    pub fn write_analysis(
        &self,
        instrument: &Instrument,
        series: &[DailyRecord],
        points: &[IndicatorPoint],
        period: usize,
    ) -> Result<PathBuf> {
        let by_date: HashMap<NaiveDate, &IndicatorPoint> =
            points.iter().map(|p| (p.date, p)).collect();

        let mut header: Vec<String> = HISTORY_HEADER.iter().map(|h| h.to_string()).collect();
        header.push(format!("RSI_{}", period));
        header.push(format!("Signal_{}", period));

        let rows: Vec<Vec<String>> = series
            .iter()
            .map(|record| {
                let mut row = record_to_row(record);
                match by_date.get(&record.date) {
                    Some(point) => {
                        row.push(format_number(point.rsi));
                        row.push(point.signal.to_string());
                    }
                    None => {
                        row.push(String::new());
                        row.push(String::new());
                    }
                }
                row
            })
            .collect();

        let path = self.analysis_path(instrument);
        write_atomically(&path, &header, &rows)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::daily_record::sample_record;
    use crate::models::Signal;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn abc() -> Instrument {
        Instrument::parse("ABC").unwrap()
    }

    #[test]
    fn test_merge_series_keeps_first_seen() {
        let existing = vec![sample_record(date(2023, 1, 2), 10.0)];
        let new = vec![
            sample_record(date(2023, 1, 3), 11.0),
            sample_record(date(2023, 1, 2), 99.0),
            sample_record(date(2023, 1, 3), 98.0),
        ];
        let (merged, appended) = merge_series(existing, &new);
        assert_eq!(appended, 1);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].last_price, 10.0);
        assert_eq!(merged[1].last_price, 11.0);
    }

    #[test]
    fn test_merge_series_sorts() {
        let existing = vec![sample_record(date(2023, 1, 5), 10.0)];
        let new = vec![sample_record(date(2023, 1, 3), 11.0)];
        let (merged, _) = merge_series(existing, &new);
        assert_eq!(merged[0].date, date(2023, 1, 3));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        let new = vec![
            sample_record(date(2023, 1, 2), 10.0),
            sample_record(date(2023, 1, 3), 10.5),
        ];

        let first = store.merge(&abc(), &new).unwrap();
        let bytes = fs::read(store.history_path(&abc())).unwrap();
        let second = store.merge(&abc(), &new).unwrap();

        assert_eq!(first, MergeOutcome { appended: 2, total: 2 });
        assert_eq!(second, MergeOutcome { appended: 0, total: 2 });
        assert_eq!(fs::read(store.history_path(&abc())).unwrap(), bytes);
    }

    #[test]
    fn test_failed_write_leaves_series_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        store.merge(&abc(), &[sample_record(date(2023, 1, 2), 10.0)]).unwrap();
        let bytes = fs::read(store.history_path(&abc())).unwrap();

        // A directory where the temporary file goes makes the write fail
        fs::create_dir(temp_dir.path().join("ABC.csv.tmp")).unwrap();
        let result = store.merge(&abc(), &[sample_record(date(2023, 1, 3), 11.0)]);

        assert!(matches!(result, Err(Error::Persistence(_))));
        assert_eq!(fs::read(store.history_path(&abc())).unwrap(), bytes);
        assert_eq!(store.last_date(&abc()).unwrap(), Some(date(2023, 1, 2)));
    }

    #[test]
    fn test_round_trip_and_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        let mut record = sample_record(date(2023, 3, 7), 21512.35);
        record.max_price = None;
        store.merge(&abc(), &[record.clone()]).unwrap();

        let raw = fs::read_to_string(store.history_path(&abc())).unwrap();
        assert!(raw.starts_with(BOM));
        let mut lines = raw.trim_start_matches(BOM).lines();
        assert_eq!(lines.next().unwrap(), HISTORY_HEADER.join(","));
        assert!(lines.next().unwrap().starts_with("07.03.2023,2023,3,21512.35,,"));

        assert_eq!(store.read_series(&abc()).unwrap(), vec![record]);
        assert_eq!(store.last_date(&abc()).unwrap(), Some(date(2023, 3, 7)));
        assert!(!temp_dir.path().join("ABC.csv.tmp").exists());
    }

    #[test]
    fn test_missing_file_is_empty_series() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        assert!(store.read_series(&abc()).unwrap().is_empty());
        assert_eq!(store.last_date(&abc()).unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        fs::write(store.history_path(&abc()), "Date,Year\n07.03.2023,2023\n").unwrap();
        assert!(matches!(store.read_series(&abc()), Err(Error::Parse(_))));
    }

    #[test]
    fn test_list_instruments() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        let record = sample_record(date(2023, 1, 2), 1.0);
        store.merge(&Instrument::parse("KMB").unwrap(), &[record.clone()]).unwrap();
        store.merge(&abc(), &[record.clone()]).unwrap();
        store
            .write_analysis(&abc(), &[record], &[], 14)
            .unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();

        let codes: Vec<String> = store
            .list_instruments()
            .unwrap()
            .into_iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(codes, vec!["ABC", "KMB"]);
    }

    #[test]
    fn test_filter_range() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        let records: Vec<DailyRecord> = (1..=10)
            .map(|d| sample_record(date(2023, 1, d), d as f64))
            .collect();
        store.merge(&abc(), &records).unwrap();

        let filtered = store
            .filter_range(&abc(), date(2023, 1, 3), date(2023, 1, 5))
            .unwrap();
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered[0].date, date(2023, 1, 3));

        assert!(matches!(
            store.filter_range(&abc(), date(2023, 1, 5), date(2023, 1, 3)),
            Err(Error::Planning(_))
        ));
    }

    #[test]
    fn test_write_analysis() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        let series = vec![
            sample_record(date(2023, 1, 2), 10.0),
            sample_record(date(2023, 1, 3), 11.0),
        ];
        let points = vec![IndicatorPoint {
            date: date(2023, 1, 3),
            rsi: 100.0,
            signal: Signal::Sell,
        }];

        let path = store.write_analysis(&abc(), &series, &points, 14).unwrap();
        assert_eq!(path, temp_dir.path().join("analysis").join("ABC.csv"));

        let raw = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = raw.trim_start_matches(BOM).lines().collect();
        assert!(lines[0].ends_with("Total Volume,RSI_14,Signal_14"));
        assert!(lines[1].ends_with(",,"));
        assert!(lines[2].ends_with(",100,Sell"));
    }
}

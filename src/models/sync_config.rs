use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_HISTORY_FLOOR, DEFAULT_MAX_PAGES, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RSI_PERIOD, DEFAULT_WORKERS, DISCOVERY_SEED_CODE,
};
use crate::error::{Error, Result};
use crate::models::Instrument;
use crate::utils::{format_date, get_market_data_dir, parse_date, parse_override_date};
use chrono::{Datelike, Local, NaiveDate};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Number formatting used by the remote results table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberLocale {
    /// `1.234,56` (the /mk/ pages)
    #[default]
    Macedonian,
    /// `1,234.56` (the /en/ pages)
    English,
}

impl NumberLocale {
    pub fn group_separator(&self) -> char {
        match self {
            NumberLocale::Macedonian => '.',
            NumberLocale::English => ',',
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            NumberLocale::Macedonian => ',',
            NumberLocale::English => '.',
        }
    }

}

impl FromStr for NumberLocale {
    type Err = String;

    /// Parse from string (case-insensitive)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mk" | "macedonian" => Ok(NumberLocale::Macedonian),
            "en" | "english" => Ok(NumberLocale::English),
            _ => Err(format!("Invalid number locale: {}. Valid options: mk, en", s)),
        }
    }
}

/// Configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory holding one history file per instrument
    pub data_dir: PathBuf,

    /// Symbol history endpoint without the trailing code
    pub base_url: String,

    /// Code whose page is used to discover the instrument list
    pub seed_code: String,

    /// First date fetched for an instrument with no history on disk
    pub history_floor: NaiveDate,

    /// Concurrent instrument pipelines
    pub workers: usize,

    /// Per-request timeout; a timed-out page counts as a transport failure
    pub request_timeout: Duration,

    /// Pages followed per yearly window before giving up
    pub max_pages: usize,

    pub rsi_period: usize,

    pub number_locale: NumberLocale,

    /// Restrict the run to these instruments instead of discovering them
    pub instruments: Option<Vec<Instrument>>,

    /// Explicit start date, overrides "day after last persisted date"
    pub start_override: Option<NaiveDate>,

    /// Last date to request (usually today)
    pub end_date: NaiveDate,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: get_market_data_dir(),
            base_url: DEFAULT_BASE_URL.to_string(),
            seed_code: DISCOVERY_SEED_CODE.to_string(),
            history_floor: default_history_floor(),
            workers: DEFAULT_WORKERS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_pages: DEFAULT_MAX_PAGES,
            rsi_period: DEFAULT_RSI_PERIOD,
            number_locale: NumberLocale::default(),
            instruments: None,
            start_override: None,
            end_date: Local::now().date_naive(),
        }
    }
}

fn default_history_floor() -> NaiveDate {
    parse_date(DEFAULT_HISTORY_FLOOR).unwrap_or(NaiveDate::MIN)
}

impl SyncConfig {
    /// Defaults overlaid with `MSE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MSE_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(floor) = std::env::var("MSE_HISTORY_FLOOR") {
            config.history_floor = parse_date(&floor)
                .map_err(|e| Error::Config(format!("MSE_HISTORY_FLOOR: {}", e)))?;
        }
        if let Ok(workers) = std::env::var("MSE_WORKERS") {
            config.workers = workers
                .parse()
                .map_err(|e| Error::Config(format!("MSE_WORKERS '{}': {}", workers, e)))?;
        }
        if let Ok(secs) = std::env::var("MSE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| Error::Config(format!("MSE_TIMEOUT_SECS '{}': {}", secs, e)))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(locale) = std::env::var("MSE_NUMBER_LOCALE") {
            config.number_locale = locale.parse().map_err(Error::Config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides given as plain strings
    ///
    /// Every value is validated here so a bad override never reaches the
    /// planner or the network.
    pub fn with_overrides(
        mut self,
        issuers: &[String],
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Self> {
        if !issuers.is_empty() {
            let mut instruments = issuers
                .iter()
                .map(|code| Instrument::parse(code))
                .collect::<Result<Vec<_>>>()?;
            instruments.sort();
            instruments.dedup();
            self.instruments = Some(instruments);
        }

        if let Some(from) = from {
            self.start_override = Some(parse_override_date("from", from)?);
        }

        if let Some(to) = to {
            let to = parse_override_date("to", to)?;
            self.end_date = self.end_date.min(to);
        }

        if let Some(start) = self.start_override {
            if start > self.end_date {
                return Err(Error::Planning(format!(
                    "from date {} is after to date {}",
                    format_date(start),
                    format_date(self.end_date)
                )));
            }
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }
        if self.max_pages == 0 {
            return Err(Error::Config("max pages must be at least 1".to_string()));
        }
        if self.rsi_period == 0 {
            return Err(Error::Config("RSI period must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn history_floor_string(&self) -> String {
        format_date(self.history_floor)
    }
}

/// One remote query: an instrument and an inclusive date range inside one calendar year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWindow {
    pub instrument: Instrument,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl SyncWindow {
    pub fn year(&self) -> i32 {
        self.from.year()
    }
}

/// Final state of one instrument's pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentStatus {
    /// New records were merged and persisted
    Updated,
    /// Planner found nothing to fetch, or the remote returned no new rows
    UpToDate,
    /// At least one window was lost (transport failure or truncated walk);
    /// complete windows were still merged
    Incomplete,
    /// Pipeline stopped; records persisted before the failure are kept
    Failed(String),
}

/// Per-instrument outcome reported by the coordinator
#[derive(Debug, Clone)]
pub struct InstrumentReport {
    pub instrument: Instrument,
    pub status: InstrumentStatus,
    pub windows: usize,
    pub pages: usize,
    pub new_records: usize,
    pub total_records: usize,
    /// Windows discarded because their walk did not run to the last page
    pub lost_windows: usize,
    pub elapsed: Duration,
}

impl InstrumentReport {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            status: InstrumentStatus::UpToDate,
            windows: 0,
            pages: 0,
            new_records: 0,
            total_records: 0,
            lost_windows: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, InstrumentStatus::Failed(_))
    }
}

/// Statistics for a whole sync run
#[derive(Debug, Default)]
pub struct SyncStats {
    pub updated: usize,
    pub up_to_date: usize,
    pub failed: usize,
    /// Instruments not started because the run was cancelled
    pub skipped: usize,
    pub incomplete: usize,
    pub total_new_records: usize,
    pub elapsed: Duration,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &InstrumentReport) {
        match report.status {
            InstrumentStatus::Updated => self.updated += 1,
            InstrumentStatus::UpToDate => self.up_to_date += 1,
            InstrumentStatus::Incomplete => self.incomplete += 1,
            InstrumentStatus::Failed(_) => self.failed += 1,
        }
        self.total_new_records += report.new_records;
    }

    pub fn total_processed(&self) -> usize {
        self.updated + self.up_to_date + self.incomplete + self.failed
    }

    /// Failed or incomplete instruments; a run with any of these is not clean
    pub fn has_problems(&self) -> bool {
        self.failed > 0 || self.incomplete > 0
    }
}

/// Everything a run produced, in instrument order
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub reports: Vec<InstrumentReport>,
    pub stats: SyncStats,
}

impl SyncSummary {
    pub fn failures(&self) -> impl Iterator<Item = &InstrumentReport> {
        self.reports.iter().filter(|r| r.is_failure())
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &InstrumentReport> {
        self.reports
            .iter()
            .filter(|r| r.status == InstrumentStatus::Incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig {
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_sync_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.workers, 16);
        assert_eq!(config.rsi_period, 14);
        assert_eq!(config.history_floor_string(), DEFAULT_HISTORY_FLOOR);
        assert_eq!(config.number_locale, NumberLocale::Macedonian);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_number_locale_from_str() {
        assert_eq!("MK".parse::<NumberLocale>().unwrap(), NumberLocale::Macedonian);
        assert_eq!("english".parse::<NumberLocale>().unwrap(), NumberLocale::English);
        assert!("fr".parse::<NumberLocale>().is_err());
    }

    #[test]
    fn test_overrides_valid() {
        let config = config()
            .with_overrides(
                &["kmb".to_string(), "ADIN".to_string(), "KMB".to_string()],
                Some("01.01.2023"),
                Some("31.03.2023"),
            )
            .unwrap();
        let codes: Vec<&str> = config.instruments.as_ref().unwrap().iter().map(|i| i.code()).collect();
        assert_eq!(codes, vec!["ADIN", "KMB"]);
        assert_eq!(config.start_override, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2023, 3, 31).unwrap());
    }

    #[test]
    fn test_override_to_never_extends_past_today() {
        let config = config().with_overrides(&[], None, Some("31.12.2030")).unwrap();
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    }

    #[test]
    fn test_overrides_rejected_as_planning_errors() {
        assert!(matches!(
            config().with_overrides(&[], Some("2023-01-01"), None),
            Err(Error::Planning(_))
        ));
        assert!(matches!(
            config().with_overrides(&[], Some("01.06.2023"), Some("01.01.2023")),
            Err(Error::Planning(_))
        ));
        assert!(matches!(
            config().with_overrides(&["A/B".to_string()], None, None),
            Err(Error::Planning(_))
        ));
    }

    #[test]
    fn test_sync_stats_record() {
        let instrument = Instrument::parse("ABC").unwrap();
        let mut stats = SyncStats::new();

        let mut updated = InstrumentReport::new(instrument.clone());
        updated.status = InstrumentStatus::Updated;
        updated.new_records = 5;
        stats.record(&updated);

        let mut incomplete = InstrumentReport::new(instrument.clone());
        incomplete.status = InstrumentStatus::Incomplete;
        incomplete.lost_windows = 2;
        stats.record(&incomplete);
        assert!(stats.has_problems());

        let mut failed = InstrumentReport::new(instrument);
        failed.status = InstrumentStatus::Failed("boom".to_string());
        stats.record(&failed);

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.incomplete, 1);
        assert_eq!(stats.up_to_date, 0);
        assert_eq!(stats.total_new_records, 5);
        assert_eq!(stats.total_processed(), 3);
    }

    #[test]
    fn test_sync_stats_clean_run() {
        let mut stats = SyncStats::new();
        stats.record(&InstrumentReport::new(Instrument::parse("ABC").unwrap()));
        assert_eq!(stats.up_to_date, 1);
        assert!(!stats.has_problems());
    }
}

//! Per-instrument date range planning
//!
//! The remote form is queried one calendar year at a time. The first window
//! starts at the computed from-date, later ones on Jan 1; every window ends
//! on Dec 31 except the last, which ends at the configured end date.

use crate::models::{Instrument, SyncConfig, SyncWindow};
use chrono::{Datelike, NaiveDate};

/// First date still missing for an instrument
///
/// An explicit start override wins, then the day after the last persisted
/// date, then the history floor.
pub fn start_date(last_persisted: Option<NaiveDate>, config: &SyncConfig) -> Option<NaiveDate> {
    if let Some(start) = config.start_override {
        return Some(start);
    }
    match last_persisted {
        Some(last) => last.succ_opt(),
        None => Some(config.history_floor),
    }
}

/// Split an inclusive range into calendar-year windows
///
/// Returns nothing when `from` is after `to`.
pub fn yearly_windows(instrument: &Instrument, from: NaiveDate, to: NaiveDate) -> Vec<SyncWindow> {
    if from > to {
        return Vec::new();
    }

    (from.year()..=to.year())
        .filter_map(|year| {
            let window_from = if year == from.year() {
                from
            } else {
                NaiveDate::from_ymd_opt(year, 1, 1)?
            };
            let window_to = if year == to.year() {
                to
            } else {
                NaiveDate::from_ymd_opt(year, 12, 31)?
            };
            Some(SyncWindow {
                instrument: instrument.clone(),
                from: window_from,
                to: window_to,
            })
        })
        .collect()
}

/// Plan the windows still needed for one instrument
pub fn plan(
    instrument: &Instrument,
    last_persisted: Option<NaiveDate>,
    config: &SyncConfig,
) -> Vec<SyncWindow> {
    match start_date(last_persisted, config) {
        Some(from) => yearly_windows(instrument, from, config.end_date),
        None => Vec::new(),
    }
}

use crate::error::{Error, Result};
use crate::models::{Instrument, Signal};
use crate::services::analysis::latest_signal;
use crate::services::history_store::HistoryStore;
use chrono::NaiveDate;

/// Local store statistics
#[derive(Debug, Clone)]
pub struct MarketStats {
    pub total_instruments: usize,
    pub total_records: usize,
    pub has_data: bool,
}

/// Summary of one instrument's persisted history
#[derive(Debug, Clone)]
pub struct InstrumentInfo {
    pub instrument: Instrument,
    pub record_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_price: Option<f64>,
    /// Signal of the most recent day, if enough history exists
    pub last_signal: Option<Signal>,
}

/// Get detailed information for one instrument
pub fn get_instrument_info(
    store: &HistoryStore,
    instrument: &Instrument,
    rsi_period: usize,
) -> Result<InstrumentInfo> {
    if !store.history_path(instrument).exists() {
        return Err(Error::NotFound(format!("Instrument '{}' has no history", instrument)));
    }

    let series = store.read_series(instrument)?;

    Ok(InstrumentInfo {
        instrument: instrument.clone(),
        record_count: series.len(),
        first_date: series.first().map(|r| r.date),
        last_date: series.last().map(|r| r.date),
        last_price: series.last().map(|r| r.last_price),
        last_signal: latest_signal(&series, rsi_period),
    })
}

/// Per-instrument info for every history file plus totals
///
/// Unreadable files are reported as errors next to the instrument instead of
/// failing the whole report.
pub fn get_market_stats(
    store: &HistoryStore,
    rsi_period: usize,
) -> Result<(MarketStats, Vec<(Instrument, Result<InstrumentInfo>)>)> {
    let instruments = store.list_instruments()?;

    let infos: Vec<(Instrument, Result<InstrumentInfo>)> = instruments
        .into_iter()
        .map(|instrument| {
            let info = get_instrument_info(store, &instrument, rsi_period);
            (instrument, info)
        })
        .collect();

    let total_records = infos
        .iter()
        .filter_map(|(_, info)| info.as_ref().ok())
        .map(|info| info.record_count)
        .sum();

    let stats = MarketStats {
        total_instruments: infos.len(),
        total_records,
        has_data: !infos.is_empty(),
    };

    Ok((stats, infos))
}

//! Indicator pass over persisted histories
//!
//! Reads each history file, computes RSI signals and writes the analysis
//! artifact. Never touches the network and never modifies history files.

use crate::error::{Error, Result};
use crate::models::indicators::compute_signals;
use crate::models::{DailyRecord, Instrument, Signal};
use crate::services::history_store::HistoryStore;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub instrument: Instrument,
    pub records: usize,
    pub points: usize,
    pub last_signal: Option<Signal>,
    pub path: PathBuf,
}

/// Signal of the most recent record
pub fn latest_signal(series: &[DailyRecord], period: usize) -> Option<Signal> {
    compute_signals(series, period).last().map(|p| p.signal)
}

/// Compute and write the analysis artifact for one instrument
pub fn analyze_instrument(
    store: &HistoryStore,
    instrument: &Instrument,
    period: usize,
) -> Result<AnalysisReport> {
    let series = store.read_series(instrument)?;
    if series.is_empty() {
        return Err(Error::NotFound(format!("Instrument '{}' has no history", instrument)));
    }

    let points = compute_signals(&series, period);
    let path = store.write_analysis(instrument, &series, &points, period)?;

    Ok(AnalysisReport {
        instrument: instrument.clone(),
        records: series.len(),
        points: points.len(),
        last_signal: points.last().map(|p| p.signal),
        path,
    })
}

/// Analyze the given instruments, or every stored one when `None`
///
/// One instrument failing does not stop the others.
pub fn analyze_all(
    store: &HistoryStore,
    instruments: Option<&[Instrument]>,
    period: usize,
) -> Result<Vec<(Instrument, Result<AnalysisReport>)>> {
    let instruments = match instruments {
        Some(list) => list.to_vec(),
        None => store.list_instruments()?,
    };

    let results: Vec<(Instrument, Result<AnalysisReport>)> = instruments
        .into_iter()
        .map(|instrument| {
            let result = analyze_instrument(store, &instrument, period);
            if let Err(e) = &result {
                warn!(instrument = %instrument, error = %e, "Analysis failed");
            }
            (instrument, result)
        })
        .collect();

    let succeeded = results.iter().filter(|(_, r)| r.is_ok()).count();
    info!(
        analyzed = succeeded,
        failed = results.len() - succeeded,
        period,
        "Analysis pass complete"
    );

    Ok(results)
}

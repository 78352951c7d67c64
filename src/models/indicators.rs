//! Momentum indicator and trading signal calculations
//!
//! # Price Input
//! All functions take `Price for Last Transaction` values in denars exactly
//! as persisted. RSI is a ratio so the unit cancels out; no scaling is ever
//! applied.
//!
//! ## Windowing
//! - Deltas start at the second point; the first point has no RSI.
//! - Averages use the trailing `period` deltas, or fewer near the start
//!   (minimum window of 1).
//! - A window with zero average loss has RSI 100.

use crate::constants::{RSI_OVERBOUGHT, RSI_OVERSOLD};
use crate::models::DailyRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Discrete signal derived from RSI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "Buy",
            Signal::Sell => "Sell",
            Signal::Hold => "Hold",
        };
        f.write_str(s)
    }
}

/// One derived point; never written back into the history series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub rsi: f64,
    pub signal: Signal,
}

/// Classify an RSI value with strict thresholds
///
/// `rsi < 30` is Buy, `rsi > 70` is Sell, everything else (both
/// boundaries included) is Hold.
pub fn classify_rsi(rsi: f64) -> Signal {
    if rsi < RSI_OVERSOLD {
        Signal::Buy
    } else if rsi > RSI_OVERBOUGHT {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// Calculate RSI for a price series
///
/// # Arguments
/// * `closes` - Last transaction prices, ascending by date
/// * `period` - Trailing window length in deltas (e.g., 14)
///
/// # Returns
/// * Vector of the same length as `closes`; index 0 is always `None`
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut rsi_values = vec![None; closes.len()];

    if period == 0 || closes.len() < 2 {
        return rsi_values;
    }

    let mut gains = vec![0.0; closes.len()];
    let mut losses = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else if delta < 0.0 {
            losses[i] = -delta;
        }
    }

    for i in 1..closes.len() {
        let start_idx = if i + 1 > period { i + 1 - period } else { 1 };
        let window = (i + 1 - start_idx) as f64;
        let avg_gain: f64 = gains[start_idx..=i].iter().sum::<f64>() / window;
        let avg_loss: f64 = losses[start_idx..=i].iter().sum::<f64>() / window;

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
        rsi_values[i] = Some(rsi);
    }

    rsi_values
}

/// Compute one indicator point per record after the first
pub fn compute_signals(series: &[DailyRecord], period: usize) -> Vec<IndicatorPoint> {
    let closes: Vec<f64> = series.iter().map(|r| r.last_price).collect();

    calculate_rsi(&closes, period)
        .into_iter()
        .zip(series.iter())
        .filter_map(|(rsi, record)| {
            rsi.map(|rsi| IndicatorPoint {
                date: record.date,
                rsi,
                signal: classify_rsi(rsi),
            })
        })
        .collect()
}

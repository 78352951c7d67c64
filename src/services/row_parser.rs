//! Results-table row parsing
//!
//! Cell order on the symbol history page:
//! `Date | Last | Max | Min | Avg | %Chg | Quantity | Turnover (MKD) | Total turnover`

use crate::constants::RAW_ROW_CELLS;
use crate::error::{Error, Result};
use crate::models::{DailyRecord, NumberLocale};
use crate::utils::parse_date;

/// Strip grouping separators and switch the decimal mark to `.`
pub fn normalize_number(raw: &str, locale: NumberLocale) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != locale.group_separator() && !c.is_whitespace())
        .map(|c| if c == locale.decimal_separator() { '.' } else { c })
        .collect()
}

fn parse_decimal(raw: &str, locale: NumberLocale) -> std::result::Result<f64, String> {
    let normalized = normalize_number(raw, locale);
    if normalized.is_empty() {
        return Err("empty numeric cell".to_string());
    }
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{}' is not a number", raw.trim()))
}

/// Empty cells are legitimate for fields that are blank on no-trade days
fn parse_optional_decimal(raw: &str, locale: NumberLocale) -> std::result::Result<Option<f64>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_decimal(raw, locale).map(Some)
}

fn parse_integer(raw: &str, locale: NumberLocale) -> std::result::Result<u64, String> {
    let normalized = normalize_number(raw, locale);
    if let Ok(value) = normalized.parse::<u64>() {
        return Ok(value);
    }
    // Some pages render integer columns as "1.234,00"
    let value = parse_decimal(raw, locale)?;
    if value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(format!("'{}' is not a whole non-negative number", raw.trim()));
    }
    Ok(value as u64)
}

/// Parse one results-table row into a typed record
///
/// Fails with `MalformedRow` when fewer than nine cells are present or any
/// required cell does not parse after locale normalization.
pub fn parse_row(cells: &[String], locale: NumberLocale) -> Result<DailyRecord> {
    let context = cells.join(" | ");
    let malformed = |reason: String| Error::malformed(context.clone(), reason);

    if cells.len() < RAW_ROW_CELLS {
        return Err(malformed(format!(
            "expected {} cells, found {}",
            RAW_ROW_CELLS,
            cells.len()
        )));
    }

    let date = parse_date(&cells[0]).map_err(|e| malformed(e.to_string()))?;
    let field = |name: &str, e: String| malformed(format!("{}: {}", name, e));

    Ok(DailyRecord {
        date,
        last_price: parse_decimal(&cells[1], locale).map_err(|e| field("last price", e))?,
        max_price: parse_optional_decimal(&cells[2], locale).map_err(|e| field("max price", e))?,
        min_price: parse_optional_decimal(&cells[3], locale).map_err(|e| field("min price", e))?,
        avg_price: parse_optional_decimal(&cells[4], locale).map_err(|e| field("average price", e))?,
        percent_change: parse_optional_decimal(&cells[5], locale)
            .map_err(|e| field("percent change", e))?,
        quantity: parse_integer(&cells[6], locale).map_err(|e| field("quantity", e))?,
        market_volume: parse_decimal(&cells[7], locale).map_err(|e| field("market volume", e))?,
        total_volume: parse_integer(&cells[8], locale).map_err(|e| field("total volume", e))?,
    })
}

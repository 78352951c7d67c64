use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

/// One trading day for one instrument
///
/// Prices are stored as plain `f64` in denars. Max/min/average and the
/// percent change are absent on days without trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub last_price: f64,
    pub max_price: Option<f64>,
    pub min_price: Option<f64>,
    pub avg_price: Option<f64>,
    pub percent_change: Option<f64>,
    pub quantity: u64,
    pub market_volume: f64,
    pub total_volume: u64,
}

fn serialize_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&crate::utils::format_date(*date))
}

impl DailyRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// Date-ordered history of one instrument, the unit of storage
pub type HistorySeries = Vec<DailyRecord>;

#[cfg(test)]
pub(crate) fn sample_record(date: NaiveDate, last_price: f64) -> DailyRecord {
    DailyRecord {
        date,
        last_price,
        max_price: Some(last_price),
        min_price: Some(last_price),
        avg_price: Some(last_price),
        percent_change: Some(0.0),
        quantity: 10,
        market_volume: last_price * 10.0,
        total_volume: (last_price * 10.0) as u64,
    }
}

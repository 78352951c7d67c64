pub mod daily_record;
mod instrument;
pub mod indicators;
pub mod sync_config;

pub use daily_record::{DailyRecord, HistorySeries};
pub use indicators::{IndicatorPoint, Signal};
pub use instrument::Instrument;
pub use sync_config::{
    InstrumentReport, InstrumentStatus, NumberLocale, SyncConfig, SyncStats, SyncSummary,
    SyncWindow,
};

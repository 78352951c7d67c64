pub mod analysis;
pub mod data_sync;
pub mod events;
pub mod history_store;
pub mod html;
pub mod market_stats;
pub mod mse_client;
pub mod page_walker;
pub mod row_parser;
pub mod sync_planner;

#[cfg(test)]
pub(crate) mod test_support;

pub use analysis::{analyze_all, analyze_instrument, AnalysisReport};
pub use data_sync::DataSync;
pub use events::{EventLevel, EventSink, SyncEvent};
pub use history_store::{HistoryStore, MergeOutcome};
pub use market_stats::{get_instrument_info, get_market_stats, InstrumentInfo, MarketStats};
pub use mse_client::{discover_instruments, MseClient, PageRequest, PageSource};
pub use page_walker::{fetch_window, WalkOutcome, WalkStop};
pub use sync_planner::plan;

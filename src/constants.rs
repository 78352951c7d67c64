//! Exchange and file-format constants
//!
//! ## History file layout
//!
//! One `<CODE>.csv` per instrument, 11 columns, ascending by date:
//! - `Date` (dd.mm.yyyy), `Year`, `Month` (derived, for grouping)
//! - four prices, `% Change`, `Quantity`, `Market Volume (MKD)`, `Total Volume`
//!
//! Analysis files under `analysis/` append `RSI_<period>` and `Signal_<period>`.

/// Symbol history endpoint; `{}` is replaced by the instrument code
pub const DEFAULT_BASE_URL: &str = "https://www.mse.mk/mk/stats/symbolhistory";

/// Any issuer page carries the full `#Code` selection list
pub const DISCOVERY_SEED_CODE: &str = "ADIN";

pub const USER_AGENT: &str = "Mozilla/5.0";

/// Date format used by the remote form and the history files
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// First trading day with published history when nothing is on disk yet
pub const DEFAULT_HISTORY_FLOOR: &str = "03.11.2014";

pub const DEFAULT_WORKERS: usize = 16;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on pages followed inside one yearly window
pub const DEFAULT_MAX_PAGES: usize = 500;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// RSI strictly below this is a buy
pub const RSI_OVERSOLD: f64 = 30.0;

/// RSI strictly above this is a sell
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Cells per results-table row
pub const RAW_ROW_CELLS: usize = 9;

pub const HISTORY_FILE_EXTENSION: &str = "csv";

pub const ANALYSIS_DIR: &str = "analysis";

pub const HISTORY_HEADER: [&str; 11] = [
    "Date",
    "Year",
    "Month",
    "Price for Last Transaction",
    "Max Price",
    "Min Price",
    "Average Price",
    "% Change",
    "Quantity",
    "Market Volume (MKD)",
    "Total Volume",
];

/// Column indices for the history file (0-indexed)
pub mod history_column {
    pub const DATE: usize = 0;
    pub const YEAR: usize = 1;
    pub const MONTH: usize = 2;
    pub const LAST_PRICE: usize = 3;
    pub const MAX_PRICE: usize = 4;
    pub const MIN_PRICE: usize = 5;
    pub const AVG_PRICE: usize = 6;
    pub const PERCENT_CHANGE: usize = 7;
    pub const QUANTITY: usize = 8;
    pub const MARKET_VOLUME: usize = 9;
    pub const TOTAL_VOLUME: usize = 10;
}

/// Results-table selectors on the symbol history page
pub mod selectors {
    pub const RESULT_ROWS: &str = "#resultsTable > tbody > tr";
    pub const CELL: &str = "td";
    pub const NEXT_PAGE: &str = ".next > a";
    pub const ISSUER_OPTIONS: &str = "#Code > option";
}

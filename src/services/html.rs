//! HTML extraction for symbol history pages
//!
//! `scraper::Html` is not `Send`, so every function here parses, extracts
//! owned data and drops the document before returning.

use crate::constants::selectors;
use crate::error::{Error, Result};
use crate::models::Instrument;
use scraper::{ElementRef, Html, Selector};

/// Rows and pagination link extracted from one results page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsPage {
    /// Text of each `td`, trimmed, one entry per row in document order
    pub rows: Vec<Vec<String>>,
    /// Raw `href` of the next-page link, if the page has one
    pub next_href: Option<String>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("Invalid selector '{}': {}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parse the results table and the next-page affordance
///
/// Rows without any `td` (header or spacer rows) are skipped.
pub fn parse_results_page(html: &str) -> Result<ResultsPage> {
    let row_selector = selector(selectors::RESULT_ROWS)?;
    let cell_selector = selector(selectors::CELL)?;
    let next_selector = selector(selectors::NEXT_PAGE)?;

    let document = Html::parse_document(html);

    let rows = document
        .select(&row_selector)
        .map(|tr| tr.select(&cell_selector).map(element_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    let next_href = document
        .select(&next_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty() && !href.starts_with('#'));

    Ok(ResultsPage { rows, next_href })
}

/// Extract security codes from the `#Code` selection list
///
/// Codes containing digits are dropped; the rest are trimmed, deduplicated
/// and sorted.
pub fn parse_issuer_options(html: &str) -> Result<Vec<Instrument>> {
    let option_selector = selector(selectors::ISSUER_OPTIONS)?;
    let document = Html::parse_document(html);

    let mut instruments: Vec<Instrument> = document
        .select(&option_selector)
        .map(element_text)
        .filter(|code| !code.is_empty() && Instrument::is_security_code(code))
        .filter_map(|code| Instrument::parse(&code).ok())
        .collect();

    instruments.sort();
    instruments.dedup();
    Ok(instruments)
}

//! Pagination over one sync window
//!
//! The walk is an explicit loop: each next-page link is resolved to an
//! absolute URL and must be one the loop has not fetched yet, and at most
//! `max_pages` pages are fetched per window.

use crate::error::{Error, Result};
use crate::models::{DailyRecord, NumberLocale, SyncWindow};
use crate::services::html::parse_results_page;
use crate::services::mse_client::{PageRequest, PageSource};
use crate::services::row_parser::parse_row;
use reqwest::Url;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Why the walk ended
#[derive(Debug, Clone, PartialEq)]
pub enum WalkStop {
    /// Last page had no next link
    Exhausted,
    /// A page failed; the window yields no records
    TransportFailure(String),
    /// Next link pointed at a page already fetched
    RevisitedPage(String),
    /// `max_pages` reached with a next link still present
    PageLimit,
    /// Next link could not be resolved to a URL
    InvalidNextLink(String),
}

#[derive(Debug, Clone)]
pub struct WalkOutcome {
    /// Ascending by date
    pub records: Vec<DailyRecord>,
    pub pages: usize,
    pub stop: WalkStop,
}

impl WalkOutcome {
    /// Only a walk that reached the last page covers the whole window
    pub fn is_complete(&self) -> bool {
        self.stop == WalkStop::Exhausted
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self.stop, WalkStop::TransportFailure(_))
    }
}

fn resolve_next(current: &str, href: &str) -> Result<String> {
    let base = Url::parse(current)
        .map_err(|e| Error::Parse(format!("Invalid page URL '{}': {}", current, e)))?;
    let next = base
        .join(href)
        .map_err(|e| Error::Parse(format!("Invalid next-page link '{}': {}", href, e)))?;
    Ok(next.to_string())
}

/// Fetch every page of one window
///
/// A transport failure on any page is not an error: the outcome carries no
/// records and `WalkStop::TransportFailure`. Other early stops keep the rows
/// read so far; callers must check `is_complete` before trusting them. A
/// malformed row is an error and nothing from the window is returned.
pub async fn fetch_window(
    source: &dyn PageSource,
    base_url: &str,
    window: &SyncWindow,
    locale: NumberLocale,
    max_pages: usize,
) -> Result<WalkOutcome> {
    let mut request = PageRequest::history(base_url, window);
    let mut visited: HashSet<String> = HashSet::new();
    let mut records: Vec<DailyRecord> = Vec::new();
    let mut pages = 0;

    let stop = loop {
        if pages >= max_pages {
            warn!(
                instrument = %window.instrument,
                year = window.year(),
                max_pages,
                "Page limit reached, stopping pagination"
            );
            break WalkStop::PageLimit;
        }

        visited.insert(request.url().to_string());

        let html = match source.fetch(&request).await {
            Ok(html) => html,
            Err(e) => {
                warn!(
                    instrument = %window.instrument,
                    year = window.year(),
                    page = pages + 1,
                    error = %e,
                    "Page fetch failed, window yields no records"
                );
                return Ok(WalkOutcome {
                    records: Vec::new(),
                    pages,
                    stop: WalkStop::TransportFailure(e.to_string()),
                });
            }
        };
        pages += 1;

        let page = parse_results_page(&html)?;
        for cells in &page.rows {
            records.push(parse_row(cells, locale)?);
        }

        debug!(
            instrument = %window.instrument,
            year = window.year(),
            page = pages,
            rows = page.rows.len(),
            "Parsed page"
        );

        let Some(href) = page.next_href else {
            break WalkStop::Exhausted;
        };

        let next_url = match resolve_next(request.url(), &href) {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    instrument = %window.instrument,
                    year = window.year(),
                    error = %e,
                    "Unusable next-page link, stopping pagination"
                );
                break WalkStop::InvalidNextLink(href);
            }
        };
        if visited.contains(&next_url) {
            warn!(
                instrument = %window.instrument,
                year = window.year(),
                url = %next_url,
                "Next-page link revisits a fetched page, stopping pagination"
            );
            break WalkStop::RevisitedPage(next_url);
        }

        request = request.follow(next_url);
    };

    // Pages arrive newest-first
    records.reverse();
    records.sort_by_key(|r| r.date);

    Ok(WalkOutcome {
        records,
        pages,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Instrument;
    use crate::services::test_support::{results_page, FakeSource, BASE_URL};
    use chrono::NaiveDate;

    fn window() -> SyncWindow {
        SyncWindow {
            instrument: Instrument::parse("ABC").unwrap(),
            from: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        }
    }

    fn first_url() -> String {
        format!("{}/ABC", BASE_URL)
    }

    fn dates(outcome: &WalkOutcome) -> Vec<String> {
        outcome
            .records
            .iter()
            .map(|r| crate::utils::format_date(r.date))
            .collect()
    }

    #[tokio::test]
    async fn test_two_pages_ascending() {
        let source = FakeSource::new()
            .page(
                &first_url(),
                results_page(
                    &[("05.01.2023", "105,00"), ("04.01.2023", "104,00"), ("03.01.2023", "103,00")],
                    Some("/mk/stats/symbolhistory/ABC?page=2"),
                ),
            )
            .page(
                "https://mse.test/mk/stats/symbolhistory/ABC?page=2",
                results_page(&[("02.01.2023", "102,00"), ("01.01.2023", "101,00")], None),
            );

        let outcome = fetch_window(&source, BASE_URL, &window(), NumberLocale::Macedonian, 10)
            .await
            .unwrap();

        assert_eq!(outcome.stop, WalkStop::Exhausted);
        assert!(outcome.is_complete());
        assert_eq!(outcome.pages, 2);
        assert_eq!(
            dates(&outcome),
            vec!["01.01.2023", "02.01.2023", "03.01.2023", "04.01.2023", "05.01.2023"]
        );
        assert_eq!(outcome.records[4].last_price, 105.0);
    }

    #[tokio::test]
    async fn test_self_referencing_next_link_terminates() {
        let source = FakeSource::new().page(
            &first_url(),
            results_page(&[("05.01.2023", "1,00")], Some("/mk/stats/symbolhistory/ABC")),
        );

        let outcome = fetch_window(&source, BASE_URL, &window(), NumberLocale::Macedonian, 10)
            .await
            .unwrap();

        assert!(matches!(outcome.stop, WalkStop::RevisitedPage(_)));
        assert!(!outcome.is_complete());
        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_between_pages_terminates() {
        let page2 = "https://mse.test/mk/stats/symbolhistory/ABC?page=2";
        let source = FakeSource::new()
            .page(&first_url(), results_page(&[("05.01.2023", "1,00")], Some(page2)))
            .page(
                page2,
                results_page(&[("04.01.2023", "1,00")], Some("/mk/stats/symbolhistory/ABC")),
            );

        let outcome = fetch_window(&source, BASE_URL, &window(), NumberLocale::Macedonian, 10)
            .await
            .unwrap();

        assert!(matches!(outcome.stop, WalkStop::RevisitedPage(_)));
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_page_limit() {
        let page2 = "https://mse.test/mk/stats/symbolhistory/ABC?page=2";
        let source = FakeSource::new()
            .page(&first_url(), results_page(&[("05.01.2023", "1,00")], Some(page2)))
            .page(page2, results_page(&[("04.01.2023", "1,00")], Some("?page=3")));

        let outcome = fetch_window(&source, BASE_URL, &window(), NumberLocale::Macedonian, 2)
            .await
            .unwrap();

        assert_eq!(outcome.stop, WalkStop::PageLimit);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_yields_no_records() {
        let page2 = "https://mse.test/mk/stats/symbolhistory/ABC?page=2";
        let source = FakeSource::new()
            .page(&first_url(), results_page(&[("05.01.2023", "1,00")], Some(page2)))
            .failing(page2, "HTTP 503");

        let outcome = fetch_window(&source, BASE_URL, &window(), NumberLocale::Macedonian, 10)
            .await
            .unwrap();

        assert!(outcome.is_transport_failure());
        assert!(!outcome.is_complete());
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_next_link_stops_walk() {
        let source = FakeSource::new().page(
            &first_url(),
            results_page(&[("05.01.2023", "1,00")], Some("http://[bad")),
        );

        let outcome = fetch_window(&source, BASE_URL, &window(), NumberLocale::Macedonian, 10)
            .await
            .unwrap();

        assert_eq!(outcome.stop, WalkStop::InvalidNextLink("http://[bad".to_string()));
        assert!(!outcome.is_complete());
        assert_eq!(source.request_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_row_aborts_window() {
        let source = FakeSource::new().page(
            &first_url(),
            results_page(&[("05.01.2023", "1,00"), ("04.01.2023", "n/a")], None),
        );

        let result = fetch_window(&source, BASE_URL, &window(), NumberLocale::Macedonian, 10).await;
        assert!(matches!(result, Err(Error::MalformedRow { .. })));
    }

    #[test]
    fn test_resolve_next() {
        let base = "https://mse.test/mk/stats/symbolhistory/ABC";
        assert_eq!(
            resolve_next(base, "?page=2").unwrap(),
            "https://mse.test/mk/stats/symbolhistory/ABC?page=2"
        );
        assert_eq!(
            resolve_next(base, "https://other.test/x").unwrap(),
            "https://other.test/x"
        );
        assert!(matches!(resolve_next(base, "http://[bad"), Err(Error::Parse(_))));
    }
}

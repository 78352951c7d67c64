//! Canned-page source shared by the walker and coordinator tests

use crate::error::{Error, Result};
use crate::services::mse_client::{PageRequest, PageSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub const BASE_URL: &str = "https://mse.test/mk/stats/symbolhistory";

#[derive(Default)]
pub struct FakeSource {
    /// (url, FromDate) -> body; a `None` FromDate matches any window
    pages: HashMap<(String, Option<String>), std::result::Result<String, String>>,
    pub requests: Mutex<Vec<PageRequest>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: String) -> Self {
        self.pages.insert((url.to_string(), None), Ok(html));
        self
    }

    pub fn page_for(mut self, url: &str, from_date: &str, html: String) -> Self {
        self.pages
            .insert((url.to_string(), Some(from_date.to_string())), Ok(html));
        self
    }

    pub fn failing(mut self, url: &str, reason: &str) -> Self {
        self.pages
            .insert((url.to_string(), None), Err(reason.to_string()));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch(&self, request: &PageRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());

        let from_date = match request {
            PageRequest::History { form, .. } => form
                .iter()
                .find(|(k, _)| k == "FromDate")
                .map(|(_, v)| v.clone()),
            PageRequest::IssuerList { .. } => None,
        };

        let url = request.url().to_string();
        let hit = self
            .pages
            .get(&(url.clone(), from_date))
            .or_else(|| self.pages.get(&(url.clone(), None)));

        match hit {
            Some(Ok(html)) => Ok(html.clone()),
            Some(Err(reason)) => Err(Error::Transport(reason.clone())),
            None => Ok(results_page(&[], None)),
        }
    }
}

/// A results page holding rows of (date, last price) with the remaining
/// cells filled in Macedonian number format
pub fn results_page(rows: &[(&str, &str)], next_href: Option<&str>) -> String {
    let body: String = rows
        .iter()
        .map(|(date, price)| {
            format!(
                "<tr><td>{date}</td><td>{price}</td><td>{price}</td><td>{price}</td>\
                 <td>{price}</td><td>0,00</td><td>10</td><td>1.000,00</td><td>1.000</td></tr>"
            )
        })
        .collect();

    let next = next_href
        .map(|href| format!(r#"<ul><li class="next"><a href="{href}">›</a></li></ul>"#))
        .unwrap_or_default();

    format!(
        r#"<html><body><table id="resultsTable"><tbody>{body}</tbody></table>{next}</body></html>"#
    )
}

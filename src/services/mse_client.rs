//! Remote symbol-history source
//!
//! The exchange serves one HTML page per query: a form POST of
//! `Code`, `FromDate` and `ToDate` (dd.mm.yyyy) to `<base>/<CODE>`. Follow-up
//! pages are fetched by POSTing the same form to the next-page link.
//!
//! Fetching goes through the [`PageSource`] trait so the page walker and the
//! coordinator can run against canned pages in tests.

use crate::constants::USER_AGENT;
use crate::error::{Error, Result};
use crate::models::{Instrument, SyncConfig, SyncWindow};
use crate::services::html::parse_issuer_options;
use crate::utils::format_date;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// The two fetch modes the exchange supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Plain GET of any issuer page, used for its `#Code` option list
    IssuerList { url: String },
    /// Form POST for one date window
    History {
        url: String,
        form: Vec<(String, String)>,
    },
}

impl PageRequest {
    /// First page of a sync window
    pub fn history(base_url: &str, window: &SyncWindow) -> Self {
        PageRequest::History {
            url: history_url(base_url, &window.instrument),
            form: window_form(window),
        }
    }

    /// Same query, posted to a follow-up page URL
    pub fn follow(&self, next_url: String) -> Self {
        match self {
            PageRequest::IssuerList { .. } => PageRequest::IssuerList { url: next_url },
            PageRequest::History { form, .. } => PageRequest::History {
                url: next_url,
                form: form.clone(),
            },
        }
    }

    pub fn url(&self) -> &str {
        match self {
            PageRequest::IssuerList { url } | PageRequest::History { url, .. } => url,
        }
    }
}

pub fn history_url(base_url: &str, instrument: &Instrument) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), instrument.code())
}

fn window_form(window: &SyncWindow) -> Vec<(String, String)> {
    vec![
        ("Code".to_string(), window.instrument.code().to_string()),
        ("FromDate".to_string(), format_date(window.from)),
        ("ToDate".to_string(), format_date(window.to)),
    ]
}

/// Anything that can turn a request into an HTML body
///
/// Implementations must map every non-success or unreachable response to
/// `Error::Transport`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<String>;
}

/// HTTP client for the exchange website
pub struct MseClient {
    client: Client,
}

impl MseClient {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for MseClient {
    async fn fetch(&self, request: &PageRequest) -> Result<String> {
        let builder = match request {
            PageRequest::IssuerList { url } => self.client.get(url),
            PageRequest::History { url, form } => self.client.post(url).form(form),
        };

        debug!(url = request.url(), "Fetching page");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "HTTP {} from {}",
                status,
                request.url()
            )));
        }

        Ok(response.text().await?)
    }
}

/// Fetch the full instrument list from the seed issuer page
pub async fn discover_instruments(
    source: &dyn PageSource,
    config: &SyncConfig,
) -> Result<Vec<Instrument>> {
    let seed = Instrument::parse(&config.seed_code)?;
    let request = PageRequest::IssuerList {
        url: history_url(&config.base_url, &seed),
    };

    let html = source.fetch(&request).await?;
    let instruments = parse_issuer_options(&html)?;

    if instruments.is_empty() {
        return Err(Error::NotFound(format!(
            "no instrument codes on {}",
            request.url()
        )));
    }

    info!(count = instruments.len(), "Discovered instruments");
    Ok(instruments)
}

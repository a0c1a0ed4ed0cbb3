use crate::clock::{AnnouncementClock, ClockError};
use crate::parser::{ParseError, page_text, parse_records};
use crate::query::{QueryError, SearchParams};
use crate::rules::ExtractorConfig;
use crate::types::Record;

use futures::future::try_join_all;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Clock error: {0}")]
    ClockError(#[from] ClockError),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error(transparent)]
    QueryError(#[from] QueryError),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: String,
    clock_url: String,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(40))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: crate::BASE_URL.to_string(),
            clock_url: crate::CLOCK_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_clock_url(mut self, clock_url: &str) -> Self {
        self.clock_url = clock_url.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ScraperError> {
        let text = self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;
        Ok(text)
    }

    pub async fn fetch_search_page(&self, params: &SearchParams) -> Result<String, ScraperError> {
        let url = params.url(&self.base_url)?;
        log::info!("Fetching listing page {}", url);
        self.fetch_text(url.as_str()).await
    }

    /// Fetches `pages` consecutive result pages at once. Each page is parsed on
    /// its own and the results are concatenated in page order.
    pub async fn fetch_records(
        &self,
        params: &SearchParams,
        pages: usize,
        config: &ExtractorConfig,
    ) -> Result<Vec<Record>, ScraperError> {
        let pages = try_join_all((0..pages.max(1)).map(|page| {
            let params = params.page(page);
            async move { self.fetch_search_page(&params).await }
        }))
        .await?;

        let records: Vec<Record> = pages
            .iter()
            .flat_map(|html| parse_records(html, config))
            .collect();

        log::info!("Parsed {} record(s) from {} page(s)", records.len(), pages.len());
        Ok(records)
    }

    /// Reads the publisher's clock page and resolves the announcement day.
    pub async fn fetch_clock(&self) -> Result<AnnouncementClock, ScraperError> {
        log::info!("Fetching clock from {}", self.clock_url);
        let html = self.fetch_text(&self.clock_url).await?;
        let clock = AnnouncementClock::parse(&page_text(&html))?;
        log::debug!(
            "Clock reads {} {}, target {}",
            clock.observed,
            clock.zone,
            clock.target
        );
        Ok(clock)
    }

    pub async fn post_webhook(&self, webhook_url: &str, payload: &Value) -> Result<String, ScraperError> {
        let body = self
            .client
            .post(webhook_url)
            .json(payload)
            .send()
            .await
            .inspect_err(|e| log::error!("Webhook error: {e:?}"))?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

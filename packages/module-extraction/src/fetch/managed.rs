//! Managed scraping service strategy (Firecrawl).
//!
//! Uses the Firecrawl scrape endpoint, which renders JavaScript and handles
//! anti-bot protection on its side. Every call takes a permit from the
//! shared rate limiter first.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::FetchStrategy;
use crate::error::{FetchError, FetchResult};
use crate::rate_limit::SharedRateLimiter;
use crate::security::SecretString;
use crate::types::attempt::{FetchedText, StrategyKind};

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev";

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
    #[serde(rename = "onlyMainContent")]
    only_main_content: bool,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
struct PageMetadata {
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
}

/// Firecrawl-backed strategy. Without an API key every attempt is recorded
/// as "not configured".
pub struct ManagedService {
    client: Client,
    api_key: Option<SecretString>,
    base_url: String,
    limiter: SharedRateLimiter,
}

impl ManagedService {
    pub fn new(api_key: Option<SecretString>, limiter: SharedRateLimiter) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(FetchError::http)?;

        Ok(Self {
            client,
            api_key,
            base_url: FIRECRAWL_API_URL.to_string(),
            limiter,
        })
    }

    /// Point the strategy at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl FetchStrategy for ManagedService {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ManagedService
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedText> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| FetchError::NotConfigured("FIRECRAWL_API_KEY not set".into()))?;

        self.limiter.acquire().await;

        let body = ScrapeRequest {
            url,
            formats: ["markdown"],
            only_main_content: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/scrape", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key.expose()))
            .json(&body)
            .send()
            .await
            .map_err(FetchError::http)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::http(format!("Firecrawl API error: {} - {}", status, text)));
        }

        let scraped: ScrapeResponse = response.json().await.map_err(FetchError::http)?;
        if !scraped.success {
            return Err(FetchError::http(format!(
                "Firecrawl scrape failed: {}",
                scraped.error.unwrap_or_else(|| "unknown error".into())
            )));
        }

        let data = scraped.data.ok_or(FetchError::Empty)?;
        let markdown = data.markdown.unwrap_or_default();
        debug!(url = %url, chars = markdown.len(), "Firecrawl scrape completed");

        let fetched = FetchedText::new(crate::text::normalize_blank_lines(&markdown));
        match data.metadata.and_then(|m| m.source_url) {
            Some(source) if source.trim_end_matches('/') != url.trim_end_matches('/') => {
                Ok(fetched.with_source_url(source))
            }
            _ => Ok(fetched),
        }
    }
}

//! Plain HTTP strategy: one GET with a realistic browser header set.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{html, identity, status_error, FetchStrategy};
use crate::error::{FetchError, FetchResult};
use crate::types::attempt::{FetchedText, StrategyKind};

/// Build the HTTP client shared by the header-based strategies.
pub(crate) fn build_client(cookies: bool) -> FetchResult<Client> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(cookies)
        .build()
        .map_err(FetchError::http)
}

/// GET `url` with `headers` and convert the body to text.
///
/// HTML bodies go through main-content selection; text and markdown bodies
/// are returned as they are. The final address after redirects is recorded
/// when it differs from the requested one.
pub(crate) async fn get_text(client: &Client, url: &str, headers: HeaderMap) -> FetchResult<FetchedText> {
    let target = Url::parse(url).map_err(|_| FetchError::InvalidUrl { url: url.to_string() })?;
    let response = client
        .get(target)
        .headers(headers)
        .send()
        .await
        .map_err(FetchError::http)?;

    if let Some(err) = status_error(response.status()) {
        return Err(err);
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let body = response.text().await.map_err(FetchError::http)?;
    let is_html = html::is_html_body(content_type.as_deref(), &body);
    debug!(url = %url, bytes = body.len(), is_html, "Response body received");

    let text = if is_html {
        html::page_text(&body)
    } else {
        crate::text::normalize_blank_lines(&body)
    };

    let fetched = FetchedText::new(text);
    if final_url.trim_end_matches('/') != url.trim_end_matches('/') {
        Ok(fetched.with_source_url(final_url))
    } else {
        Ok(fetched)
    }
}

/// Cheapest strategy: a single request with a rotated browser user agent.
pub struct PlainRequest {
    client: Client,
}

impl PlainRequest {
    pub fn new() -> FetchResult<Self> {
        Ok(Self {
            client: build_client(false)?,
        })
    }
}

#[async_trait]
impl FetchStrategy for PlainRequest {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Plain
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedText> {
        let headers = identity::browser_headers(identity::random_user_agent());
        get_text(&self.client, url, headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::attempt::FetchOutcome;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_plain_converts_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        "<html><body><h1>Guide</h1><ul><li>Install</li></ul></body></html>",
                        "text/html; charset=utf-8",
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;

        let strategy = PlainRequest::new().unwrap();
        let fetched = strategy.fetch(&format!("{}/guide", server.uri())).await.unwrap();

        assert!(fetched.text.contains("# Guide"));
        assert!(fetched.text.contains("- Install"));
        assert!(fetched.source_url.is_none());
    }

    #[tokio::test]
    async fn test_mislabelled_html_still_converted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<!DOCTYPE html><html><body><h2>Billing</h2><p>Invoices and refunds.</p></body></html>"),
            )
            .mount(&server)
            .await;

        let strategy = PlainRequest::new().unwrap();
        let fetched = strategy.fetch(&format!("{}/hc", server.uri())).await.unwrap();

        assert!(fetched.text.contains("## Billing"));
        assert!(!fetched.text.contains("<p>"));
    }

    #[tokio::test]
    async fn test_unparsable_url_is_invalid() {
        let strategy = PlainRequest::new().unwrap();
        let err = strategy.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { ref url } if url == "not a url"));
    }

    #[tokio::test]
    async fn test_plain_forbidden_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let strategy = PlainRequest::new().unwrap();
        let attempt = strategy
            .attempt(&format!("{}/docs", server.uri()), Duration::from_secs(5))
            .await;

        assert_eq!(attempt.outcome, FetchOutcome::Blocked);
        assert_eq!(attempt.strategy, StrategyKind::Plain);
    }

    #[tokio::test]
    async fn test_plain_text_body_passthrough() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("Line one\n\n\n\nLine two"),
            )
            .mount(&server)
            .await;

        let strategy = PlainRequest::new().unwrap();
        let fetched = strategy.fetch(&server.uri()).await.unwrap();

        assert_eq!(fetched.text, "Line one\n\nLine two");
    }
}

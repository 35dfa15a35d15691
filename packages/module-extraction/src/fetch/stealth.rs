//! Header-spoofing strategies.
//!
//! [`StealthSession`] looks like one polite browser visit. [`AdvancedStealth`]
//! warms a cookie session on the site root first and then retries with a
//! fresh identity each time.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::plain::{build_client, get_text};
use super::{identity, FetchStrategy};
use crate::error::{FetchError, FetchResult};
use crate::security::origin;
use crate::types::attempt::{FetchedText, StrategyKind};
use crate::types::config::DelayRange;

/// Stealth-headers session with a jittered politeness delay.
pub struct StealthSession {
    client: Client,
    delay: DelayRange,
}

impl StealthSession {
    pub fn new(delay: DelayRange) -> FetchResult<Self> {
        Ok(Self {
            client: build_client(true)?,
            delay,
        })
    }
}

#[async_trait]
impl FetchStrategy for StealthSession {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StealthSession
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedText> {
        let wait = self.delay.sample();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        let headers = identity::stealth_headers(url, identity::random_user_agent());
        get_text(&self.client, url, headers).await
    }
}

/// Rotated-identity stealth with session warming and in-strategy retries.
///
/// Every try shares one attempt timeout, applied by the ladder.
pub struct AdvancedStealth {
    delay: DelayRange,
    tries: u32,
}

impl AdvancedStealth {
    pub const DEFAULT_TRIES: u32 = 3;

    pub fn new(delay: DelayRange) -> Self {
        Self {
            delay,
            tries: Self::DEFAULT_TRIES,
        }
    }

    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    /// Visit the site root so the session carries whatever cookies the
    /// site hands out to first-time visitors.
    async fn warm(&self, client: &Client, url: &str) {
        let Ok(parsed) = Url::parse(url) else {
            return;
        };
        let root = format!("{}/", origin(&parsed));
        if root.trim_end_matches('/') == url.trim_end_matches('/') {
            return;
        }
        let headers = identity::rotated_identity_headers(&root);
        match client.get(&root).headers(headers).send().await {
            Ok(response) => debug!(url = %root, status = %response.status(), "Session warmed"),
            Err(e) => debug!(url = %root, error = %e, "Session warm-up failed"),
        }
    }
}

#[async_trait]
impl FetchStrategy for AdvancedStealth {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AdvancedStealth
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedText> {
        let client = build_client(true)?;
        self.warm(&client, url).await;

        let mut last_error = FetchError::Empty;
        for try_number in 1..=self.tries {
            if try_number > 1 {
                let wait = self.delay.sample();
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            }

            let headers = identity::rotated_identity_headers(url);
            match get_text(&client, url, headers).await {
                Ok(fetched) if !fetched.text.trim().is_empty() => return Ok(fetched),
                Ok(_) => last_error = FetchError::Empty,
                Err(e) => {
                    debug!(url = %url, try_number, error = %e, "Advanced stealth try failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

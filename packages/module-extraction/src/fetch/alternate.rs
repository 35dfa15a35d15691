//! Alternative-URL probing for help centers.
//!
//! Help-desk products publish the same articles under a handful of well
//! known paths. When the requested page yields nothing, one of these often
//! does.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::plain::{build_client, get_text};
use super::{identity, FetchStrategy};
use crate::error::{FetchError, FetchResult};
use crate::security::origin;
use crate::types::attempt::{FetchedText, StrategyKind};
use crate::validator::ContentValidator;

/// Paths probed on the same origin, in order.
pub const HELP_CENTER_PATHS: &[&str] = &[
    "/hc/en-us/categories",
    "/help",
    "/docs",
    "/support",
    "/kb",
    "/hc/en-us/sections",
    "/hc/categories",
    "/en-us/support",
];

/// Host fragments that make probing worthwhile.
const HELP_HOST_HINTS: &[&str] = &["help", "support", "docs"];

/// Probes help-center paths on the URL's origin.
pub struct AlternateUrl {
    client: Client,
    validator: ContentValidator,
}

impl AlternateUrl {
    pub fn new(validator: ContentValidator) -> FetchResult<Self> {
        Ok(Self {
            client: build_client(false)?,
            validator,
        })
    }

    /// Candidate addresses for `url`, or nothing when the host has no help
    /// or docs hint.
    pub fn candidates(url: &str) -> Vec<String> {
        let Ok(parsed) = Url::parse(url) else {
            return Vec::new();
        };
        let host = parsed.host_str().unwrap_or_default().to_lowercase();
        if !HELP_HOST_HINTS.iter().any(|hint| host.contains(hint)) {
            return Vec::new();
        }

        let base = origin(&parsed);
        let requested = url.trim_end_matches('/');
        HELP_CENTER_PATHS
            .iter()
            .map(|path| format!("{}{}", base, path))
            .filter(|candidate| candidate != requested)
            .collect()
    }
}

#[async_trait]
impl FetchStrategy for AlternateUrl {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AlternateUrl
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedText> {
        self.probe(url, Self::candidates(url)).await
    }
}

impl AlternateUrl {
    /// Try `candidates` in order and return the first acceptable page.
    async fn probe(&self, url: &str, candidates: Vec<String>) -> FetchResult<FetchedText> {
        let mut last_error = FetchError::Empty;
        for candidate in candidates {
            let headers = identity::stealth_headers(&candidate, identity::random_user_agent());
            match get_text(&self.client, &candidate, headers).await {
                Ok(fetched) if self.validator.check_acceptable(&fetched.text).is_ok() => {
                    debug!(url = %url, alternate = %candidate, "Alternate URL accepted");
                    let source = fetched.source_url.clone().unwrap_or(candidate);
                    return Ok(fetched.with_source_url(source));
                }
                Ok(_) => last_error = FetchError::Empty,
                Err(e) => {
                    debug!(url = %url, alternate = %candidate, error = %e, "Alternate URL failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

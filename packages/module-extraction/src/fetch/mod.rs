//! Fetch strategies: the techniques the ladder escalates through.
//!
//! Each strategy turns one URL into raw text. Strategies never decide
//! whether that text is good enough; the ladder does that with the content
//! validator's minimum-acceptability check.

pub mod alternate;
pub mod html;
pub mod identity;
pub mod managed;
pub mod plain;
pub mod rendered;
pub mod stealth;

pub use alternate::AlternateUrl;
pub use managed::ManagedService;
pub use plain::PlainRequest;
pub use rendered::{find_chromium, locate_chromium, Rendered};
pub use stealth::{AdvancedStealth, StealthSession};

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::types::attempt::{FetchAttempt, FetchedText, StrategyKind};

/// One acquisition technique for turning a URL into raw text.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Which technique this is.
    fn kind(&self) -> StrategyKind;

    /// Fetch the URL. Implementations may take as long as they like; the
    /// caller bounds them with [`FetchStrategy::attempt`].
    async fn fetch(&self, url: &str) -> FetchResult<FetchedText>;

    /// Time budget for one attempt of this strategy.
    fn timeout(&self, default: Duration) -> Duration {
        default
    }

    /// Run [`FetchStrategy::fetch`] under `timeout` and record the result.
    ///
    /// Never fails. Errors and timeouts become a classified [`FetchAttempt`].
    async fn attempt(&self, url: &str, timeout: Duration) -> FetchAttempt {
        let kind = self.kind();
        let budget = self.timeout(timeout);
        let start = Instant::now();

        let result = match tokio::time::timeout(budget, self.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout { elapsed: budget }),
        };
        let elapsed = start.elapsed();

        match result {
            Ok(fetched) => {
                debug!(url = %url, strategy = %kind, chars = fetched.text.len(), "Strategy returned text");
                FetchAttempt::fetched(kind, fetched, elapsed)
            }
            Err(e) => {
                debug!(url = %url, strategy = %kind, error = %e, "Strategy failed");
                FetchAttempt::failed(kind, &e, elapsed)
            }
        }
    }
}

/// Map a response status to a fetch error, or `None` for success.
///
/// Statuses that anti-bot layers use are reported as blocks so the ladder
/// can tell them apart from ordinary failures.
pub(crate) fn status_error(status: reqwest::StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    match status.as_u16() {
        401 | 403 | 429 | 503 => Some(FetchError::Blocked {
            reason: format!("HTTP {}", status),
        }),
        _ => Some(FetchError::http(format!("HTTP {}", status))),
    }
}

//! Strategy ladder: ordered escalation of fetch strategies for one URL.
//!
//! Strategies run one at a time, cheapest first. The first attempt whose
//! text passes the validator's minimum-acceptability check ends the ladder.
//! When nothing passes, the attempt with the most text is selected so
//! downstream stages still get whatever any strategy found.

use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, FetchResult, Result};
use crate::fetch::{
    AdvancedStealth, AlternateUrl, FetchStrategy, ManagedService, PlainRequest, Rendered, StealthSession,
};
use crate::rate_limit::SharedRateLimiter;
use crate::security::SecretString;
use crate::types::attempt::{FetchAttempt, FetchOutcome, StrategyKind};
use crate::types::config::ExtractionConfig;
use crate::validator::{ContentValidator, Rejection};

/// Everything the ladder did for one URL.
#[derive(Debug, Clone)]
pub struct LadderOutcome {
    /// Attempts in ladder order
    pub attempts: Vec<FetchAttempt>,

    /// Index of the attempt whose text moves downstream; `None` means no
    /// strategy produced any text at all
    pub selected: Option<usize>,
}

impl LadderOutcome {
    fn from_attempts(attempts: Vec<FetchAttempt>) -> Self {
        let selected = match attempts.iter().position(|a| a.outcome.is_success()) {
            Some(index) => Some(index),
            None => attempts
                .iter()
                .enumerate()
                .filter(|(_, a)| a.has_text())
                // max_by_key keeps the last maximum; reverse so ties go to the earliest
                .rev()
                .max_by_key(|(_, a)| a.text_len())
                .map(|(index, _)| index),
        };
        Self { attempts, selected }
    }

    pub fn selected_attempt(&self) -> Option<&FetchAttempt> {
        self.selected.and_then(|i| self.attempts.get(i))
    }

    /// Selected text, or empty when there is none.
    pub fn text(&self) -> &str {
        self.selected_attempt().map_or("", |a| a.text.as_str())
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        self.selected_attempt().map(|a| a.strategy)
    }

    /// A strategy passed the acceptability check.
    pub fn is_success(&self) -> bool {
        self.selected_attempt().is_some_and(|a| a.outcome.is_success())
    }

    /// Every attempt came back with no text.
    pub fn is_no_content(&self) -> bool {
        self.selected.is_none()
    }
}

/// Fixed, ordered sequence of fetch strategies.
pub struct StrategyLadder {
    strategies: Vec<Box<dyn FetchStrategy>>,
    validator: ContentValidator,
    attempt_timeout: Duration,
}

impl StrategyLadder {
    /// Ladder over `strategies` in the given order.
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>, validator: ContentValidator) -> Self {
        Self {
            strategies,
            validator,
            attempt_timeout: Duration::from_secs(30),
        }
    }

    /// Set the default per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The full production ladder.
    ///
    /// Rendering is left out when disabled in config; a missing Chromium
    /// binary or Firecrawl key keeps the strategy in place so the attempt
    /// is recorded as not configured.
    pub fn standard(
        config: &ExtractionConfig,
        limiter: SharedRateLimiter,
        firecrawl_key: Option<SecretString>,
        chromium: Option<PathBuf>,
    ) -> FetchResult<Self> {
        let ladder = &config.ladder;
        let validator = ContentValidator::new(config.quality.clone());

        let mut strategies: Vec<Box<dyn FetchStrategy>> = vec![
            Box::new(PlainRequest::new()?),
            Box::new(StealthSession::new(ladder.stealth_delay)?),
            Box::new(AdvancedStealth::new(ladder.retry_delay)),
        ];
        if ladder.enable_rendering {
            strategies.push(Box::new(Rendered::new(chromium, ladder)));
        }
        strategies.push(Box::new(ManagedService::new(firecrawl_key, limiter)?));
        strategies.push(Box::new(AlternateUrl::new(validator.clone())?));

        Ok(Self::new(strategies, validator).with_attempt_timeout(ladder.attempt_timeout))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategy kinds in escalation order.
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    /// Run the ladder for one URL.
    ///
    /// Only cancellation is an error. The token is checked before every
    /// strategy and also interrupts an attempt in flight.
    pub async fn run(&self, url: &str, cancel: &CancellationToken) -> Result<LadderOutcome> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            if cancel.is_cancelled() {
                return Err(ExtractionError::Cancelled);
            }

            let attempt = tokio::select! {
                _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
                attempt = strategy.attempt(url, self.attempt_timeout) => attempt,
            };
            let attempt = self.judge(attempt);

            debug!(
                url = %url,
                strategy = %attempt.strategy,
                outcome = ?attempt.outcome,
                chars = attempt.text_len(),
                elapsed_ms = attempt.elapsed.as_millis() as u64,
                "Fetch attempt finished"
            );

            let accepted = attempt.outcome.is_success();
            attempts.push(attempt);
            if accepted {
                break;
            }
        }

        let outcome = LadderOutcome::from_attempts(attempts);
        match outcome.selected_attempt() {
            Some(a) if a.outcome.is_success() => {
                info!(url = %url, strategy = %a.strategy, chars = a.text_len(), "Content acquired")
            }
            Some(a) => warn!(
                url = %url,
                strategy = %a.strategy,
                chars = a.text_len(),
                "No strategy passed the acceptability check, using best partial text"
            ),
            None => warn!(url = %url, attempts = outcome.attempts.len(), "No content from any strategy"),
        }
        Ok(outcome)
    }

    /// Apply the minimum-acceptability check to a provisional success.
    fn judge(&self, attempt: FetchAttempt) -> FetchAttempt {
        if attempt.outcome != FetchOutcome::Success {
            return attempt;
        }
        match self.validator.check_acceptable(&attempt.text) {
            Ok(()) => attempt,
            Err(Rejection::Challenge) => attempt.with_outcome(
                FetchOutcome::Blocked,
                Some(Rejection::Challenge.as_str().to_string()),
            ),
            Err(rejection) => attempt.with_outcome(FetchOutcome::Empty, Some(rejection.as_str().to_string())),
        }
    }
}

//! Fetch attempt records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::FetchError;

/// Identifier of a fetch technique, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Plain,
    StealthSession,
    AdvancedStealth,
    Rendered,
    ManagedService,
    AlternateUrl,
}

impl StrategyKind {
    /// Stable label used in logs and provenance.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::StealthSession => "stealth_session",
            Self::AdvancedStealth => "advanced_stealth",
            Self::Rendered => "rendered",
            Self::ManagedService => "managed_service",
            Self::AlternateUrl => "alternate_url",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Text passed the minimum-acceptability check
    Success,
    /// Block status or challenge page
    Blocked,
    /// Attempt ran out of time
    Timeout,
    /// No text, or too little to use
    Empty,
    /// Any other failure
    Error,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<&FetchError> for FetchOutcome {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::Blocked { .. } => Self::Blocked,
            FetchError::Timeout { .. } => Self::Timeout,
            FetchError::Empty => Self::Empty,
            _ => Self::Error,
        }
    }
}

/// Text returned by a strategy, before acceptability is judged.
#[derive(Debug, Clone, Default)]
pub struct FetchedText {
    /// Extracted page text (markdown-flavoured)
    pub text: String,

    /// Address the text actually came from, when it differs from the
    /// requested URL
    pub source_url: Option<String>,
}

impl FetchedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

/// Result of one fetch strategy execution.
///
/// Attempts are appended to a URL's sequence in ladder order and never
/// modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAttempt {
    /// Strategy that produced this attempt
    pub strategy: StrategyKind,

    /// Raw text, possibly empty
    pub text: String,

    /// Wall time spent in the attempt
    pub elapsed: Duration,

    /// Outcome classification
    pub outcome: FetchOutcome,

    /// Failure description, if any
    pub error: Option<String>,

    /// Address the text came from when different from the requested URL
    pub source_url: Option<String>,
}

impl FetchAttempt {
    /// Record a strategy that returned text.
    pub fn fetched(strategy: StrategyKind, fetched: FetchedText, elapsed: Duration) -> Self {
        let outcome = if fetched.text.trim().is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Success
        };
        Self {
            strategy,
            text: fetched.text,
            elapsed,
            outcome,
            error: None,
            source_url: fetched.source_url,
        }
    }

    /// Record a strategy that failed.
    pub fn failed(strategy: StrategyKind, error: &FetchError, elapsed: Duration) -> Self {
        Self {
            strategy,
            text: String::new(),
            elapsed,
            outcome: FetchOutcome::from(error),
            error: Some(error.to_string()),
            source_url: None,
        }
    }

    /// Downgrade a provisional success after the acceptability check.
    pub fn with_outcome(mut self, outcome: FetchOutcome, reason: Option<String>) -> Self {
        self.outcome = outcome;
        if reason.is_some() {
            self.error = reason;
        }
        self
    }

    /// Trimmed character count.
    pub fn text_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

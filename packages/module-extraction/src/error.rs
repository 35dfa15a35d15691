//! Typed errors for the module extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Only [`ExtractionError`]
//! ever reaches the caller of the orchestrator; fetch and inference errors
//! are recorded and routed around.

use std::time::Duration;
use thiserror::Error;

/// Errors that abort a run (or a single URL's pipeline) instead of being
/// routed to a fallback.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The run was cancelled by the caller
    #[error("pipeline cancelled")]
    Cancelled,

    /// Configuration is unusable (e.g. zero worker width)
    #[error("config error: {0}")]
    Config(String),
}

/// Errors produced by a single fetch strategy attempt.
///
/// These never abort a URL: the ladder records them on the attempt and
/// escalates to the next strategy.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The site answered with a block status or a challenge page
    #[error("blocked: {reason}")]
    Blocked { reason: String },

    /// The attempt exceeded its time budget
    #[error("timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// The response carried no usable text
    #[error("empty response")]
    Empty,

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Headless browser failed to launch or navigate
    #[error("browser error: {0}")]
    Browser(String),

    /// The strategy is missing a credential or binary it needs
    #[error("strategy not configured: {0}")]
    NotConfigured(String),

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl FetchError {
    /// Wrap any error as an HTTP failure.
    pub fn http(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Http(err.into())
    }
}

/// Errors produced by one structured inference call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    /// Response was not valid JSON for the module schema
    #[error("failed to parse model response: {0}")]
    Parse(String),

    /// Response parsed but violated a schema rule
    #[error("model response failed validation: {0}")]
    Validation(String),

    /// Provider reported a quota or rate limit failure
    #[error("provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other provider failure (network, 5xx, bad request)
    #[error("provider error: {0}")]
    Provider(String),
}

impl InferenceError {
    /// Whether this failure counts against the quota retry budget.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for inference calls.
pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

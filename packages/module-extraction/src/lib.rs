//! Documentation Module Extraction Library
//!
//! Turns a list of documentation URLs into a hierarchy of modules and
//! submodules, one structure per page.
//!
//! # Pipeline
//!
//! For each URL:
//!
//! 1. **Screening** - unparsable, internal and non-document URLs are skipped
//! 2. **Strategy ladder** - plain request, stealth session, advanced stealth,
//!    headless rendering, managed scraping service, alternate help-center
//!    URLs; the first acceptable text wins
//! 3. **Validation** - the text gets a quality tier
//! 4. **Inference** - usable text goes to a model with a strict JSON schema,
//!    with bounded retries
//! 5. **Fallback** - rejected text, failed inference and empty pages get a
//!    deterministic structure instead
//!
//! # Usage
//!
//! ```rust,ignore
//! use module_extraction::{ExtractionConfig, ModelCredentials, NoProgress, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! let credentials = ModelCredentials::new(api_key, endpoint, "gpt-4o");
//! let orchestrator = Orchestrator::standard(ExtractionConfig::default(), Some(credentials), None, None)?;
//!
//! let report = orchestrator.run(&urls, &CancellationToken::new(), &NoProgress).await;
//! println!("{}", report.to_output_json());
//! ```
//!
//! # Modules
//!
//! - [`fetch`] - Fetch strategies and HTML conversion
//! - [`ladder`] - Ordered escalation across strategies
//! - [`validator`] - Quality tiers for fetched text
//! - [`inference`] - Model seam, prompts, parsing and retries
//! - [`fallback`] - Deterministic module synthesis
//! - [`orchestrator`] - Worker pool, cancellation and progress
//! - [`security`] - Credential handling and URL screening
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod fallback;
pub mod fetch;
pub mod inference;
pub mod ladder;
pub mod orchestrator;
pub mod progress;
pub mod rate_limit;
pub mod security;
pub mod testing;
pub mod text;
pub mod types;
pub mod validator;

// Re-export core types at crate root
pub use error::{ExtractionError, FetchError, InferenceError, SecurityError};
pub use fallback::{FallbackSynthesizer, Synthesis};
pub use fetch::FetchStrategy;
pub use inference::{AzureOpenAI, InferenceEngine, StructuredModel};
pub use ladder::{LadderOutcome, StrategyLadder};
pub use orchestrator::Orchestrator;
pub use progress::{NoProgress, Phase, ProgressEvent, ProgressSink};
pub use rate_limit::SharedRateLimiter;
pub use security::{ModelCredentials, SecretString, UrlValidator};
pub use types::{
    attempt::{FetchAttempt, FetchOutcome, StrategyKind},
    config::{
        DelayRange, ExtractionConfig, FallbackConfig, InferenceConfig, LadderConfig, QualityThresholds,
        RateLimitConfig, RetryPolicy,
    },
    module::{Module, ModuleSet, Provenance, QualityTier, StructuringPath},
    report::{ExtractionReport, SkipReason, UrlResult},
};
pub use validator::{ContentValidator, QualityAssessment};

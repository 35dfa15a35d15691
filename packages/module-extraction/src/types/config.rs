//! Run-scoped configuration for the extraction pipeline.
//!
//! Every value here is an opaque input: the library never reads the
//! environment or files to fill it. Defaults follow the settings the
//! pipeline was tuned with.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Number of URLs processed concurrently.
    ///
    /// Each worker runs one URL's pipeline to completion before taking
    /// the next. Default: 4.
    pub workers: usize,

    /// Strategy ladder settings.
    pub ladder: LadderConfig,

    /// Content validator thresholds.
    pub quality: QualityThresholds,

    /// Structured inference settings.
    pub inference: InferenceConfig,

    /// Fallback synthesizer settings.
    pub fallback: FallbackConfig,

    /// Shared limiter for model and managed scraping calls.
    pub rate_limit: RateLimitConfig,

    /// Mark zero-content URLs as skipped when the placeholder carries no
    /// URL-derived hints.
    ///
    /// Default: true.
    pub skip_uninformative: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            ladder: LadderConfig::default(),
            quality: QualityThresholds::default(),
            inference: InferenceConfig::default(),
            fallback: FallbackConfig::default(),
            rate_limit: RateLimitConfig::default(),
            skip_uninformative: true,
        }
    }
}

impl ExtractionConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool width.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the per-attempt timeout for non-rendering strategies.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.ladder.attempt_timeout = timeout;
        self
    }

    /// Set the maximum number of characters sent to the model.
    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.inference.max_content_chars = max;
        self
    }

    /// Set the model temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.inference.temperature = temperature;
        self
    }

    /// Set the maximum output tokens per model call.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.inference.max_output_tokens = max;
        self
    }

    /// Replace the quality thresholds.
    pub fn with_quality(mut self, quality: QualityThresholds) -> Self {
        self.quality = quality;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.inference.retry = retry;
        self
    }

    /// Enable or disable the headless rendering strategy.
    pub fn with_rendering(mut self, enabled: bool) -> Self {
        self.ladder.enable_rendering = enabled;
        self
    }

    /// Set whether uninformative zero-content URLs are skipped.
    pub fn with_skip_uninformative(mut self, skip: bool) -> Self {
        self.skip_uninformative = skip;
        self
    }
}

/// Settings for the fetch strategy ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Time budget for each HTTP-based attempt. Default: 30s.
    pub attempt_timeout: Duration,

    /// Time budget for a headless rendering attempt. Default: 45s.
    pub render_timeout: Duration,

    /// Whether the headless rendering strategy is part of the ladder.
    pub enable_rendering: bool,

    /// Jittered politeness delay before a stealth-session request.
    pub stealth_delay: DelayRange,

    /// Jittered wait between advanced-stealth tries.
    pub retry_delay: DelayRange,

    /// How long a rendered page is left to settle before reading the DOM.
    pub render_settle: Duration,

    /// Settle time used instead for known difficult sites.
    pub render_settle_difficult: Duration,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            render_timeout: Duration::from_secs(45),
            enable_rendering: true,
            stealth_delay: DelayRange::from_millis(2_000, 5_000),
            retry_delay: DelayRange::from_millis(1_000, 3_000),
            render_settle: Duration::from_secs(8),
            render_settle_difficult: Duration::from_secs(15),
        }
    }
}

impl LadderConfig {
    /// A ladder config without waits, for tests and local fixtures.
    pub fn immediate() -> Self {
        Self {
            stealth_delay: DelayRange::none(),
            retry_delay: DelayRange::none(),
            render_settle: Duration::ZERO,
            render_settle_difficult: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Inclusive millisecond range for randomized waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    /// Pick a delay inside the range.
    pub fn sample(&self) -> Duration {
        use rand::Rng;

        if self.max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Thresholds used by the content validator.
///
/// Tier ordering is fixed (reject < low < medium < high); only the
/// boundaries move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum trimmed character count for acceptable text. Default: 50.
    pub min_chars: usize,

    /// Challenge markers only count in texts shorter than this. Default: 3000.
    pub challenge_max_chars: usize,

    /// Minimum share of alphanumeric or whitespace characters. Default: 0.6.
    pub min_alnum_ratio: f32,

    /// Minimum unique/total word ratio once there are more than 10 words.
    /// Default: 0.3.
    pub min_unique_ratio: f32,

    /// Boilerplate token share above which text is rejected. Default: 0.6.
    pub max_boilerplate_ratio: f32,

    /// Characters needed for the medium tier. Default: 500.
    pub medium_chars: usize,

    /// Boilerplate share allowed in the medium tier. Default: 0.35.
    pub medium_max_boilerplate: f32,

    /// Characters needed for the high tier. Default: 2000.
    pub high_chars: usize,

    /// Boilerplate share allowed in the high tier. Default: 0.15.
    pub high_max_boilerplate: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_chars: 50,
            challenge_max_chars: 3_000,
            min_alnum_ratio: 0.6,
            min_unique_ratio: 0.3,
            max_boilerplate_ratio: 0.6,
            medium_chars: 500,
            medium_max_boilerplate: 0.35,
            high_chars: 2_000,
            high_max_boilerplate: 0.15,
        }
    }
}

/// Settings for the structured inference engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Maximum characters of page text sent to the model. Default: 6000.
    pub max_content_chars: usize,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Output token cap per call. Default: 2000.
    pub max_output_tokens: u32,

    /// Retry policy for failed calls.
    pub retry: RetryPolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_content_chars: 6_000,
            temperature: 0.1,
            max_output_tokens: 2_000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total calls allowed for parse, validation and provider failures.
    /// Default: 3.
    pub max_attempts: u32,

    /// Extra calls allowed after quota failures. Default: 1.
    ///
    /// Always kept below the parse budget, see
    /// [`RetryPolicy::quota_retry_limit`].
    pub max_quota_retries: u32,

    /// First backoff after a parse or provider failure. Default: 500ms.
    pub base_backoff: Duration,

    /// First backoff after a quota failure. Default: 2s.
    pub quota_backoff: Duration,

    /// Upper bound for any single backoff. Default: 30s.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_quota_retries: 1,
            base_backoff: Duration::from_millis(500),
            quota_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Same bounds, no waiting.
    pub fn without_backoff(mut self) -> Self {
        self.base_backoff = Duration::ZERO;
        self.quota_backoff = Duration::ZERO;
        self
    }

    /// Quota retries actually allowed: `max_quota_retries`, capped so a
    /// quota-limited page makes fewer calls than a page whose output fails
    /// to parse.
    pub fn quota_retry_limit(&self) -> u32 {
        self.max_quota_retries.min(self.max_attempts.saturating_sub(2))
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn backoff(&self, base: Duration, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        base.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Settings for the fallback synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Words per topic chunk when the text has no structure. Default: 120.
    pub chunk_words: usize,

    /// Maximum modules produced. Default: 8.
    pub max_modules: usize,

    /// Maximum submodules per module. Default: 12.
    pub max_submodules: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            chunk_words: 120,
            max_modules: 8,
            max_submodules: 12,
        }
    }
}

/// Shared rate limit for provider-bound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second. Default: 2.
    pub requests_per_second: u32,

    /// Maximum burst. Default: 2.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            burst: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let base = Duration::from_millis(500);

        assert_eq!(policy.backoff(base, 1), Duration::from_millis(500));
        assert_eq!(policy.backoff(base, 2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(base, 3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(base, 20), Duration::from_secs(30));
    }

    #[test]
    fn test_delay_range_none_is_zero() {
        assert_eq!(DelayRange::none().sample(), Duration::ZERO);
    }

    #[test]
    fn test_delay_range_orders_bounds() {
        let range = DelayRange::from_millis(50, 10);
        assert_eq!(range.min_ms, 10);
        assert_eq!(range.max_ms, 50);

        let sample = range.sample();
        assert!(sample >= Duration::from_millis(10) && sample <= Duration::from_millis(50));
    }

    #[test]
    fn test_builder() {
        let config = ExtractionConfig::new()
            .with_workers(2)
            .with_max_content_chars(1_000)
            .with_rendering(false);

        assert_eq!(config.workers, 2);
        assert_eq!(config.inference.max_content_chars, 1_000);
        assert!(!config.ladder.enable_rendering);
        assert_eq!(config.inference.max_output_tokens, 2_000);
    }
}

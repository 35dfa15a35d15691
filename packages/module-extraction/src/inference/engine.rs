//! Inference engine: truncation, prompting and bounded retries.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::parse::parse_modules;
use super::prompts::{response_schema, user_prompt, SYSTEM_PROMPT};
use super::{ModelRequest, StructuredModel};
use crate::error::InferenceError;
use crate::rate_limit::SharedRateLimiter;
use crate::text::truncate_at_boundary;
use crate::types::config::InferenceConfig;
use crate::types::module::Module;

/// Modules parsed from a successful call.
#[derive(Debug, Clone)]
pub struct InferenceSuccess {
    pub modules: Vec<Module>,
    /// Model calls made, including the successful one
    pub attempts: u32,
}

/// Classified failure after the retry budget ran out.
#[derive(Debug, Clone)]
pub struct InferenceFailure {
    /// Last error seen
    pub error: InferenceError,
    /// Model calls made
    pub attempts: u32,
    /// The run was cancelled while inference was in progress
    pub cancelled: bool,
}

impl InferenceFailure {
    fn cancelled(attempts: u32) -> Self {
        Self {
            error: InferenceError::Provider("cancelled".into()),
            attempts,
            cancelled: true,
        }
    }
}

/// Sends validated text to a [`StructuredModel`] and returns modules or a
/// classified failure. Never panics and never surfaces a provider error to
/// the caller as anything other than [`InferenceFailure`].
pub struct InferenceEngine {
    model: Arc<dyn StructuredModel>,
    config: InferenceConfig,
    limiter: SharedRateLimiter,
    schema: serde_json::Value,
}

impl InferenceEngine {
    pub fn new(model: Arc<dyn StructuredModel>, config: InferenceConfig, limiter: SharedRateLimiter) -> Self {
        Self {
            model,
            config,
            limiter,
            schema: response_schema(),
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Text actually sent to the model for `text`.
    pub fn truncate<'a>(&self, text: &'a str) -> &'a str {
        truncate_at_boundary(text.trim(), self.config.max_content_chars)
    }

    /// Build the request for one page.
    pub fn request_for(&self, url: &str, text: &str) -> ModelRequest {
        ModelRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(url, self.truncate(text)),
            schema: self.schema.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_output_tokens,
        }
    }

    /// Infer modules for one page.
    ///
    /// Parse, validation and provider failures share `max_attempts` calls;
    /// quota failures get [`RetryPolicy::quota_retry_limit`](crate::types::config::RetryPolicy::quota_retry_limit) extra calls
    /// with a longer backoff.
    pub async fn infer(
        &self,
        url: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<InferenceSuccess, InferenceFailure> {
        let policy = &self.config.retry;
        if self.truncate(text).is_empty() {
            return Err(InferenceFailure {
                error: InferenceError::Validation("no content left after truncation".into()),
                attempts: 0,
                cancelled: false,
            });
        }
        let request = self.request_for(url, text);

        let mut attempts = 0u32;
        let mut failures = 0u32;
        let mut quota_retries = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(InferenceFailure::cancelled(attempts));
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(InferenceFailure::cancelled(attempts)),
                _ = self.limiter.acquire() => {}
            }

            attempts += 1;
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(InferenceFailure::cancelled(attempts)),
                response = self.model.generate(&request) => response,
            };

            let error = match response.and_then(|raw| parse_modules(&raw)) {
                Ok(modules) => {
                    info!(url = %url, attempt = attempts, modules = modules.len(), "Inference succeeded");
                    return Ok(InferenceSuccess { modules, attempts });
                }
                Err(error) => error,
            };

            let backoff = if error.is_quota() {
                quota_retries += 1;
                if quota_retries > policy.quota_retry_limit() {
                    return Err(self.give_up(url, error, attempts));
                }
                policy.backoff(policy.quota_backoff, quota_retries)
            } else {
                failures += 1;
                if failures >= policy.max_attempts {
                    return Err(self.give_up(url, error, attempts));
                }
                policy.backoff(policy.base_backoff, failures)
            };

            warn!(
                url = %url,
                attempt = attempts,
                error = %error,
                backoff_ms = backoff.as_millis() as u64,
                "Inference attempt failed, retrying"
            );
            if !self.wait(backoff, cancel).await {
                return Err(InferenceFailure::cancelled(attempts));
            }
        }
    }

    fn give_up(&self, url: &str, error: InferenceError, attempts: u32) -> InferenceFailure {
        warn!(url = %url, attempts, error = %error, model = self.model.name(), "Inference retries exhausted");
        InferenceFailure {
            error,
            attempts,
            cancelled: false,
        }
    }

    /// Sleep for `backoff`; false when cancelled first.
    async fn wait(&self, backoff: Duration, cancel: &CancellationToken) -> bool {
        if backoff.is_zero() {
            return !cancel.is_cancelled();
        }
        debug!(backoff_ms = backoff.as_millis() as u64, "Backing off");
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(backoff) => true,
        }
    }
}

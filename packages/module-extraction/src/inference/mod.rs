//! Structured inference: page text → modules via a language model.
//!
//! The [`StructuredModel`] trait is the provider seam. [`InferenceEngine`]
//! owns truncation, prompting, tolerant parsing, schema validation and the
//! bounded retry loop.

pub mod azure;
pub mod engine;
pub mod parse;
pub mod prompts;

pub use azure::AzureOpenAI;
pub use engine::{InferenceEngine, InferenceFailure, InferenceSuccess};

use async_trait::async_trait;

use crate::error::InferenceResult;

/// One structured-output request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    /// JSON schema the response must follow
    pub schema: serde_json::Value,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A language model that answers with JSON for a given schema.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    /// Issue one request and return the raw response text.
    ///
    /// Quota and rate-limit failures must be reported as
    /// [`crate::error::InferenceError::QuotaExceeded`] so the engine can apply
    /// its separate retry budget.
    async fn generate(&self, request: &ModelRequest) -> InferenceResult<String>;

    /// Provider name for logs.
    fn name(&self) -> &str {
        "model"
    }
}

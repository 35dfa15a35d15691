//! Per-URL extraction request.

use std::sync::Arc;

use crate::types::config::ExtractionConfig;

/// One input URL plus the run's configuration. Immutable once created.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    index: usize,
    url: String,
    config: Arc<ExtractionConfig>,
}

impl ExtractionRequest {
    pub fn new(index: usize, url: impl Into<String>, config: Arc<ExtractionConfig>) -> Self {
        Self {
            index,
            url: url.into(),
            config,
        }
    }

    /// Position of this URL in the input list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }
}

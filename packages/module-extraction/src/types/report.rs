//! Run-level report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::module::{Module, ModuleSet};

/// Why a URL contributed no modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a parsable http(s) URL
    InvalidUrl,
    /// Points at an internal or otherwise blocked host
    BlockedUrl,
    /// Download, media, login or API address
    NonDocumentUrl,
    /// Every strategy came back empty and nothing could be inferred from the URL
    NoContent,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::BlockedUrl => "blocked_url",
            Self::NonDocumentUrl => "non_document_url",
            Self::NoContent => "no_content",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one input URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UrlResult {
    Extracted {
        index: usize,
        url: String,
        modules: ModuleSet,
    },
    Skipped {
        index: usize,
        url: String,
        reason: SkipReason,
    },
}

impl UrlResult {
    pub fn index(&self) -> usize {
        match self {
            Self::Extracted { index, .. } | Self::Skipped { index, .. } => *index,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Extracted { url, .. } | Self::Skipped { url, .. } => url,
        }
    }

    pub fn module_set(&self) -> Option<&ModuleSet> {
        match self {
            Self::Extracted { modules, .. } => Some(modules),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Output of a full run: one result per processed URL, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<UrlResult>,

    /// Set when the run was cancelled; `results` then holds the completed
    /// prefix of the input.
    pub cancelled: bool,
}

impl ExtractionReport {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>, results: Vec<UrlResult>, cancelled: bool) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            results,
            cancelled,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// URLs that produced a module set.
    pub fn extracted(&self) -> usize {
        self.results.iter().filter(|r| !r.is_skipped()).count()
    }

    /// Module sets produced by the model.
    pub fn inferred(&self) -> usize {
        self.module_sets().filter(|m| !m.is_fallback()).count()
    }

    /// Module sets produced by the fallback synthesizer.
    pub fn fallback(&self) -> usize {
        self.module_sets().filter(|m| m.is_fallback()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn module_sets(&self) -> impl Iterator<Item = &ModuleSet> {
        self.results.iter().filter_map(UrlResult::module_set)
    }

    /// All modules in input order, flattened.
    pub fn modules(&self) -> Vec<&Module> {
        self.module_sets().flat_map(|set| set.modules.iter()).collect()
    }

    /// The output array: `[{"module", "Description", "Submodules"}, ...]`.
    pub fn to_output_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.modules()
                .into_iter()
                .filter_map(|m| serde_json::to_value(m).ok())
                .collect(),
        )
    }

    /// Tagged records for skipped URLs, for callers tracking positions.
    pub fn skip_records(&self) -> Vec<serde_json::Value> {
        self.results
            .iter()
            .filter_map(|r| match r {
                UrlResult::Skipped { index, url, reason } => Some(serde_json::json!({
                    "index": index,
                    "url": url,
                    "skipped": reason.as_str(),
                })),
                UrlResult::Extracted { .. } => None,
            })
            .collect()
    }
}

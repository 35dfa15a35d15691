//! Module hierarchy types and their provenance.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::attempt::StrategyKind;

/// Usability classification of fetched text.
///
/// Ordering is fixed: `Reject < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Reject,
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Whether the inference engine may be invoked for this tier.
    pub fn allows_inference(&self) -> bool {
        !matches!(self, Self::Reject)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named topic with a description and named sub-topics.
///
/// Serializes to the output shape
/// `{"module": .., "Description": .., "Submodules": {name: description}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "module")]
    pub name: String,

    #[serde(rename = "Description")]
    pub description: String,

    /// Submodule name → description, in source order. Names are unique.
    #[serde(rename = "Submodules")]
    pub submodules: IndexMap<String, String>,

    /// Placeholder produced without any page content
    #[serde(skip)]
    pub synthetic: bool,
}

impl Module {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            submodules: IndexMap::new(),
            synthetic: false,
        }
    }

    /// Add a submodule. An existing name keeps its first description.
    pub fn with_submodule(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.insert_submodule(name, description);
        self
    }

    /// Insert a submodule, returning false when the name was already taken.
    pub fn insert_submodule(&mut self, name: impl Into<String>, description: impl Into<String>) -> bool {
        let name = name.into();
        if self.submodules.contains_key(&name) {
            return false;
        }
        self.submodules.insert(name, description.into());
        true
    }

    /// Flag this module as a placeholder.
    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// Non-empty name and description, at least one submodule, and every
    /// submodule name and description non-empty.
    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.submodules.is_empty()
            && self
                .submodules
                .iter()
                .all(|(name, desc)| !name.trim().is_empty() && !desc.trim().is_empty())
    }
}

/// Which path produced a module structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuringPath {
    Inference,
    Fallback,
}

/// Where a module set came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Strategy that supplied the source text (`None` = no text at all)
    pub strategy: Option<StrategyKind>,

    /// Inference or fallback
    pub path: StructuringPath,

    /// Quality label of the source text
    pub tier: QualityTier,

    /// Set when the structure is a placeholder with no page content behind it
    pub synthetic: bool,

    /// Model calls made for this URL
    pub inference_attempts: u32,

    /// Trimmed characters of source text
    pub source_chars: usize,
}

impl Provenance {
    pub fn new(strategy: Option<StrategyKind>, path: StructuringPath, tier: QualityTier) -> Self {
        Self {
            strategy,
            path,
            tier,
            synthetic: false,
            inference_attempts: 0,
            source_chars: 0,
        }
    }

    pub fn with_inference_attempts(mut self, attempts: u32) -> Self {
        self.inference_attempts = attempts;
        self
    }

    pub fn with_source_chars(mut self, chars: usize) -> Self {
        self.source_chars = chars;
        self
    }

    pub fn with_synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }
}

/// Ordered modules for one URL plus their provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSet {
    pub modules: Vec<Module>,
    pub provenance: Provenance,
}

impl ModuleSet {
    pub fn new(modules: Vec<Module>, provenance: Provenance) -> Self {
        debug_assert!(!modules.is_empty(), "module sets are never empty");
        Self { modules, provenance }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// True when the set came from the fallback synthesizer.
    pub fn is_fallback(&self) -> bool {
        self.provenance.path == StructuringPath::Fallback
    }

    pub fn is_synthetic(&self) -> bool {
        self.provenance.synthetic
    }

    pub fn is_well_formed(&self) -> bool {
        !self.modules.is_empty() && self.modules.iter().all(Module::is_well_formed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(QualityTier::Reject < QualityTier::Low);
        assert!(QualityTier::Low < QualityTier::Medium);
        assert!(QualityTier::Medium < QualityTier::High);
        assert!(!QualityTier::Reject.allows_inference());
        assert!(QualityTier::Low.allows_inference());
    }

    #[test]
    fn test_module_output_shape() {
        let module = Module::new("Getting Started", "Setup and first steps")
            .with_submodule("Install", "Installing the tool")
            .with_submodule("Usage", "Running it");

        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["module"], "Getting Started");
        assert_eq!(json["Description"], "Setup and first steps");
        assert_eq!(json["Submodules"]["Install"], "Installing the tool");
        assert!(json.get("synthetic").is_none());

        let keys: Vec<_> = json["Submodules"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["Install", "Usage"]);
    }

    #[test]
    fn test_duplicate_submodule_keeps_first() {
        let module = Module::new("A", "B")
            .with_submodule("X", "first")
            .with_submodule("X", "second");
        assert_eq!(module.submodules.len(), 1);
        assert_eq!(module.submodules["X"], "first");
    }

    #[test]
    fn test_well_formed() {
        assert!(!Module::new("A", "B").is_well_formed());
        assert!(!Module::new("A", " ").with_submodule("X", "Y").is_well_formed());
        assert!(!Module::new("A", "B").with_submodule("X", "").is_well_formed());
        assert!(Module::new("A", "B").with_submodule("X", "Y").is_well_formed());
    }
}

//! Tolerant parsing and schema validation of model responses.
//!
//! Models drift from the requested shape in a few predictable ways: code
//! fences around the JSON, a bare array instead of the `modules` envelope,
//! capitalized keys, and submodules as a name → description map instead of
//! a list of pairs. All of these are accepted. Anything missing a required
//! piece is a validation failure.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{InferenceError, InferenceResult};
use crate::types::module::Module;

#[derive(Debug, Deserialize)]
struct RawModule {
    #[serde(alias = "module", alias = "Module", alias = "title")]
    name: Option<String>,

    #[serde(default, alias = "Description", alias = "summary")]
    description: Option<String>,

    #[serde(default, alias = "Submodules", alias = "sub_modules", alias = "children")]
    submodules: Option<RawSubmodules>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSubmodules {
    Map(IndexMap<String, String>),
    List(Vec<RawSubmodule>),
}

#[derive(Debug, Deserialize)]
struct RawSubmodule {
    #[serde(alias = "Name", alias = "submodule", alias = "module", alias = "title")]
    name: Option<String>,

    #[serde(default, alias = "Description")]
    description: Option<String>,
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse and validate a model response into modules.
pub fn parse_modules(response: &str) -> InferenceResult<Vec<Module>> {
    let json = strip_code_blocks(response);
    let value: Value = serde_json::from_str(json).map_err(|e| InferenceError::Parse(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("modules").or_else(|| map.remove("Modules")) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(InferenceError::Parse("`modules` is not an array".into())),
            None if map.contains_key("module") || map.contains_key("name") => vec![Value::Object(map)],
            None => return Err(InferenceError::Parse("missing `modules` array".into())),
        },
        _ => return Err(InferenceError::Parse("response is not a JSON object or array".into())),
    };

    if items.is_empty() {
        return Err(InferenceError::Validation("no modules returned".into()));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let raw: RawModule = serde_json::from_value(item)
                .map_err(|e| InferenceError::Parse(format!("module {}: {}", i, e)))?;
            validate(i, raw)
        })
        .collect()
}

fn validate(index: usize, raw: RawModule) -> InferenceResult<Module> {
    let name = non_empty(raw.name)
        .ok_or_else(|| InferenceError::Validation(format!("module {} is missing a name", index)))?;
    let description = non_empty(raw.description)
        .ok_or_else(|| InferenceError::Validation(format!("module '{}' has an empty description", name)))?;

    let pairs: Vec<(Option<String>, Option<String>)> = match raw.submodules {
        Some(RawSubmodules::Map(map)) => map.into_iter().map(|(k, v)| (Some(k), Some(v))).collect(),
        Some(RawSubmodules::List(list)) => list.into_iter().map(|s| (s.name, s.description)).collect(),
        None => Vec::new(),
    };

    let mut module = Module::new(name, description);
    for (sub_name, sub_description) in pairs {
        let sub_name = non_empty(sub_name).ok_or_else(|| {
            InferenceError::Validation(format!("module '{}' has a submodule without a name", module.name))
        })?;
        let sub_description = non_empty(sub_description).ok_or_else(|| {
            InferenceError::Validation(format!(
                "submodule '{}' of '{}' has an empty description",
                sub_name, module.name
            ))
        })?;
        module.insert_submodule(sub_name, sub_description);
    }

    if module.submodules.is_empty() {
        return Err(InferenceError::Validation(format!(
            "module '{}' has no submodules",
            module.name
        )));
    }
    Ok(module)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

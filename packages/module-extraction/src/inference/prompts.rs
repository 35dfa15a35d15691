//! Prompt text and the response schema sent with every model call.

use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = r#"You extract the module structure of product documentation.

A module is a major topic area of the documentation (for example "Getting Started", "Billing", "API Reference"). Each module has submodules: the concrete sub-topics, features or tasks it covers.

Rules:
- Use only topics that appear in the page text. Do not invent topics.
- Module and submodule names are short title-case labels taken from the page's own headings and terms.
- Every module needs a one or two sentence description of what it covers.
- Every module needs at least one submodule, and every submodule needs a one sentence description.
- Submodule names must be unique within their module.
- Order modules and submodules as they appear on the page.
- If the page covers a single topic, return one module for it."#;

/// Build the user message for one page.
pub fn user_prompt(url: &str, content: &str) -> String {
    format!(
        "Source URL: {url}\n\n\
         Extract the documentation modules from the page content below.\n\n\
         ---\n{content}\n---"
    )
}

/// Wire shape requested from the model.
#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
pub(crate) struct ModuleResponse {
    /// Documentation modules in page order
    modules: Vec<ModuleEntry>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct ModuleEntry {
    /// Short module name
    module: String,
    /// What the module covers
    description: String,
    /// Sub-topics of the module
    submodules: Vec<SubmoduleEntry>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[allow(dead_code)]
struct SubmoduleEntry {
    name: String,
    description: String,
}

/// Strict-mode JSON schema for [`ModuleResponse`].
///
/// Strict structured output needs `additionalProperties: false` and every
/// property listed in `required` on each object, with no `$ref`s.
pub fn response_schema() -> Value {
    let schema = schema_for!(ModuleResponse);
    let mut value = serde_json::to_value(schema).unwrap_or_default();

    inline_refs(&mut value);
    close_objects(&mut value);

    if let Value::Object(map) = &mut value {
        map.remove("definitions");
        map.remove("$schema");
        map.remove("title");
    }
    value
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys = props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }
            for (_, v) in map.iter_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };
    if let Some(defs) = definitions {
        inline_with(value, &defs);
    }
}

fn inline_with(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(def) = target {
                *value = def;
                inline_with(value, definitions);
                return;
            }
            for (_, v) in map.iter_mut() {
                inline_with(v, definitions);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_with(v, definitions)),
        _ => {}
    }
}

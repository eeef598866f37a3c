//! Reading schema documents from disk or stdin.
//!
//! `.yaml` / `.yml` inputs parse as YAML, `.json` as JSON; anything else (including
//! stdin) tries JSON first and falls back to YAML.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde_json::{Map, Number, Value};
use tracing::debug;

/// Input name that selects stdin.
pub const STDIN: &str = "-";

/// Load and parse the document named by `input` (a path or `-`).
pub fn load_document(input: &str) -> Result<Value, String> {
    if input == STDIN {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        return parse_any(&text).map_err(|err| format!("Failed to parse stdin: {err}"));
    }

    let path = Path::new(input);
    let text = fs::read_to_string(path).map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    debug!(path = %path.display(), bytes = text.len(), "Loaded input.");

    let parsed = match extension.as_deref() {
        Some("yaml" | "yml") => parse_yaml(&text),
        Some("json") => parse_json(&text),
        _ => parse_any(&text),
    };
    parsed.map_err(|err| format!("Failed to parse {}: {err}", path.display()))
}

/// Parse a JSON document.
pub fn parse_json(text: &str) -> Result<Value, String> {
    serde_json::from_str(text).map_err(|err| err.to_string())
}

/// Parse YAML into a JSON tree, keeping mapping order. Non-string keys (`200:`) become
/// their string form.
pub fn parse_yaml(text: &str) -> Result<Value, String> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|err| err.to_string())?;
    Ok(yaml_to_json(yaml))
}

fn parse_any(text: &str) -> Result<Value, String> {
    parse_json(text).or_else(|json_err| {
        parse_yaml(text).map_err(|yaml_err| format!("not valid JSON ({json_err}) or YAML ({yaml_err})"))
    })
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64().and_then(Number::from_f64).map_or(Value::Null, Value::Number)
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        other => yaml_to_json(other).to_string(),
    }
}

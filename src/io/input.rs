use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde_json::Value;

use super::DocumentFormat;

/// Parse structured data in any supported format into a `serde_json::Value`.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).with_context(|| "failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).with_context(|| "failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => contents
            .parse::<toml::Value>()
            .with_context(|| "failed to parse TOML document")
            .and_then(|value| {
                serde_json::to_value(value).context("failed to convert TOML to JSON")
            }),
    }
}

/// Turn a snapshot document into the flat field map the builder restores
/// from.
///
/// Keys already in `<prefix>-<index>-<name>` form are kept as they are. A
/// `prefix` key holding an array of objects is expanded card by card, which
/// makes hand-written snapshots easier to read. Booleans become `on` or are
/// dropped, `null` is an empty field, and arrays or objects are stored as
/// their JSON text (the structured hidden slots).
pub fn field_map_from_value(value: &Value, prefix: &str) -> Result<IndexMap<String, String>> {
    let Value::Object(root) = value else {
        bail!("snapshot must be an object of form fields");
    };

    let mut fields = IndexMap::new();
    for (key, value) in root {
        if key == prefix
            && let Value::Array(cards) = value
        {
            for (index, card) in cards.iter().enumerate() {
                let Value::Object(card_fields) = card else {
                    bail!("card {index} under `{prefix}` must be an object");
                };
                for (name, value) in card_fields {
                    if let Some(text) = field_text(value) {
                        fields.insert(format!("{prefix}-{index}-{name}"), text);
                    }
                }
            }
            continue;
        }
        if let Some(text) = field_text(value) {
            fields.insert(key.clone(), text);
        }
    }

    if root.get(prefix).is_some_and(Value::is_array) {
        let total = format!("{prefix}-TOTAL_FORMS");
        if !fields.contains_key(&total) {
            let count = root
                .get(prefix)
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            fields.insert(total, count.to_string());
        }
    }
    Ok(fields)
}

/// Parse a snapshot document straight into a field map.
pub fn load_field_map(
    contents: &str,
    format: DocumentFormat,
    prefix: &str,
) -> Result<IndexMap<String, String>> {
    let value = parse_document_str(contents, format)?;
    field_map_from_value(&value, prefix)
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("on".to_string()),
        Value::Bool(false) => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

//! Decoder for the AutoJs-produced JSON tree (`autojs_ui_tree.json`).
//!
//! The device-side script serializes every field as a string, but older
//! script revisions emitted snake_case keys and raw booleans, so each
//! field accepts both spellings and coerces scalar forms. Flags default
//! to `"false"` when absent.

use serde_json::{Map, Value};

use crate::node::{parse_bounds, TreeParseError, UiNode};

/// Parses an AutoJs JSON document into a node tree.
///
/// # Errors
///
/// - [`TreeParseError::Json`] if the document is not valid JSON
/// - [`TreeParseError::NotAnObject`] if the root is not a JSON object
pub fn parse_document(json: &str) -> Result<UiNode, TreeParseError> {
    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(TreeParseError::NotAnObject)?;
    Ok(decode_object(object))
}

fn decode_object(object: &Map<String, Value>) -> UiNode {
    let bounds = first_string(object, &["bounds", "bounds_str"])
        .unwrap_or_else(|| "[0,0][0,0]".to_string());
    let rect = parse_bounds(&bounds);

    UiNode {
        index: int_field(object, "index"),
        text: string_field(object, &["text"]),
        resource_id: string_field(object, &["resource_id", "resource-id"]),
        class_name: string_field(object, &["class_name", "class"]),
        package: string_field(object, &["package"]),
        content_desc: string_field(object, &["content_desc", "content-desc"]),
        checkable: flag_field(object, &["checkable"]),
        checked: flag_field(object, &["checked"]),
        clickable: flag_field(object, &["clickable"]),
        enabled: flag_field(object, &["enabled"]),
        focusable: flag_field(object, &["focusable"]),
        focused: flag_field(object, &["focused"]),
        scrollable: flag_field(object, &["scrollable"]),
        long_clickable: flag_field(object, &["long_clickable", "long-clickable"]),
        password: flag_field(object, &["password"]),
        selected: flag_field(object, &["selected"]),
        rect,
        bounds,
        children: object
            .get("children")
            .and_then(Value::as_array)
            .map(|children| {
                children
                    .iter()
                    .filter_map(Value::as_object)
                    .map(decode_object)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// First key whose value is a non-empty string.
fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_field(object: &Map<String, Value>, keys: &[&str]) -> String {
    first_string(object, keys).unwrap_or_default()
}

/// Boolean-as-string flag: keeps the string form when present, renders
/// raw booleans/numbers to text, defaults to `"false"`.
fn flag_field(object: &Map<String, Value>, keys: &[&str]) -> String {
    for key in keys {
        match object.get(*key) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Bool(b)) => return b.to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => continue,
        }
    }
    "false".to_string()
}

fn int_field(object: &Map<String, Value>, key: &str) -> i32 {
    match object.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) as i32,
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

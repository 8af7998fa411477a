//! Brace-matching scan for JSON objects embedded in free text
//!
//! Local models frequently emit tool calls as inline JSON instead of using
//! the structured channel. This scanner walks the text, extracts balanced
//! `{...}` spans, and keeps the ones that parse as tool calls.

use crate::tool::entities::RawToolCall;
use serde_json::Value;

/// Extract every balanced, parseable JSON object from the text.
///
/// Braces inside string literals are handled by tracking quote state.
pub fn scan_json_objects(text: &str) -> Vec<Value> {
    let bytes = text.as_bytes();
    let mut objects = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;

        for (offset, &b) in bytes[i..].iter().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            match b {
                b'\\' if in_string => escaped = true,
                b'"' => in_string = !in_string,
                b'{' if !in_string => depth += 1,
                b'}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i + offset + 1);
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                if let Ok(value) = serde_json::from_str::<Value>(&text[i..end]) {
                    objects.push(value);
                }
                i = end;
            }
            None => break, // unbalanced; nothing more to find
        }
    }

    objects
}

/// Extract tool calls embedded in text, restricted to `valid` names.
///
/// Two shapes are accepted:
/// - `{"name": "...", "arguments": {...}}` (also `"parameters"`)
/// - `{"<tool>": {...}}` shorthand
pub fn parse_embedded_tool_calls<S: AsRef<str>>(text: &str, valid: &[S]) -> Vec<RawToolCall> {
    let is_valid = |name: &str| valid.iter().any(|v| v.as_ref() == name);
    let mut calls = Vec::new();

    for object in scan_json_objects(text) {
        let Value::Object(map) = &object else {
            continue;
        };

        if let Some(name) = map.get("name").and_then(|v| v.as_str()) {
            if is_valid(name) {
                let arguments = map
                    .get("arguments")
                    .or_else(|| map.get("parameters"))
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                calls.push(RawToolCall::new(name, arguments));
            }
            continue;
        }

        // {"read": {"path": "..."}} shorthand
        for (key, value) in map {
            if is_valid(key) && value.is_object() {
                calls.push(RawToolCall::new(key.clone(), value.clone()));
            }
        }
    }

    calls
}

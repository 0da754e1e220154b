//! Decoding of model-text envelopes for display.
//!
//! Collaborators reply with `{"<key>": {"output": "<text>"}}`, where the text
//! usually wraps a fenced JSON block. Stored outputs are never rewritten; this
//! only produces a friendlier view of them.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const OUTPUT_FIELD: &str = "output";

fn fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Parses model text as JSON.
///
/// Uses the first ```` ```json ```` block when present, otherwise the whole
/// trimmed text. Returns `None` when neither parses.
#[must_use]
pub fn decode_text(text: &str) -> Option<Value> {
    let fenced = fence()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    serde_json::from_str(fenced.unwrap_or_else(|| text.trim())).ok()
}

/// Returns a copy of `value` with every decodable `output` string replaced
/// by its JSON.
///
/// Strings that do not decode and all non-string values are left as-is.
#[must_use]
pub fn decode_envelope(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let decoded = match inner {
                        Value::String(text) if key == OUTPUT_FIELD => {
                            decode_text(text).unwrap_or_else(|| inner.clone())
                        }
                        _ => decode_envelope(inner),
                    };
                    (key.clone(), decoded)
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(decode_envelope).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decodes_fenced_block() {
        let text = "Here you go:\n```json\n[{\"title\": \"React Tutorial\"}]\n```\nDone.";
        assert_eq!(decode_text(text), Some(json!([{"title": "React Tutorial"}])));
    }

    #[test]
    fn test_decodes_raw_json_text() {
        assert_eq!(decode_text("  {\"a\": 1}\n"), Some(json!({"a": 1})));
        assert_eq!(decode_text("plain prose"), None);
    }

    #[test]
    fn test_first_block_wins() {
        let text = "```json\n1\n```\n```json\n2\n```";
        assert_eq!(decode_text(text), Some(json!(1)));
    }

    #[test]
    fn test_envelope_replaces_nested_output() {
        let raw = json!({
            "activities": {
                "input": ["log"],
                "output": "```json\n{\"count\": 3}\n```"
            }
        });
        assert_eq!(
            decode_envelope(&raw),
            json!({"activities": {"input": ["log"], "output": {"count": 3}}})
        );
    }

    #[test]
    fn test_envelope_keeps_undecodable_and_structured_values() {
        let raw = json!({
            "themes": {"output": "I could not infer themes."},
            "graph": {"output": {"nodes": []}},
            "items": [{"output": "```json\ntrue\n```"}]
        });
        assert_eq!(
            decode_envelope(&raw),
            json!({
                "themes": {"output": "I could not infer themes."},
                "graph": {"output": {"nodes": []}},
                "items": [{"output": true}]
            })
        );
    }
}

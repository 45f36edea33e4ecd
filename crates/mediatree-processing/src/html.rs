//! Small helpers for provider markup.

use serde_json::{Map, Value as JsonValue};

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `key="value"` pairs in the given order, skipping nulls.
pub fn attributes<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a JsonValue)>) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        let value = match value {
            JsonValue::Null => continue,
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push(' ');
        out.push_str(&escape(key));
        out.push_str("=\"");
        out.push_str(&escape(&value));
        out.push('"');
    }
    out
}

/// Attributes from render options, excluding keys the caller already emitted.
pub fn extra_attributes(options: &Map<String, JsonValue>, reserved: &[&str]) -> String {
    attributes(
        options
            .iter()
            .filter(|(k, _)| !reserved.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v)),
    )
}

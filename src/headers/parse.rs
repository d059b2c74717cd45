//! Parsing of composed header text.
//!
//! Accepts either a JSON object (`{"Content-Type": "text/plain"}`) or an HTTP-style
//! block of `Name: value` lines.

use serde_json::Value;

use crate::headers::names;
use crate::headers::set::HeaderSet;

/// Parse composed headers and tag them with the caller's client id.
///
/// When `client_id` is given and the headers do not already carry it under
/// [`names::CLIENT_ID`], it is added under [`names::COMPOSER_CLIENT_ID`] so the
/// local proxy can tell composed traffic from browser traffic.
pub fn parse_headers(raw: Option<&str>, client_id: Option<&str>) -> HeaderSet {
    let mut headers = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => parse_json(text).unwrap_or_else(|| parse_block(text)),
        _ => HeaderSet::new(),
    };

    if let Some(id) = client_id.filter(|id| !id.is_empty()) {
        if headers.get(names::CLIENT_ID) != Some(id) {
            headers.set(names::COMPOSER_CLIENT_ID, id);
        }
    }
    headers
}

/// Split one `Name: value` line. Lines without a colon or with an empty name are
/// rejected.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

fn parse_block(text: &str) -> HeaderSet {
    let mut headers = HeaderSet::new();
    for line in text.lines() {
        if let Some((name, value)) = parse_line(line) {
            headers.append(name, value);
        }
    }
    headers
}

fn parse_json(text: &str) -> Option<HeaderSet> {
    if !text.starts_with('{') {
        return None;
    }
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text) else {
        return None;
    };

    let mut headers = HeaderSet::new();
    for (name, value) in object {
        if name.trim().is_empty() {
            continue;
        }
        match value {
            Value::Array(values) => {
                for item in values {
                    if let Some(item) = json_scalar(item) {
                        headers.append(name.as_str(), item);
                    }
                }
            }
            other => {
                if let Some(item) = json_scalar(other) {
                    headers.append(name.as_str(), item);
                }
            }
        }
    }
    Some(headers)
}

fn json_scalar(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

//! Case-preserving, order-preserving header collection.

use serde_json::{Map, Value};

use crate::headers::names;

/// A single header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Lower-cased name used for lookups.
    pub name: String,
    /// Name exactly as first observed.
    pub raw_name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(raw_name: impl Into<String>, value: impl Into<String>) -> Self {
        let raw_name = raw_name.into();
        Self {
            name: raw_name.to_ascii_lowercase(),
            raw_name,
            value: value.into(),
        }
    }
}

/// Ordered header entries keyed by lower-cased name.
///
/// Several entries may share a lower-cased name (`Set-Cookie` twice, or `X-A` and
/// `x-a`); all of them survive serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<HeaderEntry>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }

    /// First value stored under `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Append an entry as-is, keeping any existing entries with the same name.
    pub fn append(&mut self, raw_name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(HeaderEntry::new(raw_name, value));
    }

    /// Replace the value of `name`.
    ///
    /// The first matching entry keeps its position and raw name, later duplicates
    /// are dropped. A new entry is appended under `name` when none exists.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter().position(|e| e.name.eq_ignore_ascii_case(name)) {
            Some(idx) => {
                self.entries[idx].value = value;
                let mut seen = 0usize;
                self.entries.retain(|e| {
                    if e.name.eq_ignore_ascii_case(name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.entries.push(HeaderEntry::new(name, value)),
        }
    }

    /// Remove every entry named `name`, returning the first removed value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let first = self.get(name).map(str::to_owned);
        self.entries.retain(|e| !e.name.eq_ignore_ascii_case(name));
        first
    }

    /// Header block with the caller's casing, one `Name: value` per line, no
    /// trailing line break.
    pub fn to_raw_block(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.raw_name, e.value))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Raw names in order of first appearance, one per lower-cased name.
    pub fn raw_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&entry.name)) {
                names.push(entry.raw_name.clone());
            }
        }
        names
    }

    /// JSON mapping keyed by lower-cased name.
    ///
    /// `set-cookie` is always a list; other repeated headers are joined with `", "`.
    /// A `trailer` value holding a comma list is split into an ordered list.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for entry in &self.entries {
            let slot = map.get_mut(&entry.name);
            match slot {
                Some(Value::Array(values)) => values.push(Value::String(entry.value.clone())),
                Some(Value::String(existing)) => {
                    existing.push_str(", ");
                    existing.push_str(&entry.value);
                }
                Some(_) => {}
                None => {
                    let value = if entry.name == names::SET_COOKIE {
                        Value::Array(vec![Value::String(entry.value.clone())])
                    } else {
                        Value::String(entry.value.clone())
                    };
                    map.insert(entry.name.clone(), value);
                }
            }
        }

        if let Some(Value::String(trailer)) = map.get(names::TRAILER) {
            if trailer.contains(',') {
                let list = trailer
                    .split(',')
                    .map(|name| Value::String(name.trim().to_string()))
                    .collect();
                map.insert(names::TRAILER.to_string(), Value::Array(list));
            }
        }
        map
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = &'a HeaderEntry;
    type IntoIter = std::slice::Iter<'a, HeaderEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = HeaderSet::new();
        headers.append("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(headers.contains("Content-type"));
    }

    #[test]
    fn set_keeps_position_and_raw_name() {
        let mut headers = HeaderSet::new();
        headers.append("Host", "a.com");
        headers.append("X-Trace", "1");
        headers.set("host", "b.com");
        assert_eq!(headers.to_raw_block(), "Host: b.com\r\nX-Trace: 1");
    }

    #[test]
    fn set_collapses_duplicates() {
        let mut headers = HeaderSet::new();
        headers.append("X-A", "1");
        headers.append("x-a", "2");
        headers.set("x-a", "3");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.to_raw_block(), "X-A: 3");
    }

    #[test]
    fn set_appends_unknown_name() {
        let mut headers = HeaderSet::new();
        headers.set("connection", "close");
        assert_eq!(headers.to_raw_block(), "connection: close");
    }

    #[test]
    fn case_variants_are_not_dropped() {
        let mut headers = HeaderSet::new();
        headers.append("X-Token", "a");
        headers.append("x-token", "b");
        assert_eq!(headers.to_raw_block(), "X-Token: a\r\nx-token: b");
        assert_eq!(headers.raw_names(), vec!["X-Token".to_string()]);
    }

    #[test]
    fn remove_drops_all_variants() {
        let mut headers = HeaderSet::new();
        headers.append("Upgrade", "websocket");
        headers.append("upgrade", "h2c");
        assert_eq!(headers.remove("UPGRADE").as_deref(), Some("websocket"));
        assert!(headers.is_empty());
    }

    #[test]
    fn json_map_joins_and_lists() {
        let mut headers = HeaderSet::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("Set-Cookie", "b=2");
        headers.append("Via", "1.1 a");
        headers.append("via", "1.1 b");
        headers.append("Trailer", "X-A, X-B");

        let map = headers.to_json_map();
        assert_eq!(map["set-cookie"], serde_json::json!(["a=1", "b=2"]));
        assert_eq!(map["via"], serde_json::json!("1.1 a, 1.1 b"));
        assert_eq!(map["trailer"], serde_json::json!(["X-A", "X-B"]));
    }

    #[test]
    fn single_trailer_stays_scalar() {
        let mut headers = HeaderSet::new();
        headers.append("Trailer", "X-Checksum");
        assert_eq!(headers.to_json_map()["trailer"], serde_json::json!("X-Checksum"));
    }
}

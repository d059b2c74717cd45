//! Composed request input and its normalized working form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::headers::HeaderSet;

/// A request authored in the UI, as posted to the compose endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposedRequest {
    /// Target URL. Anything other than a string is treated as absent.
    pub url: Option<Value>,
    /// Raw header block, or a JSON object of headers.
    pub headers: Option<Value>,
    pub method: Option<String>,
    pub body: Option<String>,
    /// Base64 body; wins over `body` when both are set.
    pub base64: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub use_h2: bool,
    #[serde(deserialize_with = "flag")]
    pub is_gzip: bool,
    #[serde(deserialize_with = "flag")]
    pub no_store: bool,
    #[serde(deserialize_with = "flag")]
    pub need_response: bool,
}

impl ComposedRequest {
    pub fn url_str(&self) -> Option<&str> {
        match &self.url {
            Some(Value::String(url)) if !url.is_empty() => Some(url),
            _ => None,
        }
    }

    /// Header text; a JSON object is re-serialized so the parser sees one form.
    pub fn headers_text(&self) -> Option<String> {
        match &self.headers {
            Some(Value::String(text)) => Some(text.clone()),
            Some(object @ Value::Object(_)) => Some(object.to_string()),
            _ => None,
        }
    }
}

/// Loose boolean: accepts JSON booleans, numbers and form strings.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(s)) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Some(_) => true,
    })
}

/// Reasons a URL is rejected before any work is done.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid url: {0}")]
    Parse(#[from] url::ParseError),
    #[error("url has no host")]
    MissingHost,
}

/// Mutable per-request state derived from a [`ComposedRequest`].
#[derive(Debug, Clone)]
pub struct NormalizedOptions {
    /// Lower-cased scheme without the trailing colon (`http`, `wss`, `tunnel`).
    pub protocol: String,
    pub hostname: String,
    pub port: Option<u16>,
    /// `hostname[:port]` as written in the URL.
    pub host: String,
    /// Path plus query, always starting with `/`.
    pub path: String,
    pub method: String,
    pub headers: HeaderSet,
    pub body: Option<Vec<u8>>,
    pub client_id: Option<String>,
}

impl NormalizedOptions {
    /// Parse a composed URL.
    ///
    /// The fragment is dropped and `http://` is assumed when no `scheme://` prefix
    /// is present.
    pub fn from_url(raw: &str) -> Result<Self, UrlError> {
        let without_fragment = raw.split('#').next().unwrap_or_default().trim();
        let full = if has_scheme(without_fragment) {
            without_fragment.to_string()
        } else {
            format!("http://{}", without_fragment)
        };

        let url = Url::parse(&full)?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or(UrlError::MissingHost)?;
        // `Url::port` hides a port equal to the scheme default; keep it when written.
        let port = if has_explicit_port(&full) {
            url.port_or_known_default()
        } else {
            url.port()
        };
        let authority = match port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let hostname = host.trim_start_matches('[').trim_end_matches(']').to_string();

        let mut path = url.path().to_string();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            protocol: url.scheme().to_ascii_lowercase(),
            hostname,
            port,
            host: authority,
            path,
            method: "GET".to_string(),
            headers: HeaderSet::new(),
            body: None,
            client_id: None,
        })
    }

    pub fn set_method(&mut self, method: Option<&str>) {
        self.method = normalize_method(method);
    }
}

/// Trimmed, upper-cased method, `GET` when blank.
pub fn normalize_method(method: Option<&str>) -> String {
    match method.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_ascii_uppercase(),
        _ => "GET".to_string(),
    }
}

/// Whether a method may carry a request body on the HTTP path.
pub fn method_allows_body(method: &str) -> bool {
    !matches!(method, "GET" | "HEAD" | "OPTIONS" | "CONNECT")
}

fn has_scheme(url: &str) -> bool {
    match url.find("://") {
        Some(idx) if idx > 0 => url[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '+'),
        _ => false,
    }
}

/// Whether the authority of `url` spells out a port.
fn has_explicit_port(url: &str) -> bool {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = rest.split(['/', '?', '\\']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map(|(_, hp)| hp).unwrap_or(authority);
    let port = match host_port.strip_prefix('[') {
        Some(bracketed) => bracketed.split_once(']').and_then(|(_, tail)| tail.strip_prefix(':')),
        None => host_port.rsplit_once(':').map(|(_, port)| port),
    };
    port.is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

//! Request body encoding.

use std::borrow::Cow;
use std::io::Write;

use base64::{engine::general_purpose, Engine};
use encoding_rs::{Encoding, UTF_8};
use flate2::{write::GzEncoder, Compression};
use thiserror::Error;

use crate::compose::classify::Route;
use crate::compose::request::method_allows_body;
use crate::headers::{names, HeaderSet};

/// Failures turning a composed body into bytes. Raised before any I/O.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("body contains characters not representable in {charset}")]
    Unmappable { charset: &'static str },
    #[error("gzip compression failed: {0}")]
    Compression(#[source] std::io::Error),
}

/// Charset for a text body: `x-whistle-charset`, else the `content-type` parameter.
///
/// Unknown labels fall back to UTF-8.
pub fn resolve_charset(headers: &HeaderSet) -> &'static Encoding {
    let label = headers
        .get(names::CHARSET)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .or_else(|| headers.get(names::CONTENT_TYPE).and_then(charset_param));

    match label {
        Some(label) => Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
            tracing::debug!(charset = %label, "Unknown charset, using utf-8");
            UTF_8
        }),
        None => UTF_8,
    }
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

fn decode_base64(data: &str) -> Result<Vec<u8>, EncodingError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    match general_purpose::STANDARD.decode(&compact) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Ok(general_purpose::STANDARD_NO_PAD.decode(compact.trim_end_matches('='))?),
    }
}

fn encode_text(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, EncodingError> {
    if encoding == UTF_8 {
        return Ok(text.as_bytes().to_vec());
    }
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(EncodingError::Unmappable { charset: encoding.name() });
    }
    Ok(match bytes {
        Cow::Borrowed(b) => b.to_vec(),
        Cow::Owned(b) => b,
    })
}

pub fn gzip(data: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(EncodingError::Compression)?;
    encoder.finish().map_err(EncodingError::Compression)
}

/// Turn the composed body into the bytes that will be sent and fix up the framing
/// headers for `route`.
///
/// - tunnel and WebSocket bodies never carry `content-length`; `trailer` is only
///   kept for WebSocket
/// - HTTP bodies are only encoded when the method allows one, and are gzipped on
///   request (`content-encoding: gzip`, `content-length` rewritten only if present)
/// - a caller-supplied `content-encoding` is always dropped otherwise
pub fn encode_request_body(
    route: Route,
    method: &str,
    text: Option<&str>,
    base64: Option<&str>,
    gzip_body: bool,
    headers: &mut HeaderSet,
) -> Result<Option<Vec<u8>>, EncodingError> {
    let is_http = matches!(route, Route::Http { .. });
    if route != Route::WebSocket {
        headers.remove(names::TRAILER);
    }

    if is_http && !method_allows_body(method) {
        headers.remove(names::CONTENT_LENGTH);
        headers.remove(names::CONTENT_ENCODING);
        return Ok(None);
    }

    let body = match (base64.filter(|b| !b.is_empty()), text.filter(|t| !t.is_empty())) {
        (Some(data), _) => Some(decode_base64(data)?),
        (None, Some(text)) => Some(encode_text(text, resolve_charset(headers))?),
        (None, None) => None,
    };

    if !is_http {
        headers.remove(names::CONTENT_LENGTH);
        headers.remove(names::CONTENT_ENCODING);
        return Ok(body);
    }

    if gzip_body {
        if let Some(data) = &body {
            let compressed = gzip(data)?;
            if headers.contains(names::CONTENT_LENGTH) {
                headers.set(names::CONTENT_LENGTH, compressed.len().to_string());
            }
            headers.set(names::CONTENT_ENCODING, "gzip");
            return Ok(Some(compressed));
        }
    }

    if headers.contains(names::CONTENT_LENGTH) {
        let len = body.as_ref().map(Vec::len).unwrap_or(0);
        headers.set(names::CONTENT_LENGTH, len.to_string());
    }
    headers.remove(names::CONTENT_ENCODING);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn headers(pairs: &[(&str, &str)]) -> HeaderSet {
        let mut set = HeaderSet::new();
        for (name, value) in pairs {
            set.append(*name, *value);
        }
        set
    }

    #[test]
    fn charset_from_override_then_content_type() {
        let set = headers(&[("Content-Type", "text/plain; charset=\"GBK\"")]);
        assert_eq!(resolve_charset(&set).name(), "GBK");

        let set = headers(&[("Content-Type", "text/plain; charset=gbk"), (names::CHARSET, "big5")]);
        assert_eq!(resolve_charset(&set).name(), "Big5");

        let set = headers(&[("Content-Type", "text/plain; charset=nope")]);
        assert_eq!(resolve_charset(&set), UTF_8);
    }

    #[test]
    fn encodes_text_with_charset() {
        let mut set = headers(&[("Content-Type", "text/plain; charset=gbk")]);
        let body = encode_request_body(Route::Http { h2: false }, "POST", Some("中"), None, false, &mut set)
            .unwrap()
            .unwrap();
        assert_eq!(body, vec![0xD6, 0xD0]);
    }

    #[test]
    fn unmappable_text_is_an_error() {
        let mut set = headers(&[(names::CHARSET, "iso-8859-2")]);
        let err = encode_request_body(Route::Http { h2: false }, "POST", Some("中"), None, false, &mut set)
            .unwrap_err();
        assert!(matches!(err, EncodingError::Unmappable { .. }));
    }

    #[test]
    fn base64_wins_over_text() {
        let mut set = HeaderSet::new();
        let body = encode_request_body(Route::Http { h2: false }, "PUT", Some("ignored"), Some("aGk="), false, &mut set)
            .unwrap();
        assert_eq!(body.as_deref(), Some(&b"hi"[..]));
    }

    #[test]
    fn bad_base64_is_an_error() {
        let mut set = HeaderSet::new();
        let err = encode_request_body(Route::Tunnel, "GET", None, Some("!!!"), false, &mut set).unwrap_err();
        assert!(matches!(err, EncodingError::Base64(_)));
    }

    #[test]
    fn tunnel_never_keeps_content_length() {
        let mut set = headers(&[("Content-Length", "99"), ("Trailer", "X-A"), ("Content-Encoding", "br")]);
        let body = encode_request_body(Route::Tunnel, "CONNECT", Some("raw"), None, true, &mut set).unwrap();
        assert_eq!(body.as_deref(), Some(&b"raw"[..]));
        assert!(set.is_empty());
    }

    #[test]
    fn websocket_keeps_trailer_but_not_length() {
        let mut set = headers(&[("Content-Length", "2"), ("Trailer", "X-A")]);
        encode_request_body(Route::WebSocket, "GET", Some("hi"), None, false, &mut set).unwrap();
        assert!(!set.contains("content-length"));
        assert_eq!(set.get("trailer"), Some("X-A"));
    }

    #[test]
    fn http_get_drops_body_and_length() {
        let mut set = headers(&[("Content-Length", "5")]);
        let body = encode_request_body(Route::Http { h2: false }, "GET", Some("hello"), None, false, &mut set).unwrap();
        assert!(body.is_none());
        assert!(!set.contains("content-length"));
    }

    #[test]
    fn http_rewrites_existing_length() {
        let mut set = headers(&[("Content-Length", "1"), ("Content-Encoding", "gzip")]);
        encode_request_body(Route::Http { h2: false }, "POST", Some("hello"), None, false, &mut set).unwrap();
        assert_eq!(set.get("content-length"), Some("5"));
        assert!(!set.contains("content-encoding"));

        let mut set = headers(&[("Content-Length", "1")]);
        encode_request_body(Route::Http { h2: false }, "POST", None, None, false, &mut set).unwrap();
        assert_eq!(set.get("content-length"), Some("0"));
    }

    #[test]
    fn gzip_sets_encoding_and_length_only_when_present() {
        let mut set = headers(&[("Content-Length", "5")]);
        let body = encode_request_body(Route::Http { h2: false }, "POST", Some("hello"), None, true, &mut set)
            .unwrap()
            .unwrap();
        assert_eq!(set.get("content-encoding"), Some("gzip"));
        assert_eq!(set.get("content-length"), Some(body.len().to_string().as_str()));

        let mut plain = String::new();
        GzDecoder::new(&body[..]).read_to_string(&mut plain).unwrap();
        assert_eq!(plain, "hello");

        let mut set = HeaderSet::new();
        encode_request_body(Route::Http { h2: false }, "POST", Some("hello"), None, true, &mut set).unwrap();
        assert!(!set.contains("content-length"));
        assert_eq!(set.get("content-encoding"), Some("gzip"));
    }
}

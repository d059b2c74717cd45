//! Forwarding strategy selection.
//!
//! # Decision Order
//! 1. Tunnel: `CONNECT` method or a tunnel scheme alias
//! 2. WebSocket: ws scheme, `UPGRADE` method, or `connection: upgrade` + `upgrade: websocket`
//! 3. HTTP: everything else, optionally flagged for HTTP/2 via the ALPN hint header

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::compose::request::NormalizedOptions;
use crate::headers::names;
use crate::headers::HeaderSet;

pub const TUNNEL_SCHEMES: &[&str] = &["connect", "socket", "tunnel", "conn", "tls", "tcp"];
pub const TLS_SCHEMES: &[&str] = &["https", "wss", "tls"];
pub const WEBSOCKET_SCHEMES: &[&str] = &["ws", "wss"];
pub const H2_SCHEMES: &[&str] = &["h2", "http2"];

/// The forwarding path chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tunnel,
    WebSocket,
    Http { h2: bool },
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Tunnel => "tunnel",
            Route::WebSocket => "websocket",
            Route::Http { h2: false } => "http",
            Route::Http { h2: true } => "h2",
        }
    }

    pub fn is_h2(&self) -> bool {
        matches!(self, Route::Http { h2: true })
    }
}

pub fn is_tunnel(options: &NormalizedOptions) -> bool {
    options.method == "CONNECT" || TUNNEL_SCHEMES.contains(&options.protocol.as_str())
}

pub fn is_websocket(options: &NormalizedOptions) -> bool {
    WEBSOCKET_SCHEMES.contains(&options.protocol.as_str())
        || options.method == "UPGRADE"
        || requests_upgrade(&options.headers)
}

fn requests_upgrade(headers: &HeaderSet) -> bool {
    let connection = headers.get(names::CONNECTION).map(str::trim);
    let upgrade = headers.get(names::UPGRADE).map(str::trim);
    matches!(connection, Some(c) if c.eq_ignore_ascii_case("upgrade"))
        && matches!(upgrade, Some(u) if u.eq_ignore_ascii_case("websocket"))
}

/// Pick the route and rewrite headers for it.
///
/// Must run before body encoding: the route decides whether `content-length` and
/// `trailer` mean anything.
pub fn classify(options: &mut NormalizedOptions, use_h2: bool) -> Route {
    let tunnel = is_tunnel(options);
    if !tunnel && is_websocket(options) {
        let key: [u8; 16] = rand::random();
        let headers = &mut options.headers;
        headers.set(names::CONNECTION, "Upgrade");
        headers.set(names::UPGRADE, "websocket");
        headers.set(names::SEC_WEBSOCKET_VERSION, "13");
        headers.set(names::SEC_WEBSOCKET_KEY, STANDARD.encode(key));
        return Route::WebSocket;
    }

    options.headers.set(names::CONNECTION, "close");
    options.headers.remove(names::UPGRADE);
    if tunnel {
        return Route::Tunnel;
    }

    let protocol = options.protocol.as_str();
    let wants_h2 = (use_h2 && (protocol == "http" || protocol == "https")) || H2_SCHEMES.contains(&protocol);
    if wants_h2 {
        options.protocol = if protocol == "http" { "http" } else { "https" }.to_string();
        options.headers.set(names::ALPN_PROTOCOL, "h2");
    }
    Route::Http { h2: wants_h2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(url: &str, method: &str) -> NormalizedOptions {
        let mut options = NormalizedOptions::from_url(url).unwrap();
        options.set_method(Some(method));
        options
    }

    #[test]
    fn connect_method_is_tunnel() {
        let mut opts = options("http://example.com", "CONNECT");
        assert_eq!(classify(&mut opts, false), Route::Tunnel);
        assert_eq!(opts.headers.get("connection"), Some("close"));
    }

    #[test]
    fn tunnel_aliases() {
        for scheme in TUNNEL_SCHEMES {
            let mut opts = options(&format!("{}://example.com:22", scheme), "GET");
            assert_eq!(classify(&mut opts, false), Route::Tunnel, "{}", scheme);
        }
    }

    #[test]
    fn tunnel_wins_over_websocket_headers() {
        let mut opts = options("tcp://example.com:22", "GET");
        opts.headers.append("Connection", "Upgrade");
        opts.headers.append("Upgrade", "websocket");
        assert_eq!(classify(&mut opts, false), Route::Tunnel);
        assert!(!opts.headers.contains("upgrade"));
    }

    #[test]
    fn websocket_by_scheme_sets_handshake_headers() {
        let mut opts = options("wss://example.com/socket", "GET");
        assert_eq!(classify(&mut opts, false), Route::WebSocket);
        assert_eq!(opts.headers.get("upgrade"), Some("websocket"));
        assert_eq!(opts.headers.get("sec-websocket-version"), Some("13"));
        let key = opts.headers.get("sec-websocket-key").unwrap();
        assert_eq!(STANDARD.decode(key).unwrap().len(), 16);
    }

    #[test]
    fn websocket_by_upgrade_method() {
        let mut opts = options("http://example.com/", "upgrade");
        assert_eq!(classify(&mut opts, false), Route::WebSocket);
    }

    #[test]
    fn websocket_by_headers_tolerates_whitespace() {
        let mut opts = options("http://example.com/", "GET");
        opts.headers.append("Connection", " UPGRADE ");
        opts.headers.append("Upgrade", "WebSocket ");
        assert_eq!(classify(&mut opts, false), Route::WebSocket);
        assert_eq!(opts.headers.get("connection"), Some("Upgrade"));
    }

    #[test]
    fn plain_http_strips_upgrade() {
        let mut opts = options("http://example.com/", "POST");
        opts.headers.append("Upgrade", "h2c");
        assert_eq!(classify(&mut opts, false), Route::Http { h2: false });
        assert!(!opts.headers.contains("upgrade"));
        assert!(!opts.headers.contains(names::ALPN_PROTOCOL));
    }

    #[test]
    fn h2_requested_explicitly() {
        let mut opts = options("https://example.com/", "GET");
        assert_eq!(classify(&mut opts, true), Route::Http { h2: true });
        assert_eq!(opts.protocol, "https");
        assert_eq!(opts.headers.get(names::ALPN_PROTOCOL), Some("h2"));
    }

    #[test]
    fn h2_scheme_normalizes_to_https() {
        let mut opts = options("h2://example.com/", "GET");
        assert_eq!(classify(&mut opts, false), Route::Http { h2: true });
        assert_eq!(opts.protocol, "https");
    }

    #[test]
    fn h2_flag_ignored_for_other_schemes() {
        let mut opts = options("ftp://example.com/", "GET");
        assert_eq!(classify(&mut opts, true), Route::Http { h2: false });
    }
}

//! Header names with a fixed contract between the composer and the local proxy.

/// Client identity of the UI session that issued the compose call.
pub const CLIENT_ID: &str = "x-whistle-client-id";

/// Injected when the forwarded request does not already carry the caller's client id.
pub const COMPOSER_CLIENT_ID: &str = "x-whistle-composer-client-id";

/// Marker the web UI adds to its own traffic; never forwarded.
pub const WEBUI: &str = "x-whistle-webui";

/// Tags the request as composer-originated.
pub const REQUEST_FROM: &str = "x-whistle-request-from";
pub const REQUEST_FROM_COMPOSER: &str = "W2COMPOSER";

/// Caller IP, omitted for local addresses.
pub const CLIENT_IP: &str = "x-forwarded-for";
pub const CLIENT_PORT: &str = "x-whistle-client-port";

/// Asks the local proxy to negotiate HTTP/2 upstream.
pub const ALPN_PROTOCOL: &str = "x-whistle-alpn-protocol";

/// Set when the original target scheme was secure.
pub const HTTPS_REQUEST: &str = "x-whistle-https-request";

/// Announces a tunnel request to the local proxy.
pub const POLICY: &str = "x-whistle-policy";
pub const POLICY_TUNNEL: &str = "tunnel";

/// Overrides the charset used to encode a text body.
pub const CHARSET: &str = "x-whistle-charset";

/// Sends the WebSocket body as a binary frame when present.
pub const FRAME_BINARY: &str = "x-whistle-frame-binary";

pub const CONTENT_LENGTH: &str = "content-length";
pub const CONTENT_ENCODING: &str = "content-encoding";
pub const CONTENT_TYPE: &str = "content-type";
pub const TRANSFER_ENCODING: &str = "transfer-encoding";
pub const TRAILER: &str = "trailer";
pub const CONNECTION: &str = "connection";
pub const UPGRADE: &str = "upgrade";
pub const HOST: &str = "host";
pub const SET_COOKIE: &str = "set-cookie";
pub const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";
pub const SEC_WEBSOCKET_VERSION: &str = "sec-websocket-version";

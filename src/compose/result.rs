//! Values returned across the compose boundary.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::headers::HeaderSet;

/// Outcome of one forwarded request, serialized as the `res` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardResult {
    pub status_code: u16,
    pub headers: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailers: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_header_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_trailer_names: Option<Vec<String>>,
    /// Diagnostic text, or the buffered body of a WebSocket handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

impl ForwardResult {
    /// Status and headers of a handshake (tunnel or WebSocket upgrade).
    pub fn handshake(status_code: u16, headers: &HeaderSet) -> Self {
        Self {
            status_code,
            headers: headers.to_json_map(),
            ..Default::default()
        }
    }

    /// Synthetic envelope for a failed request.
    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            body: Some(message.into()),
            ..Default::default()
        }
    }
}

/// JSON envelope written back to the UI: `{ec, em, res}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeResponse {
    pub ec: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub res: Option<ForwardResult>,
}

impl ComposeResponse {
    /// Handled without doing anything (missing or invalid URL).
    pub fn noop() -> Self {
        Self { ec: 0, em: None, res: None }
    }

    pub fn success(res: Option<ForwardResult>) -> Self {
        Self {
            ec: 0,
            em: Some("success".to_string()),
            res,
        }
    }

    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            ec: 0,
            em: None,
            res: Some(ForwardResult::failure(status_code, message)),
        }
    }
}

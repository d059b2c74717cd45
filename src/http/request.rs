//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound call
//! - Decode the compose body (JSON or URL-encoded form)
//! - Extract the caller context (client id, socket address, query flags)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Form bodies are lifted into a JSON object first, so both encodings share
//!   one lenient deserializer

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::compose::request::flag;
use crate::compose::{CallerContext, ComposedRequest};
use crate::headers::names;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID set by the middleware, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeQuery {
    #[serde(deserialize_with = "flag")]
    pub need_response: bool,
}

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
}

/// Decode a compose body according to its `content-type`.
pub fn parse_compose_body(headers: &HeaderMap, body: &[u8]) -> Result<ComposedRequest, BodyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ComposedRequest::default());
    }
    if is_json(headers) {
        return Ok(serde_json::from_slice(body)?);
    }

    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
    let mut object = Map::new();
    for (key, value) in pairs {
        object.insert(key, Value::String(value));
    }
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Caller identity as seen by the composer.
pub fn caller_context(headers: &HeaderMap, addr: SocketAddr, query: &ComposeQuery) -> CallerContext {
    CallerContext {
        client_id: headers
            .get(names::CLIENT_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        client_addr: Some(addr),
        need_response: query.need_response,
    }
}

//! Compose entry point: parse → normalize → classify → forward → envelope.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::body::{encode_request_body, EncodingError};
use crate::compose::classify::classify;
use crate::compose::completion;
use crate::compose::history::HistorySink;
use crate::compose::request::{ComposedRequest, NormalizedOptions};
use crate::compose::result::ComposeResponse;
use crate::config::ComposerConfig;
use crate::forward::{self, ForwardError, LocalProxy};
use crate::headers::{names, parse_headers};
use crate::observability::metrics;

/// Failures reported in the envelope when a result was requested.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Encoding(#[from] EncodingError),
    #[error("{0}")]
    Forward(#[from] ForwardError),
    #[error("forwarder finished without a result")]
    NoResult,
}

impl DispatchError {
    /// Status shown in the synthetic failure result.
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::Forward(e) => e.status_code().unwrap_or(502),
            _ => 502,
        }
    }
}

/// What the inbound layer knows about whoever posted the request.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub client_id: Option<String>,
    pub client_addr: Option<SocketAddr>,
    /// `needResponse` passed outside the body (query string).
    pub need_response: bool,
}

#[derive(Clone)]
pub struct Composer {
    proxy: LocalProxy,
    history: Arc<dyn HistorySink>,
}

impl Composer {
    pub fn new(config: &ComposerConfig, history: Arc<dyn HistorySink>) -> Result<Self, ForwardError> {
        Ok(Self {
            proxy: LocalProxy::from_config(config)?,
            history,
        })
    }

    pub fn proxy(&self) -> &LocalProxy {
        &self.proxy
    }

    pub async fn compose(&self, mut request: ComposedRequest, caller: CallerContext) -> ComposeResponse {
        let start = Instant::now();

        let Some(url) = request.url_str() else {
            return ComposeResponse::noop();
        };
        let mut options = match NormalizedOptions::from_url(url) {
            Ok(options) => options,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Ignoring composed request");
                return ComposeResponse::noop();
            }
        };

        let client_id = caller.client_id.as_deref();
        options.headers = parse_headers(request.headers_text().as_deref(), client_id);
        options.client_id = caller.client_id.clone();
        options.headers.remove(names::WEBUI);
        options.headers.set(names::REQUEST_FROM, names::REQUEST_FROM_COMPOSER);
        options.headers.set(names::HOST, options.host.clone());
        if let Some(addr) = caller.client_addr {
            let ip = addr.ip().to_canonical();
            if !(ip.is_loopback() || ip.is_unspecified()) {
                options.headers.set(names::CLIENT_IP, ip.to_string());
            }
            options.headers.set(names::CLIENT_PORT, addr.port().to_string());
        }
        options.set_method(request.method.as_deref());

        let route = classify(&mut options, request.use_h2);
        request.use_h2 = route.is_h2();
        let need_response = caller.need_response || request.need_response;

        tracing::debug!(
            route = route.as_str(),
            method = %options.method,
            host = %options.host,
            need_response,
            "Composing request"
        );

        let body = encode_request_body(
            route,
            &options.method,
            request.body.as_deref(),
            request.base64.as_deref(),
            request.is_gzip,
            &mut options.headers,
        );
        if !request.no_store {
            self.history.record(request);
        }
        options.body = match body {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(route = route.as_str(), error = %e, "Failed to encode request body");
                metrics::record_compose(route.as_str(), 502, start);
                return if need_response {
                    let e = DispatchError::from(e);
                    ComposeResponse::failure(e.status_code(), e.to_string())
                } else {
                    ComposeResponse::success(None)
                };
            }
        };

        if !need_response {
            let proxy = self.proxy.clone();
            tokio::spawn(async move {
                if let Err(e) = forward::forward(route, options, proxy, None).await {
                    tracing::debug!(route = route.as_str(), error = %e, "Detached forward failed");
                }
            });
            metrics::record_compose(route.as_str(), 200, start);
            return ComposeResponse::success(None);
        }

        let (reply, rx) = completion::channel();
        let proxy = self.proxy.clone();
        let task_reply = reply.clone();
        tokio::spawn(async move {
            if let Err(e) = forward::forward(route, options, proxy, Some(task_reply.clone())).await {
                if !task_reply.complete(Err(e)) {
                    tracing::debug!(route = route.as_str(), "Forward error after result was reported");
                }
            }
        });
        drop(reply);

        let outcome = match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(DispatchError::Forward(e)),
            Err(_) => Err(DispatchError::NoResult),
        };
        match outcome {
            Ok(result) => {
                metrics::record_compose(route.as_str(), result.status_code, start);
                ComposeResponse::success(Some(result))
            }
            Err(e) => {
                let status = e.status_code();
                tracing::warn!(route = route.as_str(), status, error = %e, "Composed request failed");
                metrics::record_compose(route.as_str(), status, start);
                ComposeResponse::failure(status, e.to_string())
            }
        }
    }
}

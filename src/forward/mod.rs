//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! NormalizedOptions + Route
//!     → tunnel.rs     CONNECT via local proxy → (TLS)? → write body → drain
//!     → websocket.rs  GET + Upgrade via local proxy → 101? → one frame → drain
//!     → http.rs       request via local proxy → bounded collect → decompress
//!     → Reply (set-once) carries the ForwardResult back to the dispatcher
//! ```
//!
//! # Design Decisions
//! - Every connection goes to the local intercepting proxy, never upstream directly
//! - No retries: the caller is an interactive UI action
//! - Sockets handed off after reporting are drained, not closed

pub mod http;
pub mod tls;
pub mod tunnel;
pub mod websocket;
pub mod wire;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;

use crate::compose::classify::Route;
use crate::compose::completion::Completion;
use crate::compose::request::NormalizedOptions;
use crate::compose::result::ForwardResult;
use crate::config::ComposerConfig;

/// Transport and protocol failures while talking to the local proxy.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to connect to local proxy {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out connecting to local proxy {0}")]
    ConnectTimeout(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("connection closed before the response was complete")]
    UnexpectedEof,
    #[error("tunnel could not be established, statusCode={0}")]
    TunnelRejected(u16),
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),
}

impl ForwardError {
    /// Status code carried by the error itself, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ForwardError::TunnelRejected(status) => Some(*status),
            _ => None,
        }
    }
}

/// Set-once channel a forwarder reports its outcome on.
pub type Reply = Completion<Result<ForwardResult, ForwardError>>;

/// Address and limits of the local intercepting proxy.
#[derive(Debug, Clone)]
pub struct LocalProxy {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub max_head_size: usize,
    pub max_response_body: usize,
    pub tls: Arc<rustls::ClientConfig>,
}

impl LocalProxy {
    pub fn from_config(config: &ComposerConfig) -> Result<Self, ForwardError> {
        Ok(Self {
            host: config.proxy.host.clone(),
            port: config.proxy.port,
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            max_head_size: config.limits.max_head_size,
            max_response_body: config.limits.max_response_body,
            tls: tls::client_config(config.tls.reject_unauthorized)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub async fn connect(&self) -> Result<TcpStream, ForwardError> {
        let addr = self.addr();
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                Ok(stream)
            }
            Ok(Err(source)) => Err(ForwardError::Connect { addr, source }),
            Err(_) => Err(ForwardError::ConnectTimeout(addr)),
        }
    }
}

/// Run the forwarder for `route`.
///
/// With `reply` set, the forwarder completes it exactly once on success; errors
/// are returned for the caller to report. Without it, results are discarded.
pub async fn forward(
    route: Route,
    options: NormalizedOptions,
    proxy: LocalProxy,
    reply: Option<Reply>,
) -> Result<(), ForwardError> {
    match route {
        Route::Tunnel => tunnel::forward(options, &proxy, reply).await,
        Route::WebSocket => websocket::forward(options, &proxy, reply).await,
        Route::Http { .. } => http::forward(options, &proxy, reply).await,
    }
}

/// Read and discard until the peer closes or errors.
pub async fn drain<S: AsyncRead + Unpin>(mut stream: S) {
    let _ = tokio::io::copy(&mut stream, &mut tokio::io::sink()).await;
}

//! Tunnel forwarding.
//!
//! # States
//! ```text
//! Idle → Connecting → (TLSWrapping)? → Streaming → Detached
//!   └──────────────→ Failed
//! ```
//!
//! The caller only ever sees the CONNECT handshake; application data written or
//! received through the tunnel afterwards is never captured.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_rustls::TlsConnector;

use rustls::pki_types::ServerName;

use crate::compose::classify::TLS_SCHEMES;
use crate::compose::request::NormalizedOptions;
use crate::compose::result::ForwardResult;
use crate::forward::wire::{request_head, WireReader};
use crate::forward::{drain, ForwardError, LocalProxy, Reply};
use crate::headers::names;

const DEFAULT_TUNNEL_PORT: u16 = 443;

pub async fn forward(
    mut options: NormalizedOptions,
    proxy: &LocalProxy,
    reply: Option<Reply>,
) -> Result<(), ForwardError> {
    let port = options.port.unwrap_or(DEFAULT_TUNNEL_PORT);
    let authority = if options.hostname.contains(':') {
        format!("[{}]:{}", options.hostname, port)
    } else {
        format!("{}:{}", options.hostname, port)
    };
    options.headers.set(names::POLICY, names::POLICY_TUNNEL);
    options.headers.set(names::HOST, authority.as_str());

    let mut stream = proxy.connect().await?;
    stream
        .write_all(request_head("CONNECT", &authority, &options.headers).as_bytes())
        .await?;

    let mut reader = WireReader::new(stream, proxy.max_head_size);
    let head = reader.read_head().await?;
    if !(200..300).contains(&head.status) {
        return Err(ForwardError::TunnelRejected(head.status));
    }
    // Anything already buffered belongs to the tunneled stream and is dropped.
    let (stream, _) = reader.into_parts();

    tracing::debug!(target_addr = %authority, status = head.status, "Tunnel established");
    if let Some(reply) = reply {
        reply.complete(Ok(ForwardResult::handshake(head.status, &head.headers)));
    }

    let body = options.body.take();
    if TLS_SCHEMES.contains(&options.protocol.as_str()) {
        let Ok(server_name) = ServerName::try_from(options.hostname.clone()) else {
            tracing::debug!(hostname = %options.hostname, "Invalid TLS server name, draining tunnel");
            drain(stream).await;
            return Ok(());
        };
        match TlsConnector::from(proxy.tls.clone()).connect(server_name, stream).await {
            Ok(tls) => stream_detached(tls, body).await,
            Err(e) => tracing::debug!(error = %e, "TLS handshake through tunnel failed"),
        }
    } else {
        stream_detached(stream, body).await;
    }
    Ok(())
}

/// Write the initial body, release it, then drain until the peer hangs up.
async fn stream_detached<S>(mut stream: S, body: Option<Vec<u8>>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Some(data) = body.filter(|b| !b.is_empty()) {
        let written = stream.write_all(&data).await;
        drop(data);
        if written.is_err() || stream.flush().await.is_err() {
            return;
        }
    }
    drain(stream).await;
}

//! WebSocket forwarding.
//!
//! # States
//! ```text
//! Idle → Connecting → HandshakeSent → AwaitingUpgrade
//!     → Upgraded → FrameSent → Detached
//!     → Rejected → Closed
//! ```
//!
//! Only the handshake is reported. At most one client-masked data frame is sent;
//! the socket then stays open and is drained.

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::compose::request::NormalizedOptions;
use crate::compose::result::ForwardResult;
use crate::forward::wire::{request_head, WireReader};
use crate::forward::{drain, ForwardError, LocalProxy, Reply};
use crate::headers::names;

const SWITCHING_PROTOCOLS: u16 = 101;

pub async fn forward(
    mut options: NormalizedOptions,
    proxy: &LocalProxy,
    reply: Option<Reply>,
) -> Result<(), ForwardError> {
    if options.protocol == "https" || options.protocol == "wss" {
        options.headers.set(names::HTTPS_REQUEST, "1");
    }
    // Any non-empty value selects a binary frame, including "0" and "false".
    let binary = options
        .headers
        .remove(names::FRAME_BINARY)
        .is_some_and(|v| !v.is_empty());
    options.method = "GET".to_string();

    let mut stream = proxy.connect().await?;
    stream
        .write_all(request_head(&options.method, &options.path, &options.headers).as_bytes())
        .await?;

    let body = options.body.take().filter(|b| !b.is_empty());
    if body.is_none() && reply.is_none() {
        // Nobody is waiting and there is nothing to send.
        drain(stream).await;
        return Ok(());
    }
    upgrade_and_send(stream, proxy, body, binary, reply).await
}

async fn upgrade_and_send(
    stream: tokio::net::TcpStream,
    proxy: &LocalProxy,
    body: Option<Vec<u8>>,
    binary: bool,
    reply: Option<Reply>,
) -> Result<(), ForwardError> {
    let mut reader = WireReader::new(stream, proxy.max_head_size);
    let head = reader.read_head().await?;
    let (stream, buffered) = reader.into_parts();

    if head.status != SWITCHING_PROTOCOLS {
        tracing::debug!(status = head.status, "WebSocket upgrade rejected");
        drop(stream);
        if let Some(reply) = reply {
            let mut result = ForwardResult::handshake(head.status, &head.headers);
            result.body = Some(String::from_utf8_lossy(&buffered).into_owned());
            reply.complete(Ok(result));
        }
        return Ok(());
    }

    let mut socket = WebSocketStream::from_partially_read(stream, buffered, Role::Client, None).await;
    if let Some(data) = body {
        // Text frames carry the encoded bytes as-is; a non-UTF-8 charset must survive.
        let opcode = if binary { Data::Binary } else { Data::Text };
        let message = Message::Frame(Frame::message(data, OpCode::Data(opcode), true));
        if let Err(e) = socket.send(message).await {
            tracing::debug!(error = %e, "Failed to send WebSocket frame");
        }
    }

    if let Some(reply) = reply {
        let mut result = ForwardResult::handshake(head.status, &head.headers);
        result.body = Some(String::new());
        reply.complete(Ok(result));
    }

    // Keep the connection open; tungstenite answers pings while we read.
    while let Some(frame) = socket.next().await {
        if frame.is_err() {
            break;
        }
    }
    Ok(())
}

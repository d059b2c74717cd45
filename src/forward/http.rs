//! HTTP(S) forwarding through the local proxy.
//!
//! # Responsibilities
//! - Send the composed request to the local proxy with the original target in `Host`
//! - Flag secure targets with the HTTPS indicator header
//! - Collect the response body up to a fixed cap, then decompress it
//!
//! # Design Decisions
//! - A body over the cap is dropped entirely rather than truncated, so a partial
//!   compressed stream is never decoded or returned
//! - Trailers and raw header names are reported alongside the body

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::body::decompress;
use crate::compose::request::{method_allows_body, NormalizedOptions};
use crate::compose::result::ForwardResult;
use crate::forward::wire::{request_head, ResponseHead, WireReader};
use crate::forward::{drain, ForwardError, LocalProxy, Reply};
use crate::headers::{names, HeaderSet};

/// Accumulates response bytes; forgets everything once `cap` is exceeded.
#[derive(Debug)]
pub struct BodyCollector {
    buf: Option<Vec<u8>>,
    cap: usize,
}

impl BodyCollector {
    pub fn new(cap: usize) -> Self {
        Self {
            buf: Some(Vec::new()),
            cap,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        if let Some(buf) = self.buf.as_mut() {
            buf.extend_from_slice(data);
            if buf.len() > self.cap {
                tracing::debug!(cap = self.cap, "Response body exceeds cap, discarding");
                self.buf = None;
            }
        }
    }

    pub fn discard(&mut self) {
        self.buf = None;
    }

    pub fn is_discarded(&self) -> bool {
        self.buf.is_none()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Empty,
    Length(u64),
    Chunked,
    UntilClose,
}

fn response_framing(method: &str, head: &ResponseHead) -> Result<Framing, ForwardError> {
    if method == "HEAD" || (100..200).contains(&head.status) || head.status == 204 || head.status == 304 {
        return Ok(Framing::Empty);
    }
    let chunked = head
        .headers
        .get(names::TRANSFER_ENCODING)
        .and_then(|te| te.rsplit(',').next())
        .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"));
    if chunked {
        return Ok(Framing::Chunked);
    }
    match head.headers.get(names::CONTENT_LENGTH) {
        Some(len) => len
            .trim()
            .parse::<u64>()
            .map(Framing::Length)
            .map_err(|_| ForwardError::Malformed(format!("invalid content-length {:?}", len))),
        None => Ok(Framing::UntilClose),
    }
}

async fn read_body<S, F>(
    reader: &mut WireReader<S>,
    framing: Framing,
    sink: &mut F,
) -> Result<HeaderSet, ForwardError>
where
    S: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    match framing {
        Framing::Empty => Ok(HeaderSet::new()),
        Framing::Length(len) => reader.read_exact_into(len, sink).await.map(|_| HeaderSet::new()),
        Framing::Chunked => reader.read_chunked_into(sink).await,
        Framing::UntilClose => reader.read_to_end_into(sink).await.map(|_| HeaderSet::new()),
    }
}

/// Frame the outgoing body: chunk-encode it when the caller asked for chunked
/// transfer, otherwise make sure a `content-length` describes it.
fn frame_request_body(method: &str, headers: &mut HeaderSet, body: Option<Vec<u8>>) -> Vec<u8> {
    let body = body.unwrap_or_default();
    let chunked = headers
        .get(names::TRANSFER_ENCODING)
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    if chunked {
        headers.remove(names::CONTENT_LENGTH);
        let mut framed = Vec::with_capacity(body.len() + 16);
        if !body.is_empty() {
            framed.extend_from_slice(format!("{:x}\r\n", body.len()).as_bytes());
            framed.extend_from_slice(&body);
            framed.extend_from_slice(b"\r\n");
        }
        framed.extend_from_slice(b"0\r\n\r\n");
        return framed;
    }

    if !headers.contains(names::CONTENT_LENGTH) && (!body.is_empty() || method_allows_body(method)) {
        headers.set(names::CONTENT_LENGTH, body.len().to_string());
    }
    body
}

pub async fn forward(
    mut options: NormalizedOptions,
    proxy: &LocalProxy,
    reply: Option<Reply>,
) -> Result<(), ForwardError> {
    if options.protocol == "https" {
        options.headers.set(names::HTTPS_REQUEST, "1");
    }
    let payload = frame_request_body(&options.method, &mut options.headers, options.body.take());

    let mut stream = proxy.connect().await?;
    stream
        .write_all(request_head(&options.method, &options.path, &options.headers).as_bytes())
        .await?;
    if !payload.is_empty() {
        stream.write_all(&payload).await?;
    }
    drop(payload);

    let mut reader = WireReader::new(stream, proxy.max_head_size);
    let head = loop {
        let head = reader.read_head().await?;
        // Interim responses (100 Continue, 103 Early Hints) precede the real one.
        if (100..200).contains(&head.status) && head.status != 101 {
            continue;
        }
        break head;
    };

    let Some(reply) = reply else {
        let (stream, _) = reader.into_parts();
        drain(stream).await;
        return Ok(());
    };

    let framing = response_framing(&options.method, &head)?;
    let mut collector = BodyCollector::new(proxy.max_response_body);
    let trailers = read_body(&mut reader, framing, &mut |chunk: &[u8]| {
        if reply.is_abandoned() {
            collector.discard();
        }
        collector.push(chunk);
    })
    .await?;

    let encoding = head.headers.get(names::CONTENT_ENCODING);
    let mut result = ForwardResult {
        status_code: head.status,
        headers: head.headers.to_json_map(),
        trailers: Some(trailers.to_json_map()),
        raw_header_names: Some(head.headers.raw_names()),
        raw_trailer_names: Some(trailers.raw_names()),
        ..Default::default()
    };
    match decompress(encoding, collector.into_bytes()) {
        Ok(body) if !body.is_empty() => result.base64 = Some(STANDARD.encode(body)),
        Ok(_) => {}
        Err(e) => {
            result.body = Some(format!(
                "failed to decode {} response body: {}",
                encoding.unwrap_or("identity"),
                e
            ))
        }
    }

    tracing::debug!(status = head.status, "HTTP response collected");
    reply.complete(Ok(result));
    Ok(())
}

//! HTTP/1.1 message heads on raw sockets.
//!
//! Heads are written from a [`HeaderSet`] so the caller's header casing and order
//! reach the local proxy unchanged; responses are parsed with `httparse` and keep
//! their raw names too.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::forward::ForwardError;
use crate::headers::{parse_line, HeaderSet};

const MAX_HEADERS: usize = 128;
const READ_CHUNK: usize = 16 * 1024;

/// `METHOD target HTTP/1.1` followed by the header block and the blank line.
pub fn request_head(method: &str, target: &str, headers: &HeaderSet) -> String {
    let mut head = format!("{} {} HTTP/1.1\r\n", method, target);
    if !headers.is_empty() {
        head.push_str(&headers.to_raw_block());
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head
}

/// Status line and headers of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: HeaderSet,
}

/// Buffered reader over a socket that understands HTTP/1.1 framing pieces.
pub struct WireReader<S> {
    stream: S,
    buf: Vec<u8>,
    max_head_size: usize,
}

impl<S: AsyncRead + Unpin> WireReader<S> {
    pub fn new(stream: S, max_head_size: usize) -> Self {
        Self {
            stream,
            buf: Vec::new(),
            max_head_size,
        }
    }

    /// Hand back the socket and whatever was read past the last parsed item.
    pub fn into_parts(self) -> (S, Vec<u8>) {
        (self.stream, self.buf)
    }

    async fn fill(&mut self) -> Result<usize, ForwardError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk).await?;
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Read one response head. Bytes after it stay buffered.
    pub async fn read_head(&mut self) -> Result<ResponseHead, ForwardError> {
        loop {
            if !self.buf.is_empty() {
                let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
                let mut response = httparse::Response::new(&mut slots);
                match response.parse(&self.buf) {
                    Ok(httparse::Status::Complete(len)) => {
                        let status = response
                            .code
                            .ok_or_else(|| ForwardError::Malformed("missing status code".into()))?;
                        let reason = response.reason.unwrap_or_default().to_string();
                        let mut headers = HeaderSet::new();
                        for header in response.headers.iter() {
                            headers.append(header.name, String::from_utf8_lossy(header.value).into_owned());
                        }
                        self.buf.drain(..len);
                        return Ok(ResponseHead { status, reason, headers });
                    }
                    Ok(httparse::Status::Partial) => {}
                    Err(e) => return Err(ForwardError::Malformed(e.to_string())),
                }
            }
            if self.buf.len() > self.max_head_size {
                return Err(ForwardError::HeadTooLarge(self.max_head_size));
            }
            if self.fill().await? == 0 {
                return Err(ForwardError::UnexpectedEof);
            }
        }
    }

    /// One CRLF- or LF-terminated line, without the terminator.
    pub async fn read_line(&mut self) -> Result<String, ForwardError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line);
                return Ok(text.trim_end_matches(['\r', '\n']).to_string());
            }
            if self.buf.len() > self.max_head_size {
                return Err(ForwardError::HeadTooLarge(self.max_head_size));
            }
            if self.fill().await? == 0 {
                return Err(ForwardError::UnexpectedEof);
            }
        }
    }

    /// Feed exactly `len` body bytes to `sink`.
    pub async fn read_exact_into<F>(&mut self, mut len: u64, sink: &mut F) -> Result<(), ForwardError>
    where
        F: FnMut(&[u8]),
    {
        while len > 0 {
            if self.buf.is_empty() && self.fill().await? == 0 {
                return Err(ForwardError::UnexpectedEof);
            }
            let take = self.buf.len().min(usize::try_from(len).unwrap_or(usize::MAX));
            sink(&self.buf[..take]);
            self.buf.drain(..take);
            len -= take as u64;
        }
        Ok(())
    }

    /// Feed everything until the peer closes to `sink`.
    pub async fn read_to_end_into<F>(&mut self, sink: &mut F) -> Result<(), ForwardError>
    where
        F: FnMut(&[u8]),
    {
        loop {
            if !self.buf.is_empty() {
                sink(&self.buf);
                self.buf.clear();
            }
            if self.fill().await? == 0 {
                return Ok(());
            }
        }
    }

    /// Decode a chunked body into `sink` and return its trailers.
    pub async fn read_chunked_into<F>(&mut self, sink: &mut F) -> Result<HeaderSet, ForwardError>
    where
        F: FnMut(&[u8]),
    {
        loop {
            let line = self.read_line().await?;
            let size_text = line.split(';').next().unwrap_or_default().trim();
            let size = u64::from_str_radix(size_text, 16)
                .map_err(|_| ForwardError::Malformed(format!("invalid chunk size {:?}", size_text)))?;
            if size == 0 {
                break;
            }
            self.read_exact_into(size, sink).await?;
            self.read_line().await?;
        }

        let mut trailers = HeaderSet::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                return Ok(trailers);
            }
            if let Some((name, value)) = parse_line(&line) {
                trailers.append(name, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn reader_over(bytes: &'static [u8]) -> WireReader<tokio::io::DuplexStream> {
        let (mut tx, rx) = tokio::io::duplex(64);
        tokio::spawn(async move {
            // Small pieces exercise partial parses.
            for piece in bytes.chunks(7) {
                tx.write_all(piece).await.unwrap();
            }
        });
        WireReader::new(rx, 8 * 1024)
    }

    #[test]
    fn request_head_preserves_casing() {
        let mut headers = HeaderSet::new();
        headers.append("Host", "example.com");
        headers.append("X-CamelCase", "1");
        assert_eq!(
            request_head("GET", "/a?b", &headers),
            "GET /a?b HTTP/1.1\r\nHost: example.com\r\nX-CamelCase: 1\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn reads_head_and_keeps_leftover() {
        let mut reader = reader_over(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nX-Mixed: A\r\n\r\n\x81\x02hi").await;
        let head = reader.read_head().await.unwrap();
        assert_eq!(head.status, 101);
        assert_eq!(head.reason, "Switching Protocols");
        assert_eq!(head.headers.raw_names(), vec!["Upgrade", "X-Mixed"]);

        let mut rest = Vec::new();
        reader.read_to_end_into(&mut |b: &[u8]| rest.extend_from_slice(b)).await.unwrap();
        assert_eq!(rest, b"\x81\x02hi");
    }

    #[tokio::test]
    async fn eof_before_head() {
        let mut reader = reader_over(b"HTTP/1.1 200 OK\r\n").await;
        assert!(matches!(reader.read_head().await, Err(ForwardError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn garbage_head_is_malformed() {
        let mut reader = reader_over(b"SSH-2.0-OpenSSH\r\n\r\n").await;
        assert!(matches!(reader.read_head().await, Err(ForwardError::Malformed(_))));
    }

    #[tokio::test]
    async fn oversized_head() {
        let (mut tx, rx) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            tx.write_all(b"HTTP/1.1 200 OK\r\n").await.unwrap();
            loop {
                if tx.write_all(b"X-Filler: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n").await.is_err() {
                    break;
                }
            }
        });
        let mut reader = WireReader::new(rx, 1024);
        assert!(matches!(reader.read_head().await, Err(ForwardError::HeadTooLarge(1024))));
    }

    #[tokio::test]
    async fn chunked_body_with_trailers() {
        let mut reader = reader_over(b"5;ext=1\r\nhello\r\n6\r\n world\r\n0\r\nX-Checksum: abc\r\nx-other: 1\r\n\r\n").await;
        let mut body = Vec::new();
        let trailers = reader
            .read_chunked_into(&mut |b: &[u8]| body.extend_from_slice(b))
            .await
            .unwrap();
        assert_eq!(body, b"hello world");
        assert_eq!(trailers.raw_names(), vec!["X-Checksum", "x-other"]);
        assert_eq!(trailers.get("x-checksum"), Some("abc"));
    }

    #[tokio::test]
    async fn bad_chunk_size() {
        let mut reader = reader_over(b"zz\r\n").await;
        let result = reader.read_chunked_into(&mut |_: &[u8]| {}).await;
        assert!(matches!(result, Err(ForwardError::Malformed(_))));
    }

    #[tokio::test]
    async fn exact_length_stops_at_boundary() {
        let mut reader = reader_over(b"abcdefXYZ").await;
        let mut body = Vec::new();
        reader.read_exact_into(6, &mut |b: &[u8]| body.extend_from_slice(b)).await.unwrap();
        assert_eq!(body, b"abcdef");
        let (_, rest) = reader.into_parts();
        assert!(b"XYZ".starts_with(&rest));
    }
}

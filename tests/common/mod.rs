//! Shared utilities for integration testing: a scripted stand-in for the local
//! intercepting proxy.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use request_composer::compose::{ComposedRequest, Composer, MemoryHistory};
use request_composer::config::ComposerConfig;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

/// Start a fake local proxy on an ephemeral port. Every accepted connection is
/// handed to `handler` on its own task.
pub async fn start_fake_proxy<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move { handler(socket).await });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// Read a request head. Returns the head text (without the blank line) and
/// any bytes read past it.
pub async fn read_head(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            return (head, buf[end + 4..].to_vec());
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the request head was complete");
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Read exactly `len` body bytes, starting with what `read_head` over-read.
pub async fn read_body(stream: &mut TcpStream, mut leftover: Vec<u8>, len: usize) -> Vec<u8> {
    while leftover.len() < len {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        leftover.extend_from_slice(&chunk[..n]);
    }
    leftover.truncate(len);
    leftover
}

/// Header value from a captured head, matched case-insensitively.
pub fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

pub fn config_for(proxy: SocketAddr) -> ComposerConfig {
    let mut config = ComposerConfig::default();
    config.proxy.host = proxy.ip().to_string();
    config.proxy.port = proxy.port();
    config
}

pub fn composer_for(proxy: SocketAddr) -> Composer {
    Composer::new(&config_for(proxy), Arc::new(MemoryHistory::new(16))).unwrap()
}

pub fn composed(value: Value) -> ComposedRequest {
    serde_json::from_value(value).unwrap()
}

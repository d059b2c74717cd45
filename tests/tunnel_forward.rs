//! Tunnel path through a fake local proxy.

use request_composer::compose::CallerContext;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

mod common;

#[tokio::test]
async fn established_tunnel_reports_handshake_and_writes_body() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let proxy = common::start_fake_proxy(move |mut socket| {
        let tx = tx.clone();
        async move {
            let (head, leftover) = common::read_head(&mut socket).await;
            socket
                .write_all(b"HTTP/1.1 200 Connection Established\r\nProxy-Agent: fake\r\n\r\n")
                .await
                .unwrap();
            let body = common::read_body(&mut socket, leftover, 4).await;
            tx.send((head, body)).unwrap();
        }
    })
    .await;

    let response = common::composer_for(proxy)
        .compose(
            common::composed(json!({
                "url": "tunnel://example.com:8443",
                "headers": "Content-Length: 4\r\nContent-Encoding: gzip\r\nTrailer: x",
                "body": "ping",
                "isGzip": true,
                "needResponse": true,
            })),
            CallerContext::default(),
        )
        .await;

    let res = response.res.unwrap();
    assert_eq!(res.status_code, 200);
    assert_eq!(res.headers["proxy-agent"], json!("fake"));
    assert!(res.base64.is_none());

    let (head, body) = rx.recv().await.unwrap();
    assert!(head.starts_with("CONNECT example.com:8443 HTTP/1.1\r\n"), "{head}");
    assert_eq!(common::header(&head, "x-whistle-policy"), Some("tunnel"));
    assert_eq!(common::header(&head, "host"), Some("example.com:8443"));
    assert_eq!(common::header(&head, "connection"), Some("close"));
    assert!(common::header(&head, "content-length").is_none());
    assert!(common::header(&head, "content-encoding").is_none());
    assert!(common::header(&head, "trailer").is_none());
    assert_eq!(body, b"ping");
}

#[tokio::test]
async fn connect_method_defaults_to_port_443() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let proxy = common::start_fake_proxy(move |mut socket| {
        let tx = tx.clone();
        async move {
            let (head, _) = common::read_head(&mut socket).await;
            tx.send(head).unwrap();
            socket.write_all(b"HTTP/1.1 200 OK\r\n\r\n").await.unwrap();
        }
    })
    .await;

    let res = common::composer_for(proxy)
        .compose(
            common::composed(json!({"url": "http://example.com", "method": "connect", "needResponse": true})),
            CallerContext::default(),
        )
        .await
        .res
        .unwrap();

    assert_eq!(res.status_code, 200);
    assert!(rx.recv().await.unwrap().starts_with("CONNECT example.com:443 HTTP/1.1"));
}

#[tokio::test]
async fn connect_method_keeps_explicit_default_port() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let proxy = common::start_fake_proxy(move |mut socket| {
        let tx = tx.clone();
        async move {
            let (head, _) = common::read_head(&mut socket).await;
            tx.send(head).unwrap();
            socket.write_all(b"HTTP/1.1 200 OK\r\n\r\n").await.unwrap();
        }
    })
    .await;

    let res = common::composer_for(proxy)
        .compose(
            common::composed(json!({"url": "http://example.com:80", "method": "CONNECT", "needResponse": true})),
            CallerContext::default(),
        )
        .await
        .res
        .unwrap();

    assert_eq!(res.status_code, 200);
    let head = rx.recv().await.unwrap();
    assert!(head.starts_with("CONNECT example.com:80 HTTP/1.1\r\n"), "{head}");
    assert_eq!(common::header(&head, "host"), Some("example.com:80"));
}

#[tokio::test]
async fn rejected_tunnel_surfaces_upstream_status() {
    let proxy = common::start_fake_proxy(|mut socket| async move {
        common::read_head(&mut socket).await;
        socket
            .write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
    })
    .await;

    let response = common::composer_for(proxy)
        .compose(
            common::composed(json!({"url": "tcp://example.com:22", "needResponse": true})),
            CallerContext::default(),
        )
        .await;

    assert!(response.em.is_none());
    let res = response.res.unwrap();
    assert_eq!(res.status_code, 403);
    assert!(res.body.unwrap().contains("statusCode=403"));
}

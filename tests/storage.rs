#![cfg(feature = "storage")]

mod common;

use std::net::SocketAddr;

use common::{fast_config, running, wait_for};
use depvisor::storage::{StorageConfig, storage_manifold};
use depvisor::{Context, Engine, Manifold, ValueWorker, WorkerError, value_manifold};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Sends one request and returns the status code and body.
async fn request(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(body).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn storage_server_runs_as_a_manifold() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(fast_config()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    engine
        .install(
            "storage-config",
            value_manifold(StorageConfig {
                data_path: dir.path().join("store"),
                address: "127.0.0.1".into(),
                port: 0,
            }),
        )
        .await
        .unwrap();
    engine
        .install("storage", storage_manifold("storage-config"))
        .await
        .unwrap();
    engine
        .install(
            "client",
            Manifold::new(move |ctx: Context| {
                let tx = tx.clone();
                async move {
                    let addr: SocketAddr = ctx.get("storage")?;
                    let _ = tx.send(addr);
                    Ok::<_, WorkerError>(ValueWorker::new(()))
                }
            })
            .with_inputs(["storage"]),
        )
        .await
        .unwrap();

    wait_for(&engine, "client running", running("client")).await;
    let addr = rx.recv().await.unwrap();

    assert_eq!(request(addr, "PUT", "/tools/jq", b"binary").await.0, 201);
    assert_eq!(request(addr, "PUT", "/tools/yq", b"other").await.0, 201);
    assert_eq!(
        request(addr, "GET", "/tools/jq", b"").await,
        (200, "binary".to_string())
    );
    assert_eq!(
        request(addr, "GET", "/tools/*", b"").await,
        (200, "tools/jq\ntools/yq".to_string())
    );
    assert!(dir.path().join("store/tools/yq").is_file());

    assert_eq!(request(addr, "DELETE", "/tools/jq", b"").await.0, 200);
    assert_eq!(request(addr, "GET", "/tools/jq", b"").await.0, 404);
    assert_eq!(request(addr, "POST", "/tools/jq", b"").await.0, 405);

    engine.kill();
    engine.wait().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

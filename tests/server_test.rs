use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use svc_discovery::server;
use svc_discovery::services::{DiscoveryRouter, ServiceRegistry};

async fn request(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect to server");
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("Timeout waiting for response")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_serve_round_trip_and_graceful_shutdown() {
    let registry = ServiceRegistry::create(Duration::from_secs(30)).unwrap();
    let router = DiscoveryRouter::new(Arc::new(registry.clone())).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(server::serve(listener, router, async move {
        let _ = stop_rx.await;
    }));

    let body = r#"{"name":"billing","address":"10.0.0.1:8080"}"#;
    let response = request(
        addr,
        &format!(
            "PUT /services HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ),
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");

    let response = request(
        addr,
        "GET /services/billing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#"{"address":"10.0.0.1:8080"}"#), "{response}");

    let response = request(
        addr,
        "PATCH /services/billing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 405"), "{response}");

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(10), server)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();

    registry.shutdown().await;
}

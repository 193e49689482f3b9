//! Integration tests for the HTTP rate client
//!
//! Each test serves one canned response from a local TCP listener.

use std::time::Duration;

use currconv::data::{ExchangeRateClient, FetchError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves one HTTP response and returns the request line it received
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().expect("Listener should have an address");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("Failed to accept");

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.expect("Failed to read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("Failed to write response");
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    });

    (format!("http://{}/v6/latest", addr), handle)
}

fn client(base_url: &str) -> ExchangeRateClient {
    ExchangeRateClient::new(base_url, Duration::from_secs(5)).expect("Client should build")
}

#[tokio::test]
async fn test_fetch_success() {
    let (url, server) = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"result":"success","base_code":"USD","time_last_update_unix":1700000000,"rates":{"USD":1,"EUR":0.9,"RUB":95.0}}"#,
    )
    .await;

    let entry = client(&url).fetch_rates("USD").await.expect("Fetch should succeed");

    assert_eq!(entry.base_code.as_deref(), Some("USD"));
    assert!((entry.rates["EUR"] - 0.9).abs() < 1e-12);
    assert_eq!(server.await.unwrap(), "GET /v6/latest/USD HTTP/1.1");
}

#[tokio::test]
async fn test_fetch_api_error() {
    let (url, _server) = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"result":"error","error-type":"unsupported-code"}"#,
    )
    .await;

    let err = client(&url).fetch_rates("XXX").await.unwrap_err();

    assert!(matches!(err, FetchError::Api(ref reason) if reason == "unsupported-code"));
}

#[tokio::test]
async fn test_fetch_http_status_error() {
    let (url, _server) = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;

    let err = client(&url).fetch_rates("USD").await.unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus(503)));
    assert!(err.is_api_error());
}

#[tokio::test]
async fn test_fetch_non_json_body_is_api_error() {
    let (url, _server) = serve_once("HTTP/1.1 200 OK", "<html>oops</html>").await;

    let err = client(&url).fetch_rates("USD").await.unwrap_err();

    assert!(matches!(err, FetchError::Api(ref reason) if reason.starts_with("malformed payload")));
}

#[tokio::test]
async fn test_fetch_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}/v6/latest", addr))
        .fetch_rates("USD")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)));
    assert!(!err.is_api_error());
}

#![allow(dead_code)]

use color_eyre::eyre::{Result, bail};
use echoprobe::config::{ListenerEndpoint, ServerConfig};
use echoprobe::http::HttpConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Finds a free port by binding and releasing it
pub async fn free_addr() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    Ok(listener.local_addr()?)
}

/// Configuration with one endpoint per address and a short drain
pub fn config_for(addrs: &[SocketAddr]) -> ServerConfig {
    ServerConfig {
        endpoints: addrs
            .iter()
            .map(|addr| ListenerEndpoint::new(addr.to_string()))
            .collect(),
        http: HttpConfig {
            shutdown_timeout: Duration::from_secs(2),
            ..HttpConfig::default()
        },
    }
}

/// Connects, retrying while the listener is still starting
pub async fn connect(addr: SocketAddr) -> Result<TcpStream> {
    for _ in 0..100 {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    bail!("listener at {addr} never came up")
}

/// Sends raw request bytes and reads until the server closes
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Result<String> {
    let mut stream = connect(addr).await?;
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

/// Splits a raw response into status line and body
pub fn split_response(raw: &str) -> (&str, &str) {
    let status = raw.lines().next().unwrap_or_default();
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default();
    (status, body)
}

/// JSON POST with a query parameter, as a typical client sends it
pub async fn post_json(addr: SocketAddr) -> Result<String> {
    let body = r#"{"somejson":"value"}"#;
    let request = format!(
        "POST /?first=value HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    send_raw(addr, request.as_bytes()).await
}

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub use devpipe_test_utils::{init_tracing, wait_until, with_timeout};

/// Minimal HTTP/1.1 GET. Returns the status code and the body.
///
/// The path is sent as-is, so tests can probe paths a client library would
/// normalise away (e.g. `/../x`).
pub async fn http_get(addr: SocketAddr, path: &str) -> std::io::Result<(u16, String)> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let text = String::from_utf8_lossy(&raw).into_owned();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    Ok((status, body))
}

/// An open Server-Sent Events connection.
pub struct SseClient {
    stream: TcpStream,
    buffer: String,
}

impl SseClient {
    pub async fn connect(addr: SocketAddr, path: &str) -> std::io::Result<Self> {
        let mut stream = TcpStream::connect(addr).await?;
        let request = format!(
            "GET {path} HTTP/1.1\r\nHost: {addr}\r\nAccept: text/event-stream\r\n\r\n"
        );
        stream.write_all(request.as_bytes()).await?;
        let mut client = Self {
            stream,
            buffer: String::new(),
        };
        // Wait for the response head so the subscription is live.
        client.read_until("\r\n\r\n", Duration::from_secs(5)).await?;
        Ok(client)
    }

    /// Read until the accumulated stream contains `needle`.
    pub async fn read_until(&mut self, needle: &str, within: Duration) -> std::io::Result<bool> {
        let deadline = tokio::time::Instant::now() + within;
        let mut chunk = [0u8; 1024];
        while !self.buffer.contains(needle) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            match tokio::time::timeout(remaining, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) => return Ok(false),
                Ok(Ok(n)) => self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n])),
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(false),
            }
        }
        Ok(true)
    }

    /// How many reload events have been received so far.
    pub fn reloads_seen(&self) -> usize {
        self.buffer.matches("reload").count()
    }

    /// Wait until at least `count` reload events arrived.
    pub async fn wait_for_reloads(&mut self, count: usize, within: Duration) -> std::io::Result<bool> {
        let deadline = tokio::time::Instant::now() + within;
        while self.reloads_seen() < count {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            let mut chunk = [0u8; 1024];
            match tokio::time::timeout(remaining, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) => return Ok(false),
                Ok(Ok(n)) => self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n])),
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(false),
            }
        }
        Ok(true)
    }

    pub fn head(&self) -> &str {
        &self.buffer
    }
}

//! Live AIS TCP source
//!
//! Newline-delimited JSON over TCP. After connecting, the client sends one
//! subscription line carrying the API key and the bounding boxes to filter
//! on; the server then streams [`FeedMessage`] values one per line.

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

use super::{FeedError, FeedEvent, FeedSource};
use crate::config::defaults::{FEED_CONNECT_TIMEOUT_SECS, FEED_READ_TIMEOUT_SECS};
use crate::types::{BoundingBox, FeedMessage};

/// Subscription request sent as the first line after connecting.
#[derive(Serialize)]
struct SubscribeRequest<'a> {
    api_key: &'a str,
    bounding_boxes: &'a [BoundingBox],
}

/// TCP feed client with per-line read timeout.
///
/// Reconnect policy lives in the ingest loop, not here: a failed read
/// surfaces as an error and the caller decides when to call
/// [`subscribe`](FeedSource::subscribe) again.
pub struct AisTcpSource {
    host: String,
    port: u16,
    api_key: String,
    stream: Option<BufReader<TcpStream>>,
    line_buffer: String,
    read_timeout_secs: u64,
    messages_received: u64,
}

impl AisTcpSource {
    pub fn new(host: &str, port: u16, api_key: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            api_key: api_key.to_string(),
            stream: None,
            line_buffer: String::with_capacity(512),
            read_timeout_secs: FEED_READ_TIMEOUT_SECS,
            messages_received: 0,
        }
    }

    /// Override the per-line read timeout (seconds).
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    async fn disconnect(&mut self) {
        if let Some(ref mut reader) = self.stream {
            let _ = reader.get_mut().shutdown().await;
        }
        self.stream = None;
    }
}

#[async_trait::async_trait]
impl FeedSource for AisTcpSource {
    async fn subscribe(&mut self, boxes: &[BoundingBox]) -> Result<(), FeedError> {
        self.disconnect().await;

        let addr = format!("{}:{}", self.host, self.port);
        info!(address = %addr, boxes = boxes.len(), "connecting to AIS feed");

        let connect_timeout = tokio::time::Duration::from_secs(FEED_CONNECT_TIMEOUT_SECS);
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| FeedError::Timeout)?
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

        // TCP keepalive to detect dead connections
        let sock_ref = socket2::SockRef::from(&stream);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(30))
            .with_interval(std::time::Duration::from_secs(10));
        let _ = sock_ref.set_tcp_keepalive(&keepalive);

        let mut stream = stream;
        let request = SubscribeRequest {
            api_key: &self.api_key,
            bounding_boxes: boxes,
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;

        self.stream = Some(BufReader::new(stream));
        info!("AIS feed subscription established");
        Ok(())
    }

    async fn next_message(&mut self) -> Result<FeedEvent, FeedError> {
        let read_timeout = tokio::time::Duration::from_secs(self.read_timeout_secs);
        loop {
            let reader = self.stream.as_mut().ok_or(FeedError::NotSubscribed)?;
            self.line_buffer.clear();

            let bytes =
                match tokio::time::timeout(read_timeout, reader.read_line(&mut self.line_buffer))
                    .await
                {
                    Ok(Ok(b)) => b,
                    Ok(Err(e)) => return Err(FeedError::ConnectionFailed(e.to_string())),
                    Err(_) => return Err(FeedError::Timeout),
                };

            if bytes == 0 {
                return Ok(FeedEvent::Eof);
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<FeedMessage>(line) {
                Ok(message) => {
                    self.messages_received += 1;
                    return Ok(FeedEvent::Message(message));
                }
                Err(e) => {
                    // Skip malformed lines and keep reading
                    warn!(error = %e, "skipping malformed feed message");
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "AIS-TCP"
    }
}

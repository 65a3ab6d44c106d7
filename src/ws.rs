//! WebSocket transport: the connector seam and the shared connection handle.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::error::Error;
use crate::tts::TtsConfig;

/// Write half of a connection.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

/// Read half of a connection.
pub type FrameStream = BoxStream<'static, Result<Message, tungstenite::Error>>;

/// Opens transports to the synthesis endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a transport identified by `connection_id` and returns its split halves
    /// once the handshake has completed.
    async fn connect(&self, connection_id: &str) -> Result<(FrameSink, FrameStream), Error>;
}

/// Connects to the read-aloud endpoint with `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    config: TtsConfig,
}

impl WebSocketConnector {
    /// Creates a connector for the endpoint and headers in `config`.
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, connection_id: &str) -> Result<(FrameSink, FrameStream), Error> {
        let url = self.config.endpoint_url(connection_id);
        info!(connection_id = %connection_id, endpoint = %self.config.endpoint, "WebSocket connecting");

        let request = Request::builder()
            .uri(&url)
            .header("Host", extract_host(&url))
            .header("Origin", &self.config.origin)
            .header("User-Agent", &self.config.user_agent)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .body(())
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let (ws_stream, _) = timeout(
            self.config.connect_timeout,
            tokio_tungstenite::connect_async(request),
        )
        .await
        .map_err(|_| Error::ConnectionTimeout)??;

        info!(connection_id = %connection_id, "WebSocket connected");

        let (write, read) = ws_stream.split();
        Ok((Box::pin(write), read.boxed()))
    }
}

/// An open transport shared by every in-flight request.
pub struct Connection {
    id: String,
    writer: Mutex<FrameSink>,
    open: AtomicBool,
    shutdown: Notify,
}

impl Connection {
    /// Wraps the write half of a freshly opened transport.
    pub fn new(id: String, writer: FrameSink) -> Self {
        Self {
            id,
            writer: Mutex::new(writer),
            open: AtomicBool::new(true),
            shutdown: Notify::new(),
        }
    }

    /// Connection identifier sent in the endpoint URL.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns false once the connection has been closed from either side.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Marks the connection closed without touching the transport.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Resolves once `close` or `stop` has been called.
    pub async fn closed(&self) {
        self.shutdown.notified().await
    }

    /// Stops the reader without a close handshake; the transport drops with it.
    pub fn stop(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Sends a text frame.
    pub async fn send_text(&self, text: String) -> Result<(), tungstenite::Error> {
        let mut writer = self.writer.lock().await;
        writer.send(Message::Text(text)).await
    }

    /// Sends a close frame, then stops the reader.
    pub async fn close(&self, code: CloseCode, reason: &str) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        info!(connection_id = %self.id, code = u16::from(code), reason = %reason, "WebSocket closing");
        {
            let mut writer = self.writer.lock().await;
            let frame = CloseFrame {
                code,
                reason: reason.to_string().into(),
            };
            if let Err(e) = writer.send(Message::Close(Some(frame))).await {
                debug!(connection_id = %self.id, error = %e, "Close frame not delivered");
            }
            let _ = writer.close().await;
        }
        self.shutdown.notify_one();
    }
}

fn extract_host(url: &str) -> &str {
    url.strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"))
        .and_then(|s| s.split(['/', '?']).next())
        .unwrap_or("localhost")
}

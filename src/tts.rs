//! Text-to-Speech client multiplexing many synthesis requests over one
//! read-aloud WebSocket connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use futures_util::{FutureExt, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::messages::{self, TurnEvent};
use crate::ws::{Connection, Connector, FrameStream, WebSocketConnector};
use crate::{ENDPOINT, ORIGIN, TRUSTED_CLIENT_TOKEN, USER_AGENT};

const CLOSE_ABNORMAL: u16 = 1006;

/// Configuration for the TTS client.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// WebSocket endpoint URL, without query string.
    pub endpoint: String,
    /// Token sent as the `TrustedClientToken` query parameter.
    pub trusted_client_token: String,
    /// `Origin` header sent with the handshake.
    pub origin: String,
    /// `User-Agent` header sent with the handshake.
    pub user_agent: String,
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Inactivity window after which the connection is closed.
    pub idle_timeout: Duration,
    /// Deadline for a single `synthesize` call once its frames are sent.
    pub request_timeout: Duration,
}

impl TtsConfig {
    /// Creates a configuration for `endpoint` with default headers and timeouts.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Sets the inactivity window after which the connection is closed.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Sets the deadline for a single `synthesize` call.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Sets the upper bound on the WebSocket handshake.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Full handshake URL for a connection.
    pub fn endpoint_url(&self, connection_id: &str) -> String {
        format!(
            "{}?TrustedClientToken={}&ConnectionId={}",
            self.endpoint, self.trusted_client_token, connection_id
        )
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: ENDPOINT.to_string(),
            trusted_client_token: TRUSTED_CLIENT_TOKEN.to_string(),
            origin: ORIGIN.to_string(),
            user_agent: USER_AGENT.to_string(),
            connect_timeout: crate::DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: crate::DEFAULT_TIMEOUT,
            request_timeout: crate::DEFAULT_TIMEOUT,
        }
    }
}

/// Observable state of the client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; the next call opens one.
    Absent,
    /// A handshake is in progress.
    Connecting,
    Open,
    /// The stored connection has shut down and is about to be discarded.
    Closed,
}

type Handshake = Shared<BoxFuture<'static, Result<Arc<Connection>, Error>>>;

enum Link {
    Absent,
    Connecting { attempt: u64, handshake: Handshake },
    Open(Arc<Connection>),
}

struct Pending {
    connection_id: String,
    tx: oneshot::Sender<Result<Vec<u8>, Error>>,
}

struct State {
    link: Link,
    attempts: u64,
    pending: HashMap<String, Pending>,
    buffers: HashMap<String, Vec<u8>>,
    idle_timer: Option<JoinHandle<()>>,
}

struct Inner {
    config: TtsConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<State>,
}

/// Text-to-Speech client for the read-aloud service.
///
/// One instance owns at most one connection. Cloning yields another handle to
/// the same connection and request tables, so `synthesize` can be called
/// concurrently from many tasks.
#[derive(Clone)]
pub struct TtsClient {
    inner: Arc<Inner>,
}

impl TtsClient {
    /// Creates a client that connects with [`WebSocketConnector`].
    pub fn new(config: TtsConfig) -> Self {
        let connector = Arc::new(WebSocketConnector::new(config.clone()));
        Self::with_connector(config, connector)
    }

    /// Creates a client that opens transports through `connector`.
    pub fn with_connector(config: TtsConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                state: Mutex::new(State {
                    link: Link::Absent,
                    attempts: 0,
                    pending: HashMap::new(),
                    buffers: HashMap::new(),
                    idle_timer: None,
                }),
            }),
        }
    }

    /// Synthesizes `ssml` in `output_format` and returns the assembled audio.
    ///
    /// Neither argument is validated; the service's answer, or the lack of
    /// one surfacing as [`Error::Timeout`], is the only feedback.
    pub async fn synthesize(&self, ssml: &str, output_format: &str) -> Result<Vec<u8>, Error> {
        let conn = self.inner.ensure_connected().await?;

        let request_id = new_id();
        let (tx, mut rx) = oneshot::channel();
        {
            // `mark_closed` precedes `handle_close`, so a connection seen open
            // here will still have this request rejected when it closes.
            let mut state = self.inner.lock();
            if !conn.is_open() {
                return Err(closed_before_use());
            }
            state.pending.insert(
                request_id.clone(),
                Pending {
                    connection_id: conn.id().to_string(),
                    tx,
                },
            );
        }
        let _guard = RequestGuard {
            inner: &self.inner,
            request_id: &request_id,
        };
        self.inner.reset_idle_timer();

        info!(request_id = %request_id, format = %output_format, "TTS request started");

        let config = messages::speech_config_frame(output_format)?;
        if let Err(e) = conn.send_text(config).await {
            warn!(request_id = %request_id, error = %e, "Failed to send speech config");
            return Err(Error::Send(Arc::new(e)));
        }
        if let Err(e) = conn.send_text(messages::ssml_frame(&request_id, ssml)).await {
            warn!(request_id = %request_id, error = %e, "Failed to send SSML");
            return Err(Error::Send(Arc::new(e)));
        }

        let request_timeout = self.inner.config.request_timeout;
        match timeout(request_timeout, &mut rx).await {
            Ok(Ok(result)) => {
                if let Ok(audio) = &result {
                    info!(request_id = %request_id, len = audio.len(), "TTS request finished");
                }
                result
            }
            Ok(Err(_)) => Err(Error::ConnectionClosed {
                code: CLOSE_ABNORMAL,
                reason: "request abandoned".to_string(),
            }),
            Err(_) => self.inner.expire(&request_id, &mut rx, request_timeout),
        }
    }

    /// Closes the connection. Outstanding calls fail with [`Error::ConnectionClosed`].
    ///
    /// A handshake in progress is awaited and the new connection closed as
    /// soon as it opens.
    pub async fn shutdown(&self) {
        let connection = match &self.inner.lock().link {
            Link::Absent => return,
            Link::Connecting { handshake, .. } => handshake.clone().boxed(),
            Link::Open(conn) => {
                let conn = Arc::clone(conn);
                async move { Ok::<_, Error>(conn) }.boxed()
            }
        };
        let Ok(conn) = connection.await else {
            return;
        };
        info!(connection_id = %conn.id(), "TTS shutting down");
        conn.close(CloseCode::Normal, "shutdown").await;
        self.inner
            .handle_close(conn.id(), CloseCode::Normal.into(), "shutdown".to_string());
    }

    /// Returns the state of the stored connection.
    pub fn connection_state(&self) -> ConnectionState {
        match &self.inner.lock().link {
            Link::Absent => ConnectionState::Absent,
            Link::Connecting { .. } => ConnectionState::Connecting,
            Link::Open(conn) if conn.is_open() => ConnectionState::Open,
            Link::Open(_) => ConnectionState::Closed,
        }
    }

    /// Identifier of the stored connection, if any.
    pub fn connection_id(&self) -> Option<String> {
        match &self.inner.lock().link {
            Link::Open(conn) => Some(conn.id().to_string()),
            _ => None,
        }
    }

    /// Number of `synthesize` calls waiting for their turn to end.
    pub fn pending_requests(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Number of turns currently accumulating audio.
    pub fn buffered_turns(&self) -> usize {
        self.inner.lock().buffers.len()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the open connection, joining or starting a handshake if needed.
    async fn ensure_connected(self: &Arc<Self>) -> Result<Arc<Connection>, Error> {
        let (attempt, handshake) = {
            let mut state = self.lock();
            match &state.link {
                Link::Open(conn) if conn.is_open() => return Ok(Arc::clone(conn)),
                Link::Connecting { attempt, handshake } => (*attempt, handshake.clone()),
                _ => {
                    state.attempts += 1;
                    let attempt = state.attempts;
                    let handshake = self.handshake();
                    state.link = Link::Connecting {
                        attempt,
                        handshake: handshake.clone(),
                    };
                    (attempt, handshake)
                }
            }
        };

        let result = handshake.await;

        let mut state = self.lock();
        let result = match result {
            Ok(conn) if !conn.is_open() => Err(closed_before_use()),
            other => other,
        };
        if matches!(&state.link, Link::Connecting { attempt: current, .. } if *current == attempt) {
            state.link = match &result {
                Ok(conn) => Link::Open(Arc::clone(conn)),
                Err(_) => Link::Absent,
            };
        }
        result
    }

    /// Settles a request whose deadline fired. A result the dispatcher
    /// delivered in the meantime wins over the timeout.
    fn expire(
        &self,
        request_id: &str,
        rx: &mut oneshot::Receiver<Result<Vec<u8>, Error>>,
        request_timeout: Duration,
    ) -> Result<Vec<u8>, Error> {
        let resolved = self.lock().pending.remove(request_id).is_none();
        if resolved {
            if let Ok(result) = rx.try_recv() {
                return result;
            }
        }
        warn!(request_id = %request_id, timeout = ?request_timeout, "TTS request timed out");
        Err(Error::Timeout(request_timeout))
    }

    fn handshake(self: &Arc<Self>) -> Handshake {
        let connector = Arc::clone(&self.connector);
        let inner = Arc::downgrade(self);
        async move {
            let connection_id = new_id();
            let (writer, reader) = match connector.connect(&connection_id).await {
                Ok(parts) => parts,
                Err(e) => {
                    error!(connection_id = %connection_id, error = %e, "WebSocket connection failed");
                    return Err(e);
                }
            };
            let conn = Arc::new(Connection::new(connection_id, writer));
            tokio::spawn(read_loop(inner, Arc::clone(&conn), reader));
            Ok(conn)
        }
        .boxed()
        .shared()
    }

    fn dispatch_text(&self, text: &str) {
        match messages::parse_turn(text) {
            Some(TurnEvent::Start(id)) => {
                debug!(request_id = %id, "Turn started");
                self.lock().buffers.insert(id.to_string(), Vec::new());
            }
            Some(TurnEvent::End(id)) => {
                let mut state = self.lock();
                match state.pending.remove(id) {
                    Some(pending) => {
                        let audio = state.buffers.remove(id).unwrap_or_default();
                        debug!(request_id = %id, len = audio.len(), "Turn ended");
                        let _ = pending.tx.send(Ok(audio));
                    }
                    None => debug!(request_id = %id, "Turn ended with no pending request"),
                }
            }
            None => {}
        }
    }

    fn dispatch_audio(&self, frame: &[u8]) {
        let Some(chunk) = messages::parse_audio(frame) else {
            debug!(len = frame.len(), "Dropping unparseable binary frame");
            return;
        };
        match self.lock().buffers.get_mut(chunk.request_id) {
            Some(buffer) => {
                debug!(request_id = %chunk.request_id, len = chunk.payload.len(), "Audio fragment");
                buffer.extend_from_slice(chunk.payload);
            }
            None => debug!(request_id = %chunk.request_id, "Audio fragment for unknown turn"),
        }
    }

    fn reset_idle_timer(self: &Arc<Self>) {
        let idle_timeout = self.config.idle_timeout;
        let inner = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            sleep(idle_timeout).await;
            if let Some(inner) = inner.upgrade() {
                inner.close_idle().await;
            }
        });
        if let Some(previous) = self.lock().idle_timer.replace(timer) {
            previous.abort();
        }
        debug!(timeout = ?idle_timeout, "Idle timer reset");
    }

    async fn close_idle(&self) {
        let conn = match &self.lock().link {
            Link::Open(conn) if conn.is_open() => Arc::clone(conn),
            _ => return,
        };
        info!(connection_id = %conn.id(), "No requests within idle window, closing connection");
        conn.close(CloseCode::Normal, "idle timeout").await;
        self.handle_close(conn.id(), CloseCode::Normal.into(), "idle timeout".to_string());
    }

    /// Fails every request issued on `connection_id` and forgets the connection.
    fn handle_close(&self, connection_id: &str, code: u16, reason: String) {
        let mut state = self.lock();
        let current = matches!(&state.link, Link::Open(conn) if conn.id() == connection_id);
        if current {
            state.link = Link::Absent;
            if let Some(timer) = state.idle_timer.take() {
                timer.abort();
            }
            state.buffers.clear();
        }

        let closed: Vec<String> = state
            .pending
            .iter()
            .filter(|(_, p)| p.connection_id == connection_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &closed {
            state.buffers.remove(id);
            if let Some(pending) = state.pending.remove(id) {
                let _ = pending.tx.send(Err(Error::ConnectionClosed {
                    code,
                    reason: reason.clone(),
                }));
            }
        }
        if !current && closed.is_empty() {
            return;
        }

        info!(
            connection_id = %connection_id,
            code = code,
            reason = %reason,
            rejected = closed.len(),
            "WebSocket connection closed"
        );
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.idle_timer.take() {
            timer.abort();
        }
        if let Link::Open(conn) = &state.link {
            conn.stop();
        }
    }
}

/// Removes a request's table entries however its call ends.
struct RequestGuard<'a> {
    inner: &'a Inner,
    request_id: &'a str,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.pending.remove(self.request_id);
        state.buffers.remove(self.request_id);
    }
}

/// Consumes inbound frames in arrival order until the connection ends.
async fn read_loop(inner: Weak<Inner>, conn: Arc<Connection>, mut reader: FrameStream) {
    let mut close: Option<(u16, String)> = None;
    let (code, reason): (u16, String) = loop {
        let next = tokio::select! {
            _ = conn.closed() => break (CloseCode::Normal.into(), "closed by client".to_string()),
            next = reader.next() => next,
        };
        let Some(client) = inner.upgrade() else {
            conn.close(CloseCode::Away, "client dropped").await;
            return;
        };
        match next {
            Some(Ok(Message::Text(text))) => client.dispatch_text(&text),
            Some(Ok(Message::Binary(data))) => client.dispatch_audio(&data),
            Some(Ok(Message::Close(frame))) => {
                debug!(connection_id = %conn.id(), frame = ?frame, "Received close");
                close = Some(match frame {
                    Some(frame) => (frame.code.into(), frame.reason.into_owned()),
                    None => (CloseCode::Status.into(), String::new()),
                });
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                break close.take().unwrap_or((CLOSE_ABNORMAL, e.to_string()));
            }
            None => {
                break close
                    .take()
                    .unwrap_or((CLOSE_ABNORMAL, "connection lost".to_string()));
            }
        }
    };

    conn.mark_closed();
    if let Some(inner) = inner.upgrade() {
        inner.handle_close(conn.id(), code, reason);
    }
}

fn closed_before_use() -> Error {
    Error::ConnectionClosed {
        code: CLOSE_ABNORMAL,
        reason: "connection closed before the request was sent".to_string(),
    }
}

/// 128-bit random identifier rendered as 32 lowercase hex digits.
fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

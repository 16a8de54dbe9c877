//! WebSocket client transport.
//!
//! One socket carries every joined topic. A reader task decodes inbound
//! frames, routes `event` frames to the subscription of their topic and
//! resolves pending requests from `ack`/`error` replies.

use async_trait::async_trait;
use beacon_protocol::{accepts_major, codec, validate_topic, Frame, PROTOCOL_MAJOR};
use bytes::BytesMut;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace, warn};

use crate::traits::{ConnectionId, InboundEvent, Subscription, Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Server URL, e.g. `ws://127.0.0.1:8080/ws`.
    pub url: String,
    /// Optional authentication token sent with the handshake.
    pub token: Option<String>,
    /// Time allowed for the socket to open and the handshake to finish.
    pub connect_timeout: Duration,
    /// Time allowed for the server to answer a join.
    pub join_timeout: Duration,
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/ws".to_string(),
            token: None,
            connect_timeout: Duration::from_secs(10),
            join_timeout: Duration::from_secs(10),
            max_message_size: 1024 * 1024, // 1 MB
        }
    }
}

/// State shared between the transport, its subscriptions and the reader task.
struct Shared {
    sink: Mutex<SplitSink<WsStream, Message>>,
    topics: DashMap<String, mpsc::UnboundedSender<InboundEvent>>,
    pending: DashMap<u64, oneshot::Sender<Frame>>,
    next_id: AtomicU64,
    open: AtomicBool,
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, frame: &Frame) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        let data = codec::encode(frame)?;
        let mut sink = self.sink.lock().await;
        sink.send(Message::Binary(data.to_vec()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Send a request frame and wait for the reply carrying the same ID.
    async fn request(&self, id: u64, frame: Frame, wait: Duration) -> Result<Frame, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        if let Err(e) = self.send(&frame).await {
            self.pending.remove(&id);
            return Err(e);
        }

        match timeout(wait, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed),
            Err(_) => {
                self.pending.remove(&id);
                Err(TransportError::Timeout("join reply"))
            }
        }
    }

    async fn handle_frame(&self, frame: Frame) {
        if let Some(id) = frame.reply_id() {
            match self.pending.remove(&id) {
                Some((_, waiter)) => {
                    let _ = waiter.send(frame);
                }
                None => {
                    if let Frame::Error { code, message, .. } = &frame {
                        warn!(id, code, message = %message, "Server error");
                    }
                }
            }
            return;
        }

        match frame {
            Frame::Event {
                topic,
                event,
                payload,
            } => {
                let delivered = self
                    .topics
                    .get(&topic)
                    .map(|tx| {
                        tx.send(InboundEvent::new(topic.clone(), event.clone(), payload))
                            .is_ok()
                    })
                    .unwrap_or(false);

                if !delivered {
                    trace!(topic = %topic, event = %event, "Dropped event for unjoined topic");
                }
            }
            Frame::Ping { timestamp } => {
                if let Err(e) = self.send(&Frame::pong(timestamp)).await {
                    warn!(error = %e, "Failed to send pong");
                }
            }
            Frame::Pong { .. } => {}
            other => {
                debug!(frame_type = ?other.frame_type(), "Ignoring unexpected frame");
            }
        }
    }

    /// Mark the connection closed and release every waiter.
    fn shutdown(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.topics.clear();
        self.pending.clear();
    }
}

/// Read the next complete frame from the socket.
///
/// Returns `Ok(None)` when the peer closed the connection.
async fn next_frame(
    stream: &mut SplitStream<WsStream>,
    buf: &mut BytesMut,
    max_message_size: usize,
) -> Result<Option<Frame>, TransportError> {
    loop {
        if let Some(frame) = codec::decode_from(buf)? {
            return Ok(Some(frame));
        }

        match stream.next().await {
            Some(Ok(Message::Binary(data))) => {
                if data.len() > max_message_size {
                    warn!(
                        "Message too large: {} bytes (max: {})",
                        data.len(),
                        max_message_size
                    );
                    return Err(TransportError::Protocol(
                        beacon_protocol::ProtocolError::FrameTooLarge(data.len()),
                    ));
                }
                buf.extend_from_slice(&data);
            }
            Some(Ok(Message::Text(text))) => {
                debug!(len = text.len(), "Ignoring text message");
            }
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => {
                // Control frames are answered by tungstenite itself
            }
            Some(Err(WsError::ConnectionClosed)) => return Ok(None),
            Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
        }
    }
}

async fn read_loop(
    shared: Arc<Shared>,
    mut stream: SplitStream<WsStream>,
    mut buf: BytesMut,
    max_message_size: usize,
) {
    loop {
        match next_frame(&mut stream, &mut buf, max_message_size).await {
            Ok(Some(frame)) => shared.handle_frame(frame).await,
            Ok(None) => {
                debug!("WebSocket stream ended");
                break;
            }
            Err(e) => {
                warn!(error = %e, "WebSocket receive failed");
                break;
            }
        }
    }
    shared.shutdown();
}

async fn heartbeat_loop(shared: Arc<Shared>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .ok();
        if let Err(e) = shared.send(&Frame::Ping { timestamp: now }).await {
            debug!(error = %e, "Heartbeat stopped");
            break;
        }
    }
}

/// Wait for the server's `connected` reply to our `connect` frame.
async fn await_connected(
    stream: &mut SplitStream<WsStream>,
    buf: &mut BytesMut,
    max_message_size: usize,
) -> Result<(ConnectionId, u32), TransportError> {
    loop {
        match next_frame(stream, buf, max_message_size).await? {
            Some(Frame::Connected {
                connection_id,
                version,
                heartbeat,
            }) => {
                if !accepts_major(version) {
                    return Err(TransportError::IncompatibleVersion(version));
                }
                return Ok((ConnectionId::new(connection_id), heartbeat));
            }
            Some(Frame::Error { message, .. }) => return Err(TransportError::Handshake(message)),
            Some(other) => {
                debug!(frame_type = ?other.frame_type(), "Frame before handshake completed");
            }
            None => return Err(TransportError::ConnectionClosed),
        }
    }
}

/// WebSocket client transport.
pub struct WebSocketTransport {
    shared: Arc<Shared>,
    connection_id: ConnectionId,
    heartbeat: Duration,
    join_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Open the socket and complete the protocol handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable, the handshake fails or
    /// the server speaks an incompatible protocol version.
    pub async fn connect(config: WebSocketConfig) -> Result<Self, TransportError> {
        let (ws, _) = timeout(config.connect_timeout, connect_async(config.url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout("connection"))?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        let (mut sink, mut stream) = ws.split();

        let hello = codec::encode(&Frame::connect(PROTOCOL_MAJOR, config.token.clone()))?;
        sink.send(Message::Binary(hello.to_vec()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let mut read_buffer = BytesMut::with_capacity(4096);
        let (connection_id, heartbeat_ms) = timeout(
            config.connect_timeout,
            await_connected(&mut stream, &mut read_buffer, config.max_message_size),
        )
        .await
        .map_err(|_| TransportError::Timeout("handshake"))??;

        info!(
            url = %config.url,
            connection = %connection_id,
            heartbeat_ms,
            "WebSocket transport connected"
        );

        let shared = Arc::new(Shared {
            sink: Mutex::new(sink),
            topics: DashMap::new(),
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            open: AtomicBool::new(true),
        });

        let heartbeat = Duration::from_millis(u64::from(heartbeat_ms));
        let mut tasks = vec![tokio::spawn(read_loop(
            Arc::clone(&shared),
            stream,
            read_buffer,
            config.max_message_size,
        ))];
        if !heartbeat.is_zero() {
            tasks.push(tokio::spawn(heartbeat_loop(Arc::clone(&shared), heartbeat)));
        }

        Ok(Self {
            shared,
            connection_id,
            heartbeat,
            join_timeout: config.join_timeout,
            tasks,
        })
    }

    /// Connection ID assigned by the server.
    #[must_use]
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// Heartbeat interval requested by the server.
    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Close the socket. Every subscription ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the close frame cannot be sent.
    pub async fn close(&self) -> Result<(), TransportError> {
        if !self.shared.open.swap(false, Ordering::SeqCst) {
            return Ok(()); // Already closed
        }

        self.shared.shutdown();
        let mut sink = self.shared.sink.lock().await;
        sink.close()
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to close: {}", e)))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn join(&self, topic: &str) -> Result<Box<dyn Subscription>, TransportError> {
        validate_topic(topic).map_err(TransportError::InvalidTopic)?;

        // Register before sending so events right after the ack are kept
        let (tx, rx) = mpsc::unbounded_channel();
        match self.shared.topics.entry(topic.to_string()) {
            Entry::Occupied(_) => return Err(TransportError::AlreadyJoined(topic.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }

        let id = self.shared.next_id();
        let reply = self
            .shared
            .request(id, Frame::join(id, topic), self.join_timeout)
            .await;

        let rejection = match reply {
            Ok(Frame::Ack { .. }) => None,
            Ok(Frame::Error { code, message, .. }) => Some(TransportError::JoinRejected {
                topic: topic.to_string(),
                code,
                message,
            }),
            Ok(other) => Some(TransportError::Handshake(format!(
                "unexpected join reply: {:?}",
                other.frame_type()
            ))),
            Err(e) => Some(e),
        };

        if let Some(e) = rejection {
            self.shared.topics.remove(topic);
            return Err(e);
        }

        debug!(topic = %topic, connection = %self.connection_id, "Joined topic");
        Ok(Box::new(WebSocketSubscription {
            topic: topic.to_string(),
            events: rx,
            shared: Arc::clone(&self.shared),
            joined: true,
        }))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }

    fn is_healthy(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.shared.shutdown();
    }
}

/// A topic joined over a [`WebSocketTransport`].
pub struct WebSocketSubscription {
    topic: String,
    events: mpsc::UnboundedReceiver<InboundEvent>,
    shared: Arc<Shared>,
    joined: bool,
}

#[async_trait]
impl Subscription for WebSocketSubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn recv(&mut self) -> Result<Option<InboundEvent>, TransportError> {
        Ok(self.events.recv().await)
    }

    async fn leave(&mut self) -> Result<(), TransportError> {
        if !std::mem::take(&mut self.joined) {
            return Ok(());
        }

        self.shared.topics.remove(&self.topic);
        self.events.close();

        if !self.shared.open.load(Ordering::SeqCst) {
            return Ok(());
        }
        let id = self.shared.next_id();
        self.shared.send(&Frame::leave(id, self.topic.as_str())).await?;
        debug!(topic = %self.topic, "Left topic");
        Ok(())
    }
}

impl Drop for WebSocketSubscription {
    fn drop(&mut self) {
        if self.joined {
            self.shared.topics.remove(&self.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_config_default() {
        let config = WebSocketConfig::default();
        assert_eq!(config.url, "ws://127.0.0.1:8080/ws");
        assert!(config.token.is_none());
        assert_eq!(config.join_timeout, Duration::from_secs(10));
        assert_eq!(config.max_message_size, 1024 * 1024);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop a listener to get a port with nothing behind it
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = WebSocketConfig {
            url: format!("ws://{}/ws", addr),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        assert!(WebSocketTransport::connect(config).await.is_err());
    }
}

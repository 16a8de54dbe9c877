//! Observe channel over a real WebSocket connection.

use beacon_core::{ConnectError, Message, ObserveChannel, RecordingLogger, Stream};
use beacon_protocol::{codec, codes, Frame};
use beacon_transport::{Transport, TransportError, WebSocketConfig, WebSocketTransport};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

/// Serve one client, answering each decoded client frame with the messages
/// `respond` returns. Returns every frame the client sent.
async fn spawn_server_with<F>(respond: F) -> (String, JoinHandle<Vec<Frame>>)
where
    F: Fn(&Frame) -> Vec<WsMessage> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let mut received = Vec::new();

        while let Some(Ok(msg)) = ws.next().await {
            let data = match msg {
                WsMessage::Binary(data) => data,
                WsMessage::Close(_) => break,
                _ => continue,
            };
            let frame = codec::decode(&data).unwrap();
            let replies = match &frame {
                Frame::Connect { .. } => vec![binary(&Frame::connected("conn-test", 1, 0))],
                other => respond(other),
            };
            received.push(frame);

            for reply in replies {
                if ws.send(reply).await.is_err() {
                    return received;
                }
            }
        }

        received
    });

    (url, server)
}

/// Serve one client: accept or refuse joins of "observe", push `events`
/// after a successful join.
async fn spawn_server(accept_join: bool, events: Vec<Frame>) -> (String, JoinHandle<Vec<Frame>>) {
    spawn_server_with(move |frame| match frame {
        Frame::Join { id, .. } if accept_join => std::iter::once(Frame::ack(*id))
            .chain(events.iter().cloned())
            .map(|f| binary(&f))
            .collect(),
        Frame::Join { id, .. } => vec![binary(&Frame::error(
            *id,
            codes::UNAUTHORIZED,
            "unauthorized",
        ))],
        _ => Vec::new(),
    })
    .await
}

fn binary(frame: &Frame) -> WsMessage {
    WsMessage::Binary(codec::encode(frame).unwrap().to_vec())
}

async fn connect_transport(url: String) -> Arc<WebSocketTransport> {
    connect_transport_with(url, Duration::from_secs(5)).await
}

async fn connect_transport_with(url: String, join_timeout: Duration) -> Arc<WebSocketTransport> {
    let config = WebSocketConfig {
        url,
        connect_timeout: Duration::from_secs(5),
        join_timeout,
        ..Default::default()
    };
    Arc::new(WebSocketTransport::connect(config).await.unwrap())
}

#[tokio::test]
async fn test_observe_over_websocket() {
    let events = vec![
        Frame::event("observe", "stream:created", json!({"id": "s1", "name": "orders"})),
        Frame::event("observe", "stream:created", json!({"id": false})),
        Frame::event("other", "stream:created", json!({"id": "s2", "name": "elsewhere"})),
        Frame::event(
            "observe",
            "messages:upserted",
            json!({"messages": [{"id": "m1"}, {"id": "m2"}]}),
        ),
    ];
    let (url, server) = spawn_server(true, events).await;

    let transport = connect_transport(url).await;
    assert_eq!(transport.connection_id().as_str(), "conn-test");
    assert!(transport.is_healthy());

    let logger = Arc::new(RecordingLogger::new());
    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let channel = ObserveChannel::with_logger(dyn_transport, logger.clone());

    let (stream_tx, mut stream_rx) = mpsc::unbounded_channel::<Stream>();
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<Vec<Message>>();
    channel.on_stream_created(move |stream| {
        let _ = stream_tx.send(stream);
    });
    channel.on_messages_upserted(move |messages| {
        let _ = batch_tx.send(messages);
    });

    channel.connect().await.unwrap();

    let stream = timeout(Duration::from_secs(5), stream_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stream.id, "s1");
    assert_eq!(stream.name, "orders");

    let batch = timeout(Duration::from_secs(5), batch_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<_> = batch.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m1", "m2"]);

    // The malformed event was reported, the foreign-topic event never arrived
    assert_eq!(logger.failures().len(), 1);
    assert!(stream_rx.try_recv().is_err());

    channel.close().await;
    transport.close().await.unwrap();

    let received = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert!(matches!(received[0], Frame::Connect { version: 1, .. }));
    assert!(received
        .iter()
        .any(|f| matches!(f, Frame::Join { topic, .. } if topic == "observe")));
    assert!(received
        .iter()
        .any(|f| matches!(f, Frame::Leave { topic, .. } if topic == "observe")));
}

#[tokio::test]
async fn test_join_rejected_over_websocket() {
    let (url, server) = spawn_server(false, Vec::new()).await;
    let transport = connect_transport(url).await;

    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let channel = ObserveChannel::new(dyn_transport);

    match channel.connect().await {
        Err(ConnectError::Transport(TransportError::JoinRejected { topic, code, .. })) => {
            assert_eq!(topic, "observe");
            assert_eq!(code, codes::UNAUTHORIZED);
        }
        other => panic!("Expected JoinRejected, got {:?}", other),
    }
    assert!(!channel.session().is_connected());

    transport.close().await.unwrap();
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_text_frames_are_skipped() {
    let (url, server) = spawn_server_with(|frame| match frame {
        Frame::Join { id, .. } => vec![
            WsMessage::Text("not msgpack".to_string()),
            binary(&Frame::ack(*id)),
            WsMessage::Text("\u{0}\u{0}\u{0}\u{9}garbage!!".to_string()),
            binary(&Frame::event(
                "observe",
                "stream:created",
                json!({"id": "s1", "name": "orders"}),
            )),
        ],
        _ => Vec::new(),
    })
    .await;
    let transport = connect_transport(url).await;

    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let channel = ObserveChannel::new(dyn_transport);
    let (tx, mut rx) = mpsc::unbounded_channel::<Stream>();
    channel.on_stream_created(move |stream| {
        let _ = tx.send(stream);
    });
    channel.connect().await.unwrap();

    let stream = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stream.id, "s1");
    assert!(transport.is_healthy());

    channel.close().await;
    transport.close().await.unwrap();
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_close_releases_pending_join() {
    let (joined_tx, mut joined_rx) = mpsc::unbounded_channel();
    let (url, server) = spawn_server_with(move |frame| {
        if let Frame::Join { topic, .. } = frame {
            let _ = joined_tx.send(topic.clone());
        }
        Vec::new()
    })
    .await;
    let transport = connect_transport_with(url, Duration::from_secs(30)).await;

    let joining = Arc::clone(&transport);
    let join = tokio::spawn(async move { joining.join("observe").await.map(|_| ()) });

    let topic = timeout(Duration::from_secs(5), joined_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topic, "observe");

    transport.close().await.unwrap();

    let result = timeout(Duration::from_secs(5), join).await.unwrap().unwrap();
    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}

//! End-to-end tests of the stream client against a local WebSocket backend.

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use codeword_net::stream::{ConnectionStatus, IncomingMessage, OutgoingMessage, StreamClient};

mod common;
use common::WsConnection;

const WAIT: Duration = Duration::from_secs(5);

async fn next_text(connection: &mut WsConnection) -> String {
    loop {
        let message = timeout(WAIT, connection.socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = message {
            return text.as_str().to_owned();
        }
    }
}

async fn next_status(statuses: &mut mpsc::UnboundedReceiver<ConnectionStatus>) -> ConnectionStatus {
    timeout(WAIT, statuses.recv()).await.expect("timed out waiting for status").unwrap()
}

#[tokio::test]
async fn test_queued_messages_flush_and_inbound_delivery() {
    let (addr, mut connections) = common::start_ws_backend().await;
    let mut config = common::local_config(None, Some(addr)).stream;
    config.query.insert("client".into(), "codeword-app".into());

    let client = StreamClient::new(&config).unwrap();
    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    client
        .set_status_listener(move |status| {
            let _ = status_tx.send(status);
        })
        .unwrap();
    let (message_tx, mut messages) = mpsc::unbounded_channel();
    client
        .set_message_listener(move |message| {
            let _ = message_tx.send(message);
        })
        .unwrap();

    for text in ["first", "second", "third"] {
        client.send(OutgoingMessage::chat(text).with_session("s-1")).unwrap();
    }
    client.connect().unwrap();

    let mut connection = timeout(WAIT, connections.recv()).await.unwrap().unwrap();
    assert_eq!(connection.uri, "/ws?client=codeword-app");

    for text in ["first", "second", "third"] {
        let frame: serde_json::Value = serde_json::from_str(&next_text(&mut connection).await).unwrap();
        assert_eq!(frame["type"], "chat.message");
        assert_eq!(frame["text"], text);
        assert_eq!(frame["session_id"], "s-1");
    }
    assert_eq!(next_status(&mut statuses).await, ConnectionStatus::Connecting);
    assert_eq!(next_status(&mut statuses).await, ConnectionStatus::Open);

    connection
        .socket
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    connection
        .socket
        .send(Message::Text(r#"{"type":"token","content":"Hel"}"#.into()))
        .await
        .unwrap();
    connection
        .socket
        .send(Message::Text(r#"{"type":"final","content":"Hello"}"#.into()))
        .await
        .unwrap();

    let received = timeout(WAIT, messages.recv()).await.unwrap().unwrap();
    assert_eq!(received, IncomingMessage::Token { content: "Hel".into() });
    let received = timeout(WAIT, messages.recv()).await.unwrap().unwrap();
    assert_eq!(received, IncomingMessage::Final { content: Some("Hello".into()) });
    // The malformed frame changed nothing.
    assert!(statuses.try_recv().is_err());

    client.shutdown().await;
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let (addr, mut connections) = common::start_ws_backend().await;
    let config = common::local_config(None, Some(addr)).stream;

    let client = StreamClient::new(&config).unwrap();
    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    client
        .set_status_listener(move |status| {
            let _ = status_tx.send(status);
        })
        .unwrap();
    client.connect().unwrap();

    let connection = timeout(WAIT, connections.recv()).await.unwrap().unwrap();
    assert_eq!(next_status(&mut statuses).await, ConnectionStatus::Connecting);
    assert_eq!(next_status(&mut statuses).await, ConnectionStatus::Open);

    let dropped_at = Instant::now();
    drop(connection);
    assert_eq!(next_status(&mut statuses).await, ConnectionStatus::Closed);

    // Queued while the connection is down.
    client.send(OutgoingMessage::chat("after reconnect")).unwrap();

    let mut connection = timeout(WAIT, connections.recv()).await.unwrap().unwrap();
    assert!(dropped_at.elapsed() >= Duration::from_millis(500));
    assert_eq!(next_status(&mut statuses).await, ConnectionStatus::Connecting);
    assert_eq!(next_status(&mut statuses).await, ConnectionStatus::Open);

    let frame: serde_json::Value = serde_json::from_str(&next_text(&mut connection).await).unwrap();
    assert_eq!(frame["text"], "after reconnect");

    client.shutdown().await;
    // The client closes its side on shutdown.
    let closed = timeout(WAIT, async {
        loop {
            match connection.socket.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

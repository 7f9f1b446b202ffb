//! Duplex text transport under the stream client.
//!
//! # Responsibilities
//! - Open one socket per [`DuplexHandle`]
//! - Surface open, frame, error and close events on the handle
//! - Close the socket when the handle is dropped
//!
//! # Data Flow
//! ```text
//! StreamClient ──outbound frames──▶ DuplexHandle ──▶ socket task ──▶ server
//! StreamClient ◀──TransportEvent── DuplexHandle ◀── socket task ◀── server
//! ```

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Lifecycle and data events from one handle.
///
/// `Error` and `Closed` are both terminal: the client drops the handle on
/// whichever arrives first and ignores anything after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Error(String),
    Closed,
}

/// Client end of one connection.
///
/// Dropping it tears the connection down.
#[derive(Debug)]
pub struct DuplexHandle {
    outbound: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Transport end of one connection.
#[derive(Debug)]
pub struct TransportSide {
    pub outbound: mpsc::UnboundedReceiver<String>,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl DuplexHandle {
    /// A connected handle and its transport side.
    pub fn pair() -> (DuplexHandle, TransportSide) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            DuplexHandle {
                outbound: outbound_tx,
                events: events_rx,
            },
            TransportSide {
                outbound: outbound_rx,
                events: events_tx,
            },
        )
    }

    /// Queue a text frame. Returns false once the transport is gone.
    pub fn send(&self, frame: String) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Next event; `None` once the transport side is dropped.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

/// Opens duplex handles to a URL.
pub trait Connector: Send + 'static {
    fn open(&self, url: &Url) -> DuplexHandle;
}

/// WebSocket connector on tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &Url) -> DuplexHandle {
        let (handle, side) = DuplexHandle::pair();
        tokio::spawn(run_socket(url.clone(), side));
        handle
    }
}

async fn run_socket(url: Url, side: TransportSide) {
    let TransportSide {
        mut outbound,
        events,
    } = side;

    let socket = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "WebSocket connect failed");
            let _ = events.send(TransportEvent::Error(e.to_string()));
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };
    if events.send(TransportEvent::Opened).is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame.into())).await {
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        let _ = events.send(TransportEvent::Closed);
                        return;
                    }
                }
                None => {
                    // Handle dropped.
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Frame(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        let _ = events.send(TransportEvent::Frame(text));
                    }
                    Err(_) => tracing::trace!(len = bytes.len(), "Skipping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_carries_frames_and_events() {
        let (mut handle, mut side) = DuplexHandle::pair();

        assert!(handle.send("hello".into()));
        assert_eq!(side.outbound.recv().await.as_deref(), Some("hello"));

        side.events.send(TransportEvent::Opened).unwrap();
        assert_eq!(handle.next_event().await, Some(TransportEvent::Opened));

        drop(side);
        assert_eq!(handle.next_event().await, None);
        assert!(!handle.send("late".into()));
    }

    #[tokio::test]
    async fn unreachable_server_reports_error_then_close() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
        let mut handle = WsConnector.open(&url);

        assert!(matches!(handle.next_event().await, Some(TransportEvent::Error(_))));
        assert_eq!(handle.next_event().await, Some(TransportEvent::Closed));
    }
}

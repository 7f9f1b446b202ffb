//! Tokio driver for [`StreamMachine`].
//!
//! # Data Flow
//! ```text
//! StreamClient (cloneable handle)
//!     → Command channel
//!     → driver task: select! { command, transport event, reconnect timer }
//!     → StreamMachine input → Vec<Effect>
//!     → apply: open handle / transmit / notify listeners / arm timer
//! ```
//!
//! # Design Decisions
//! - One task owns the machine, the transport handle and the listeners; no locks
//! - The task ends on `shutdown()` or when every `StreamClient` clone is dropped
//! - Listeners run on the driver task and should return quickly

use std::collections::BTreeMap;
use std::future;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use url::Url;

use crate::config::StreamConfig;
use crate::observability::metrics;
use crate::stream::machine::{ConnectionStatus, Effect, Generation, StreamMachine};
use crate::stream::protocol::{IncomingMessage, OutgoingMessage};
use crate::stream::transport::{Connector, DuplexHandle, TransportEvent, WsConnector};

/// Receives every decoded inbound message.
pub type MessageListener = Box<dyn FnMut(IncomingMessage) + Send>;
/// Receives every status transition.
pub type StatusListener = Box<dyn FnMut(ConnectionStatus) + Send>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid stream URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("stream client has shut down")]
    Closed,
}

enum Command {
    Connect,
    Send(OutgoingMessage),
    SetMessageListener(MessageListener),
    SetStatusListener(StatusListener),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a persistent, self-reconnecting message stream.
#[derive(Debug, Clone)]
pub struct StreamClient {
    commands: mpsc::UnboundedSender<Command>,
}

impl StreamClient {
    /// WebSocket-backed client. Must be called inside a tokio runtime.
    pub fn new(config: &StreamConfig) -> Result<Self, StreamError> {
        Self::with_connector(WsConnector, config)
    }

    pub fn with_connector<C: Connector>(connector: C, config: &StreamConfig) -> Result<Self, StreamError> {
        let url = build_url(&config.url, &config.query)?;
        let (commands, rx) = mpsc::unbounded_channel();

        let driver = Driver {
            connector,
            url,
            machine: StreamMachine::new(config.backoff_floor(), config.backoff_ceiling()),
            handle: None,
            reconnect_at: None,
            on_message: None,
            on_status: None,
        };
        tokio::spawn(driver.run(rx));

        Ok(Self { commands })
    }

    /// Open a connection, replacing any current one.
    pub fn connect(&self) -> Result<(), StreamError> {
        self.command(Command::Connect)
    }

    /// Transmit now if open, otherwise queue until the next open.
    pub fn send(&self, message: OutgoingMessage) -> Result<(), StreamError> {
        self.command(Command::Send(message))
    }

    /// Replace the message listener.
    pub fn set_message_listener<F>(&self, listener: F) -> Result<(), StreamError>
    where
        F: FnMut(IncomingMessage) + Send + 'static,
    {
        self.command(Command::SetMessageListener(Box::new(listener)))
    }

    /// Replace the status listener.
    pub fn set_status_listener<F>(&self, listener: F) -> Result<(), StreamError>
    where
        F: FnMut(ConnectionStatus) + Send + 'static,
    {
        self.command(Command::SetStatusListener(Box::new(listener)))
    }

    /// Stop reconnecting and close the current connection.
    ///
    /// Affects every clone of this client.
    pub async fn shutdown(self) {
        let (tx, rx) = oneshot::channel();
        if self.command(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    fn command(&self, command: Command) -> Result<(), StreamError> {
        self.commands.send(command).map_err(|_| StreamError::Closed)
    }
}

/// Append `query` to `base`, leaving the URL untouched when empty.
pub fn build_url(base: &str, query: &BTreeMap<String, String>) -> Result<Url, StreamError> {
    let mut url = Url::parse(base).map_err(|e| StreamError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(StreamError::InvalidUrl {
            url: base.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(url)
}

struct Driver<C> {
    connector: C,
    url: Url,
    machine: StreamMachine,
    handle: Option<(Generation, DuplexHandle)>,
    reconnect_at: Option<Instant>,
    on_message: Option<MessageListener>,
    on_status: Option<StatusListener>,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let done = loop {
            let effects = tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Connect) => self.machine.connect(),
                    Some(Command::Send(message)) => self.machine.send(message),
                    Some(Command::SetMessageListener(listener)) => {
                        self.on_message = Some(listener);
                        Vec::new()
                    }
                    Some(Command::SetStatusListener(listener)) => {
                        self.on_status = Some(listener);
                        Vec::new()
                    }
                    Some(Command::Shutdown(done)) => break Some(done),
                    None => break None,
                },
                (generation, event) = next_event(&mut self.handle) => self.on_event(generation, event),
                _ = sleep_until_deadline(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.machine.reconnect_due()
                }
            };
            self.apply(effects);
        };

        self.handle = None;
        drop(commands);
        tracing::info!(queued = self.machine.queued(), "Stream client shut down");
        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    fn on_event(&mut self, generation: Generation, event: Option<TransportEvent>) -> Vec<Effect> {
        match event {
            Some(TransportEvent::Opened) => self.machine.on_open(generation),
            Some(TransportEvent::Frame(frame)) => self.machine.on_frame(generation, &frame),
            Some(TransportEvent::Error(error)) => {
                tracing::debug!(generation = %generation, error = %error, "Stream transport error");
                self.handle = None;
                self.machine.on_closed(generation)
            }
            Some(TransportEvent::Closed) | None => {
                self.handle = None;
                self.machine.on_closed(generation)
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Status(status) => {
                    metrics::record_stream_status(status);
                    if let Some(listener) = self.on_status.as_mut() {
                        listener(status);
                    }
                }
                Effect::Open(generation) => {
                    self.reconnect_at = None;
                    // Replacing drops the previous handle and its events.
                    self.handle = Some((generation, self.connector.open(&self.url)));
                }
                Effect::Transmit { generation, frame } => match &self.handle {
                    Some((current, handle)) if *current == generation => {
                        if !handle.send(frame) {
                            tracing::debug!(generation = %generation, "Transport gone, frame lost");
                        }
                    }
                    _ => tracing::trace!(generation = %generation, "Skipping transmit on stale handle"),
                },
                Effect::Deliver(message) => match self.on_message.as_mut() {
                    Some(listener) => listener(message),
                    None => tracing::trace!("No message listener registered"),
                },
                Effect::ScheduleReconnect(delay) => {
                    self.handle = None;
                    self.reconnect_at = Some(Instant::now() + delay);
                    metrics::record_reconnect();
                }
            }
        }
    }
}

async fn next_event(handle: &mut Option<(Generation, DuplexHandle)>) -> (Generation, Option<TransportEvent>) {
    match handle {
        Some((generation, handle)) => (*generation, handle.next_event().await),
        None => future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

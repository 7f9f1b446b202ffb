//! Connection state machine.
//!
//! # States
//! - Disconnected: nothing opened yet
//! - Connecting(g): handle `g` requested, not open yet
//! - Open(g): handle `g` carries traffic
//! - ClosedPendingRetry: handle gone, reconnect scheduled
//!
//! # State Transitions
//! ```text
//! Disconnected ──connect──▶ Connecting(g)
//! Connecting(g) ──opened(g)──▶ Open(g)            reset backoff, flush queue
//! Connecting(g) | Open(g) ──closed(g)──▶ ClosedPendingRetry   schedule reconnect
//! ClosedPendingRetry ──reconnect due──▶ Connecting(g+1)
//! ```
//!
//! # Design Decisions
//! - No I/O and no timers: every input returns the effects to perform, so the
//!   machine is driven by tests directly and by the tokio driver in client.rs
//! - Every handle has a generation; events from older generations are ignored
//! - Malformed frames are dropped without touching the state

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::backoff::ReconnectBackoff;
use crate::stream::protocol::{IncomingMessage, OutgoingMessage};

/// Identifies one transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Status reported to the status subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Internal lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting(Generation),
    Open(Generation),
    ClosedPendingRetry,
}

/// Work the driver must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Notify the status subscriber.
    Status(ConnectionStatus),
    /// Open a new transport handle, replacing any current one.
    Open(Generation),
    /// Write a text frame on handle `generation`.
    Transmit { generation: Generation, frame: String },
    /// Hand a decoded message to the message subscriber.
    Deliver(IncomingMessage),
    /// Call [`StreamMachine::reconnect_due`] after this delay.
    ScheduleReconnect(Duration),
}

/// Reconnect, queue and backoff bookkeeping for one logical connection.
#[derive(Debug)]
pub struct StreamMachine {
    phase: Phase,
    next_generation: u64,
    backoff: ReconnectBackoff,
    outbound: VecDeque<OutgoingMessage>,
}

impl StreamMachine {
    pub fn new(backoff_floor: Duration, backoff_ceiling: Duration) -> Self {
        Self {
            phase: Phase::Disconnected,
            next_generation: 1,
            backoff: ReconnectBackoff::new(backoff_floor, backoff_ceiling),
            outbound: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last status reported, `None` before the first connect.
    pub fn status(&self) -> Option<ConnectionStatus> {
        match self.phase {
            Phase::Disconnected => None,
            Phase::Connecting(_) => Some(ConnectionStatus::Connecting),
            Phase::Open(_) => Some(ConnectionStatus::Open),
            Phase::ClosedPendingRetry => Some(ConnectionStatus::Closed),
        }
    }

    /// Delay the next reconnect will wait.
    pub fn backoff(&self) -> Duration {
        self.backoff.current()
    }

    /// Messages waiting for an open connection.
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    /// Start a new connection attempt.
    ///
    /// Calling this while connecting or open abandons the current handle.
    pub fn connect(&mut self) -> Vec<Effect> {
        let generation = Generation(self.next_generation);
        self.next_generation += 1;
        self.phase = Phase::Connecting(generation);

        tracing::debug!(generation = %generation, "Connecting stream");
        vec![Effect::Status(ConnectionStatus::Connecting), Effect::Open(generation)]
    }

    /// The reconnect timer fired.
    pub fn reconnect_due(&mut self) -> Vec<Effect> {
        if self.phase == Phase::ClosedPendingRetry {
            self.connect()
        } else {
            Vec::new()
        }
    }

    /// Handle `generation` finished its handshake.
    pub fn on_open(&mut self, generation: Generation) -> Vec<Effect> {
        if self.phase != Phase::Connecting(generation) {
            tracing::trace!(generation = %generation, phase = ?self.phase, "Ignoring open from stale handle");
            return Vec::new();
        }
        self.phase = Phase::Open(generation);
        self.backoff.reset();

        let mut effects = Vec::with_capacity(self.outbound.len() + 1);
        effects.push(Effect::Status(ConnectionStatus::Open));

        let queued = self.outbound.len();
        for message in self.outbound.drain(..) {
            match message.encode() {
                Ok(frame) => effects.push(Effect::Transmit { generation, frame }),
                Err(e) => tracing::warn!(error = %e, "Dropping unencodable queued message"),
            }
        }
        tracing::info!(generation = %generation, flushed = queued, "Stream open");
        effects
    }

    /// Handle `generation` delivered a text frame.
    pub fn on_frame(&mut self, generation: Generation, frame: &str) -> Vec<Effect> {
        if self.phase != Phase::Open(generation) {
            tracing::trace!(generation = %generation, "Ignoring frame from stale handle");
            return Vec::new();
        }
        match IncomingMessage::decode(frame) {
            Ok(message) => vec![Effect::Deliver(message)],
            Err(e) => {
                // Tolerated: the stream stays up on noise.
                metrics::record_dropped_frame();
                tracing::trace!(generation = %generation, error = %e, "Dropping malformed frame");
                Vec::new()
            }
        }
    }

    /// Handle `generation` closed or failed.
    pub fn on_closed(&mut self, generation: Generation) -> Vec<Effect> {
        match self.phase {
            Phase::Connecting(current) | Phase::Open(current) if current == generation => {}
            _ => {
                tracing::trace!(generation = %generation, "Ignoring close from stale handle");
                return Vec::new();
            }
        }
        self.phase = Phase::ClosedPendingRetry;
        let delay = self.backoff.advance();

        tracing::info!(
            generation = %generation,
            retry_in_ms = delay.as_millis() as u64,
            queued = self.outbound.len(),
            "Stream closed, reconnect scheduled"
        );
        vec![Effect::Status(ConnectionStatus::Closed), Effect::ScheduleReconnect(delay)]
    }

    /// Send now if open, otherwise queue.
    pub fn send(&mut self, message: OutgoingMessage) -> Vec<Effect> {
        match self.phase {
            Phase::Open(generation) => match message.encode() {
                Ok(frame) => vec![Effect::Transmit { generation, frame }],
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unencodable message");
                    Vec::new()
                }
            },
            _ => {
                self.outbound.push_back(message);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> StreamMachine {
        StreamMachine::new(Duration::from_millis(500), Duration::from_secs(8))
    }

    fn opened_generation(effects: &[Effect]) -> Generation {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Open(g) => Some(*g),
                _ => None,
            })
            .expect("no Open effect")
    }

    fn frames(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Transmit { frame, .. } => Some(frame.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connect_reports_connecting_then_opens_handle() {
        let mut m = machine();
        assert_eq!(m.status(), None);

        let effects = m.connect();
        let g = opened_generation(&effects);
        assert_eq!(effects[0], Effect::Status(ConnectionStatus::Connecting));
        assert_eq!(m.phase(), Phase::Connecting(g));

        assert_eq!(m.on_open(g), vec![Effect::Status(ConnectionStatus::Open)]);
        assert_eq!(m.status(), Some(ConnectionStatus::Open));
    }

    #[test]
    fn queued_messages_flush_in_order_exactly_once() {
        let mut m = machine();
        let g = opened_generation(&m.connect());

        for text in ["one", "two", "three"] {
            assert!(m.send(OutgoingMessage::chat(text)).is_empty());
        }
        assert_eq!(m.queued(), 3);

        let effects = m.on_open(g);
        assert_eq!(
            frames(&effects),
            vec![
                r#"{"type":"chat.message","text":"one"}"#,
                r#"{"type":"chat.message","text":"two"}"#,
                r#"{"type":"chat.message","text":"three"}"#,
            ]
        );
        assert!(effects.iter().all(|e| match e {
            Effect::Transmit { generation, .. } => *generation == g,
            _ => true,
        }));
        assert_eq!(m.queued(), 0);

        // A duplicate open is stale by then and flushes nothing.
        assert!(m.on_open(g).is_empty());
    }

    #[test]
    fn send_while_open_transmits_immediately() {
        let mut m = machine();
        let g = opened_generation(&m.connect());
        m.on_open(g);

        let effects = m.send(OutgoingMessage::chat("now"));
        assert_eq!(
            effects,
            vec![Effect::Transmit {
                generation: g,
                frame: r#"{"type":"chat.message","text":"now"}"#.into()
            }]
        );
        assert_eq!(m.queued(), 0);
    }

    #[test]
    fn close_schedules_reconnect_with_doubling_backoff() {
        let mut m = machine();
        let mut delays = Vec::new();
        for _ in 0..6 {
            let g = opened_generation(&m.reconnect_due_or_connect());
            let effects = m.on_closed(g);
            assert_eq!(effects[0], Effect::Status(ConnectionStatus::Closed));
            match effects[1] {
                Effect::ScheduleReconnect(d) => delays.push(d.as_millis() as u64),
                ref other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 8_000, 8_000]);
        assert_eq!(m.backoff(), Duration::from_secs(8));
    }

    #[test]
    fn backoff_tracks_consecutive_disconnects_and_resets_on_open() {
        let mut m = machine();
        for n in 0..6u32 {
            let expected = (500u64 * 2u64.pow(n)).min(8_000);
            assert_eq!(m.backoff(), Duration::from_millis(expected), "after {n} disconnects");
            let g = opened_generation(&m.reconnect_due_or_connect());
            m.on_closed(g);
        }

        let g = opened_generation(&m.reconnect_due());
        m.on_open(g);
        assert_eq!(m.backoff(), Duration::from_millis(500));
    }

    #[test]
    fn stale_handles_cannot_deliver_events() {
        let mut m = machine();
        let old = opened_generation(&m.connect());
        m.on_open(old);

        // Replaced before the old handle reported anything else.
        let new = opened_generation(&m.connect());
        assert_ne!(old, new);

        assert!(m.on_frame(old, r#"{"type":"token","content":"x"}"#).is_empty());
        assert!(m.on_closed(old).is_empty());
        assert!(m.on_open(old).is_empty());
        assert_eq!(m.phase(), Phase::Connecting(new));
    }

    #[test]
    fn malformed_frames_are_dropped_without_status_change() {
        let mut m = machine();
        let g = opened_generation(&m.connect());
        m.on_open(g);

        assert!(m.on_frame(g, "garbage").is_empty());
        assert!(m.on_frame(g, r#"{"type":"mystery"}"#).is_empty());
        assert_eq!(m.status(), Some(ConnectionStatus::Open));

        assert_eq!(
            m.on_frame(g, r#"{"type":"final"}"#),
            vec![Effect::Deliver(IncomingMessage::Final { content: None })]
        );
    }

    #[test]
    fn reconnect_due_is_ignored_unless_pending() {
        let mut m = machine();
        assert!(m.reconnect_due().is_empty());

        let g = opened_generation(&m.connect());
        assert!(m.reconnect_due().is_empty());
        m.on_closed(g);
        assert!(matches!(m.reconnect_due()[..], [Effect::Status(ConnectionStatus::Connecting), Effect::Open(_)]));
    }

    #[test]
    fn messages_sent_while_closed_wait_for_next_open() {
        let mut m = machine();
        let g1 = opened_generation(&m.connect());
        m.on_open(g1);
        m.on_closed(g1);

        m.send(OutgoingMessage::chat("queued"));
        let g2 = opened_generation(&m.reconnect_due());
        let effects = m.on_open(g2);
        assert_eq!(frames(&effects), vec![r#"{"type":"chat.message","text":"queued"}"#]);
    }

    impl StreamMachine {
        fn reconnect_due_or_connect(&mut self) -> Vec<Effect> {
            match self.phase {
                Phase::ClosedPendingRetry => self.reconnect_due(),
                _ => self.connect(),
            }
        }
    }
}

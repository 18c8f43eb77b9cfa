//! Events delivered to signaling observers.

use crate::frame::SignalFrame;
use confab_transport::ConnectionId;
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of signaling event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingClientEventType {
    /// Socket handshake started
    WebSocketConnecting,
    /// Socket open
    WebSocketOpen,
    /// Socket failed; a `WebSocketClosed` follows
    WebSocketFailed,
    /// Local close requested
    WebSocketClosing,
    /// Socket gone
    WebSocketClosed,
    /// A frame arrived
    ReceivedSignalFrame,
    /// A message arrived that is not a valid frame; it was dropped
    ProtocolDecodeFailure,
}

/// Event from the signaling client
#[derive(Debug, Clone, PartialEq)]
pub struct SignalingClientEvent {
    /// Kind
    pub kind: SignalingClientEventType,
    /// Socket the event came from
    pub connection_id: ConnectionId,
    /// Wall-clock time the event was dispatched (ms since the Unix epoch)
    pub timestamp_ms: u64,
    /// Decoded frame for `ReceivedSignalFrame`
    pub frame: Option<SignalFrame>,
    /// Close code for `WebSocketClosed`
    pub close_code: Option<u16>,
    /// Close reason, failure description or decode error
    pub reason: Option<String>,
}

impl SignalingClientEvent {
    /// Event without frame or close details
    #[must_use]
    pub fn new(kind: SignalingClientEventType, connection_id: ConnectionId) -> Self {
        Self {
            kind,
            connection_id,
            timestamp_ms: now_ms(),
            frame: None,
            close_code: None,
            reason: None,
        }
    }

    /// Event carrying a received frame
    #[must_use]
    pub fn received(connection_id: ConnectionId, frame: SignalFrame) -> Self {
        Self {
            frame: Some(frame),
            ..Self::new(SignalingClientEventType::ReceivedSignalFrame, connection_id)
        }
    }

    /// Whether the socket is gone after this event
    #[must_use]
    pub fn is_connection_terminal(&self) -> bool {
        matches!(
            self.kind,
            SignalingClientEventType::WebSocketFailed | SignalingClientEventType::WebSocketClosed
        )
    }
}

/// Receives signaling events.
///
/// Callbacks run on the dispatch task and must not block.
pub trait SignalingClientObserver: Send + Sync {
    /// Handle one event
    fn handle_signaling_client_event(&self, event: &SignalingClientEvent);
}

/// Milliseconds since the Unix epoch
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

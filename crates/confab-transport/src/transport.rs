//! Socket trait abstraction for signaling backends.
//!
//! This module defines the traits that abstract over the WebSocket
//! implementation used for the signaling channel. A connector produces a
//! pair of halves (sink and stream) so that the connection task can read
//! and write concurrently without sharing a mutable socket.

use async_trait::async_trait;
use std::fmt;

/// Transport layer errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The socket could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Opening the socket took longer than the configured timeout
    #[error("Connection timed out")]
    ConnectTimeout,

    /// No inbound traffic for longer than the idle timeout
    #[error("Connection idle for too long")]
    IdleTimeout,

    /// Send attempted while the socket is not open or connecting
    #[error("Socket is not open")]
    NotOpen,

    /// Socket was closed underneath an operation
    #[error("Socket is closed")]
    Closed,

    /// Sending a message failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Receiving a message failed
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Message read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
    /// A binary message (one signaling frame)
    Binary(Vec<u8>),
    /// The remote end closed the socket
    Closed {
        /// WebSocket close code
        code: u16,
        /// Close reason supplied by the peer
        reason: String,
    },
}

/// Write half of an open socket.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one binary message.
    ///
    /// # Errors
    /// Returns `TransportError` if the write fails
    async fn send(&mut self, data: Vec<u8>) -> TransportResult<()>;

    /// Perform the closing handshake.
    ///
    /// # Errors
    /// Returns `TransportError` if the close frame cannot be written
    async fn close(&mut self, code: u16, reason: &str) -> TransportResult<()>;
}

/// Read half of an open socket.
#[async_trait]
pub trait FrameStream: Send {
    /// Wait for the next message. `None` means the stream ended without a
    /// close frame.
    async fn next_message(&mut self) -> Option<TransportResult<SocketMessage>>;
}

/// Boxed write half
pub type BoxFrameSink = Box<dyn FrameSink>;

/// Boxed read half
pub type BoxFrameStream = Box<dyn FrameStream>;

/// Opens sockets.
///
/// # Examples
///
/// ```no_run
/// use confab_transport::transport::WebSocketConnector;
/// use confab_transport::websocket::TungsteniteConnector;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connector = TungsteniteConnector::new();
/// let (mut sink, mut stream) = connector.connect("wss://signal.example.com/control").await?;
/// sink.send(vec![0x13, 0x02, 0x08, 0x01]).await?;
/// let _reply = stream.next_message().await;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait WebSocketConnector: Send + Sync {
    /// Open a socket to `url` and split it into its halves.
    ///
    /// # Errors
    /// Returns `TransportError::ConnectionFailed` if the handshake fails
    async fn connect(&self, url: &str) -> TransportResult<(BoxFrameSink, BoxFrameStream)>;
}

/// Monotonic identifier of one socket opened by a [`crate::SignalingConnection`].
///
/// Every event carries the id of the socket it came from, so consumers can
/// discard events that belong to a socket that has since been replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Id used before any socket was opened
    pub const NONE: Self = Self(0);

    /// Create from a raw value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The id that follows this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_ordering() {
        let first = ConnectionId::NONE.next();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.as_u64(), 2);
        assert_eq!(first.to_string(), "conn-1");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(TransportError::NotOpen.to_string(), "Socket is not open");
        assert_eq!(
            TransportError::ConnectionFailed("refused".into()).to_string(),
            "Connection failed: refused"
        );
    }
}

//! # Confab Transport
//!
//! Signaling transport layer for Confab.
//!
//! This crate provides:
//! - Socket traits abstracting the WebSocket implementation
//! - A tokio-tungstenite connector for real servers
//! - An in-memory connector for tests and loopback use
//! - The single-socket [`SignalingConnection`] state machine

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod memory;
pub mod transport;
pub mod websocket;

use std::time::Duration;

pub use connection::{ConnectionEvent, ConnectionState, SignalingConnection, TransportEvent};
pub use transport::{
    BoxFrameSink, BoxFrameStream, ConnectionId, FrameSink, FrameStream, SocketMessage,
    TransportError, TransportResult, WebSocketConnector,
};

/// Normal closure close code
pub const CLOSE_NORMAL: u16 = 1000;

/// Going-away close code, used when the owner is dropped
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Abnormal closure close code, reported when the stream ends without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum time to wait for the socket handshake
    pub connect_timeout: Duration,
    /// Inbound silence after which the socket is considered dead
    pub idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

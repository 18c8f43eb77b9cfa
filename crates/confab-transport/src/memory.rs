//! In-process socket pairs.
//!
//! [`MemoryConnector`] hands every accepted socket to a [`MemoryListener`]
//! as a [`MemoryServerConnection`], letting tests and loopback tools script
//! the server side of the signaling channel without a network.

use crate::transport::{
    BoxFrameSink, BoxFrameStream, FrameSink, FrameStream, SocketMessage, TransportError,
    TransportResult, WebSocketConnector,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Connector producing in-memory sockets
pub struct MemoryConnector {
    accept_tx: mpsc::UnboundedSender<MemoryServerConnection>,
    refuse: AtomicBool,
    stall: AtomicBool,
    attempts: AtomicU64,
}

impl MemoryConnector {
    /// Create a connector and the listener receiving its server ends
    #[must_use]
    pub fn new() -> (Self, MemoryListener) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        (
            Self {
                accept_tx,
                refuse: AtomicBool::new(false),
                stall: AtomicBool::new(false),
                attempts: AtomicU64::new(0),
            },
            MemoryListener { accept_rx },
        )
    }

    /// Refuse subsequent connection attempts
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make subsequent connection attempts hang forever
    pub fn set_stall(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    /// Number of connection attempts seen so far
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSocketConnector for MemoryConnector {
    async fn connect(&self, url: &str) -> TransportResult<(BoxFrameSink, BoxFrameStream)> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(format!(
                "{url}: connection refused"
            )));
        }

        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();

        let server = MemoryServerConnection {
            url: url.to_string(),
            to_client: server_tx,
            from_client: server_rx,
        };
        self.accept_tx
            .send(server)
            .map_err(|_| TransportError::ConnectionFailed(format!("{url}: no listener")))?;

        Ok((
            Box::new(MemorySink { tx: client_tx }),
            Box::new(MemoryStream { rx: client_rx }),
        ))
    }
}

/// Receives the server ends of sockets opened through a [`MemoryConnector`]
pub struct MemoryListener {
    accept_rx: mpsc::UnboundedReceiver<MemoryServerConnection>,
}

impl MemoryListener {
    /// Wait for the next socket. `None` once the connector is gone.
    pub async fn accept(&mut self) -> Option<MemoryServerConnection> {
        self.accept_rx.recv().await
    }
}

/// Server end of an in-memory socket
pub struct MemoryServerConnection {
    url: String,
    to_client: mpsc::UnboundedSender<SocketMessage>,
    from_client: mpsc::UnboundedReceiver<SocketMessage>,
}

impl MemoryServerConnection {
    /// URL the client connected to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push a binary message to the client
    ///
    /// # Errors
    /// Returns `TransportError::Closed` if the client end is gone
    pub fn send(&self, data: Vec<u8>) -> TransportResult<()> {
        self.to_client
            .send(SocketMessage::Binary(data))
            .map_err(|_| TransportError::Closed)
    }

    /// Close the socket with a close frame
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.to_client.send(SocketMessage::Closed {
            code,
            reason: reason.to_string(),
        });
    }

    /// Next message from the client. `None` once the client end is gone.
    pub async fn recv(&mut self) -> Option<SocketMessage> {
        self.from_client.recv().await
    }

    /// Next binary message from the client; `None` on close or disconnect
    pub async fn recv_binary(&mut self) -> Option<Vec<u8>> {
        match self.from_client.recv().await? {
            SocketMessage::Binary(data) => Some(data),
            SocketMessage::Closed { .. } => None,
        }
    }
}

struct MemorySink {
    tx: mpsc::UnboundedSender<SocketMessage>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, data: Vec<u8>) -> TransportResult<()> {
        self.tx
            .send(SocketMessage::Binary(data))
            .map_err(|_| TransportError::SendFailed("peer is gone".into()))
    }

    async fn close(&mut self, code: u16, reason: &str) -> TransportResult<()> {
        self.tx
            .send(SocketMessage::Closed {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| TransportError::Closed)
    }
}

struct MemoryStream {
    rx: mpsc::UnboundedReceiver<SocketMessage>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn next_message(&mut self) -> Option<TransportResult<SocketMessage>> {
        self.rx.recv().await.map(Ok)
    }
}

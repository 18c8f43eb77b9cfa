//! Single-socket signaling connection.
//!
//! A [`SignalingConnection`] owns at most one socket at a time. Each call to
//! [`SignalingConnection::open`] supersedes the previous socket and starts a
//! background task that drives the new one through
//! `Closed -> Connecting -> Open -> Closing -> Closed`, with `Failed` as the
//! terminal error state. Every lifecycle change and inbound message is
//! reported as a [`ConnectionEvent`] tagged with the socket's
//! [`ConnectionId`].

use crate::transport::{
    BoxFrameSink, BoxFrameStream, ConnectionId, SocketMessage, TransportError, TransportResult,
    WebSocketConnector,
};
use crate::{CLOSE_ABNORMAL, CLOSE_GOING_AWAY, CLOSE_NORMAL, TransportConfig};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

/// Socket lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket
    Closed,
    /// Handshake in progress; sends are queued
    Connecting,
    /// Socket is usable
    Open,
    /// Close requested, waiting for the socket to wind down
    Closing,
    /// The socket failed
    Failed,
}

impl ConnectionState {
    /// Whether sends are accepted in this state
    #[must_use]
    pub fn accepts_sends(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Closing)
    }
}

/// What happened on a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake started
    Connecting,
    /// Handshake finished
    Open,
    /// A binary message arrived
    Message(Vec<u8>),
    /// Close was requested locally
    Closing,
    /// The socket failed; always followed by `Closed`
    Failed(String),
    /// The socket is gone
    Closed {
        /// WebSocket close code
        code: u16,
        /// Close reason
        reason: String,
    },
}

/// Event from one socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// Socket that produced the event
    pub connection_id: ConnectionId,
    /// The event
    pub event: TransportEvent,
}

enum Outbound {
    Frame(Vec<u8>),
    Close { code: u16, reason: String },
}

struct ActiveSocket {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    state: Arc<watch::Sender<ConnectionState>>,
    task: JoinHandle<()>,
}

struct Inner {
    next_id: ConnectionId,
    active: Option<ActiveSocket>,
}

/// Owner of the signaling socket
pub struct SignalingConnection {
    connector: Arc<dyn WebSocketConnector>,
    config: TransportConfig,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    inner: Mutex<Inner>,
}

impl SignalingConnection {
    /// Create a connection and the receiver of its events
    #[must_use]
    pub fn new(
        connector: Arc<dyn WebSocketConnector>,
        config: TransportConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                connector,
                config,
                events,
                inner: Mutex::new(Inner {
                    next_id: ConnectionId::NONE,
                    active: None,
                }),
            },
            events_rx,
        )
    }

    /// Open a socket to `url`, superseding any previous one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, url: &str) -> ConnectionId {
        let mut inner = self.lock();

        if let Some(previous) = inner.active.take() {
            previous.task.abort();
            if previous.state.borrow().is_active() {
                debug!("Superseding socket {}", previous.id);
                previous.state.send_replace(ConnectionState::Closed);
                emit(
                    &self.events,
                    previous.id,
                    TransportEvent::Closed {
                        code: CLOSE_NORMAL,
                        reason: "superseded".to_string(),
                    },
                );
            }
        }

        inner.next_id = inner.next_id.next();
        let id = inner.next_id;

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let state = Arc::new(watch::Sender::new(ConnectionState::Connecting));
        emit(&self.events, id, TransportEvent::Connecting);
        info!("Opening signaling socket {} to {}", id, url);

        let task = tokio::spawn(run_socket(SocketTask {
            id,
            url: url.to_string(),
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            outbound_rx,
            state: Arc::clone(&state),
            events: self.events.clone(),
        }));

        inner.active = Some(ActiveSocket {
            id,
            outbound,
            state,
            task,
        });
        id
    }

    /// Send one binary message.
    ///
    /// Messages sent while connecting are queued and flushed once the
    /// socket opens.
    ///
    /// # Errors
    /// Returns `TransportError::NotOpen` unless the socket is connecting or open
    pub fn send(&self, data: Vec<u8>) -> TransportResult<()> {
        let inner = self.lock();
        let active = inner.active.as_ref().ok_or(TransportError::NotOpen)?;
        if !active.state.borrow().accepts_sends() {
            return Err(TransportError::NotOpen);
        }
        active
            .outbound
            .send(Outbound::Frame(data))
            .map_err(|_| TransportError::NotOpen)
    }

    /// Close the current socket. Closing an idle connection is a no-op.
    pub fn close(&self) {
        let mut inner = self.lock();
        let Some(active) = inner.active.as_ref() else {
            return;
        };

        let state = *active.state.borrow();
        match state {
            ConnectionState::Open => {
                active.state.send_replace(ConnectionState::Closing);
                emit(&self.events, active.id, TransportEvent::Closing);
                let _ = active.outbound.send(Outbound::Close {
                    code: CLOSE_NORMAL,
                    reason: String::new(),
                });
            }
            ConnectionState::Connecting => {
                active.task.abort();
                active.state.send_replace(ConnectionState::Closed);
                emit(&self.events, active.id, TransportEvent::Closing);
                emit(
                    &self.events,
                    active.id,
                    TransportEvent::Closed {
                        code: CLOSE_NORMAL,
                        reason: "closed while connecting".to_string(),
                    },
                );
                inner.active = None;
            }
            ConnectionState::Closing | ConnectionState::Closed | ConnectionState::Failed => {}
        }
    }

    /// Current socket state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lock()
            .active
            .as_ref()
            .map_or(ConnectionState::Closed, |active| *active.state.borrow())
    }

    /// Whether the socket is open right now
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Id of the current socket, if any was opened
    #[must_use]
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.lock().active.as_ref().map(|active| active.id)
    }

    /// Watch the state of the current socket
    #[must_use]
    pub fn watch_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.lock()
            .active
            .as_ref()
            .map(|active| active.state.subscribe())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for SignalingConnection {
    fn drop(&mut self) {
        let inner = self.lock();
        let Some(active) = inner.active.as_ref() else {
            return;
        };
        let state = *active.state.borrow();
        match state {
            ConnectionState::Open => {
                // Detached: the task finishes the closing handshake on its own.
                active.state.send_replace(ConnectionState::Closing);
                let _ = active.outbound.send(Outbound::Close {
                    code: CLOSE_GOING_AWAY,
                    reason: String::new(),
                });
            }
            ConnectionState::Connecting => active.task.abort(),
            _ => {}
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<ConnectionEvent>, id: ConnectionId, event: TransportEvent) {
    let _ = events.send(ConnectionEvent {
        connection_id: id,
        event,
    });
}

struct SocketTask {
    id: ConnectionId,
    url: String,
    connector: Arc<dyn WebSocketConnector>,
    config: TransportConfig,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl SocketTask {
    fn emit(&self, event: TransportEvent) {
        emit(&self.events, self.id, event);
    }

    fn fail(&self, error: &TransportError) {
        warn!("Signaling socket {} failed: {}", self.id, error);
        self.state.send_replace(ConnectionState::Failed);
        self.emit(TransportEvent::Failed(error.to_string()));
        self.emit(TransportEvent::Closed {
            code: CLOSE_ABNORMAL,
            reason: error.to_string(),
        });
    }

    fn finish(&self, code: u16, reason: String) {
        info!("Signaling socket {} closed ({})", self.id, code);
        self.state.send_replace(ConnectionState::Closed);
        self.emit(TransportEvent::Closed { code, reason });
    }
}

async fn run_socket(mut task: SocketTask) {
    let connected = timeout(task.config.connect_timeout, task.connector.connect(&task.url)).await;
    let (mut sink, mut stream): (BoxFrameSink, BoxFrameStream) = match connected {
        Ok(Ok(halves)) => halves,
        Ok(Err(e)) => return task.fail(&e),
        Err(_) => return task.fail(&TransportError::ConnectTimeout),
    };

    // A close may have been requested while the handshake was in flight.
    if *task.state.borrow() != ConnectionState::Connecting {
        let _ = sink.close(CLOSE_NORMAL, "").await;
        return;
    }
    task.state.send_replace(ConnectionState::Open);
    task.emit(TransportEvent::Open);
    debug!("Signaling socket {} open", task.id);

    let mut idle_deadline = Instant::now() + task.config.idle_timeout;
    loop {
        tokio::select! {
            outbound = task.outbound_rx.recv() => match outbound {
                Some(Outbound::Frame(data)) => {
                    if let Err(e) = sink.send(data).await {
                        return task.fail(&e);
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    let _ = sink.close(code, &reason).await;
                    return task.finish(code, reason);
                }
                None => {
                    let _ = sink.close(CLOSE_GOING_AWAY, "").await;
                    return task.finish(CLOSE_GOING_AWAY, String::new());
                }
            },
            inbound = stream.next_message() => match inbound {
                Some(Ok(SocketMessage::Binary(data))) => {
                    idle_deadline = Instant::now() + task.config.idle_timeout;
                    task.emit(TransportEvent::Message(data));
                }
                Some(Ok(SocketMessage::Closed { code, reason })) => {
                    return task.finish(code, reason);
                }
                Some(Err(e)) => return task.fail(&e),
                None => {
                    return task.fail(&TransportError::ReceiveFailed(
                        "stream ended without close frame".to_string(),
                    ));
                }
            },
            () = sleep_until(idle_deadline) => {
                let _ = sink.close(CLOSE_GOING_AWAY, "idle").await;
                return task.fail(&TransportError::IdleTimeout);
            }
        }
    }
}

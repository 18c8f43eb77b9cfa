//! tokio-tungstenite socket backend.

use crate::transport::{
    BoxFrameSink, BoxFrameStream, FrameSink, FrameStream, SocketMessage, TransportError,
    TransportResult, WebSocketConnector,
};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector backed by tokio-tungstenite (rustls for `wss://`)
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    /// Create a new connector
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WebSocketConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> TransportResult<(BoxFrameSink, BoxFrameStream)> {
        let (ws, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        debug!("WebSocket handshake complete: HTTP {}", response.status());

        let (sink, stream) = ws.split();
        Ok((
            Box::new(TungsteniteSink { sink }),
            Box::new(TungsteniteStream { stream }),
        ))
    }
}

struct TungsteniteSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for TungsteniteSink {
    async fn send(&mut self, data: Vec<u8>) -> TransportResult<()> {
        self.sink
            .send(Message::Binary(data.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &str) -> TransportResult<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.sink
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

struct TungsteniteStream {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for TungsteniteStream {
    async fn next_message(&mut self) -> Option<TransportResult<SocketMessage>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::ReceiveFailed(e.to_string()))),
            };

            match message {
                Message::Binary(data) => return Some(Ok(SocketMessage::Binary(data.to_vec()))),
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((crate::CLOSE_NORMAL, String::new()));
                    return Some(Ok(SocketMessage::Closed { code, reason }));
                }
                // The signaling protocol is binary only; control frames are
                // answered by tungstenite itself.
                other => trace!("Ignoring non-binary WebSocket message: {:?}", other),
            }
        }
    }
}

//! Signaling client: typed frames over a [`SignalingConnection`].

use super::event::{
    SignalingClientEvent, SignalingClientEventType, SignalingClientObserver, now_ms,
};
use crate::PROTOCOL_VERSION;
use crate::error::SignalingError;
use crate::frame::{FrameCodec, SignalFrame};
use crate::messages::{
    ClientDetails, ClientMetricFrame, DataMessageFrame, JoinFrame, LeaveFrame, MeetingCredentials,
    MuteFrame, PauseResumeFrame, PingPongFrame, PrimaryMeetingJoinFrame,
    PrimaryMeetingLeaveFrame, RemoteVideoUpdateFrame, StreamDescriptor, StreamDirection,
    SubscribeFrame, VideoSubscriptionConfiguration, join_flags,
};
use crate::observer::{ObserverId, ObserverSet};
use crate::stream_id_set::VideoStreamIdSet;
use confab_transport::{
    ConnectionEvent, ConnectionId, SignalingConnection, TransportConfig, TransportEvent,
    WebSocketConnector,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Maximum data-message topic length
pub const MAX_DATA_MESSAGE_TOPIC_LEN: usize = 36;

/// Maximum data-message payload size in bytes
pub const MAX_DATA_MESSAGE_BYTES: usize = 2048;

/// Maximum time the server retains a data message
pub const MAX_DATA_MESSAGE_LIFETIME_MS: u32 = 300_000;

/// Where and how to open the signaling socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingConnectionRequest {
    /// Base signaling URL (`ws://` or `wss://`)
    pub signaling_url: String,
    /// Join token identifying the attendee
    pub join_token: String,
}

impl SignalingConnectionRequest {
    /// Request for `signaling_url` authenticated by `join_token`
    pub fn new(signaling_url: impl Into<String>, join_token: impl Into<String>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            join_token: join_token.into(),
        }
    }

    /// Socket URL with protocol version and join token query parameters
    ///
    /// # Errors
    /// Returns `SignalingError::InvalidUrl` for unparsable or non-WebSocket URLs
    pub fn url(&self) -> Result<Url, SignalingError> {
        let mut url =
            Url::parse(&self.signaling_url).map_err(|e| SignalingError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SignalingError::InvalidUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        url.query_pairs_mut()
            .append_pair("protocol_version", &PROTOCOL_VERSION.to_string())
            .append_pair("join_token", &self.join_token);
        Ok(url)
    }
}

/// Parameters of the Join frame
#[derive(Debug, Clone)]
pub struct JoinSettings {
    /// Most remote videos the client can render
    pub max_num_of_videos: u32,
    /// Offer SDP compression
    pub sdp_compression: bool,
    /// Client identification
    pub client_details: ClientDetails,
    /// Audio session to rejoin, 0 for a new one
    pub audio_session_id: u64,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            max_num_of_videos: 25,
            sdp_compression: true,
            client_details: ClientDetails {
                sdk_name: "confab".to_string(),
                sdk_version: env!("CARGO_PKG_VERSION").to_string(),
                os_name: std::env::consts::OS.to_string(),
                ..Default::default()
            },
            audio_session_id: 0,
        }
    }
}

impl JoinSettings {
    fn to_frame(&self) -> JoinFrame {
        let mut flags = join_flags::HAS_STREAM_UPDATE
            | join_flags::COMPLETE_VIDEO_SOURCES_LIST
            | join_flags::EXCLUDE_SELF_CONTENT_IN_INDEX;
        if self.sdp_compression {
            flags |= join_flags::COMPRESSED_SDP;
        }
        JoinFrame {
            protocol_version: PROTOCOL_VERSION,
            max_num_of_videos: self.max_num_of_videos,
            flags,
            client_details: Some(self.client_details.clone()),
            audio_session_id: self.audio_session_id,
        }
    }
}

/// Parameters of the Subscribe frame
#[derive(Debug, Clone, Default)]
pub struct SubscribeSettings {
    /// Media direction of this client
    pub duplex: StreamDirection,
    /// Local streams being sent
    pub send_streams: Vec<StreamDescriptor>,
    /// Remote streams to receive
    pub receive_stream_ids: VideoStreamIdSet,
    /// Local SDP offer
    pub sdp_offer: String,
    /// Audio host URL
    pub audio_host: String,
    /// Join with audio muted
    pub audio_muted: bool,
    /// Join audio in check-in mode
    pub audio_checkin: bool,
}

impl SubscribeSettings {
    fn to_frame(&self) -> SubscribeFrame {
        SubscribeFrame {
            duplex: self.duplex as i32,
            send_streams: self.send_streams.clone(),
            receive_stream_ids: self.receive_stream_ids.to_vec(),
            sdp_offer: self.sdp_offer.clone(),
            audio_host: self.audio_host.clone(),
            audio_checkin: self.audio_checkin,
            audio_muted: self.audio_muted,
            compressed_sdp_offer: Vec::new(),
        }
    }
}

/// Reject data messages the server would refuse
///
/// # Errors
/// Returns `SignalingError::InvalidDataMessage` naming the first offending field
pub fn validate_data_message(frame: &DataMessageFrame) -> Result<(), SignalingError> {
    for message in &frame.messages {
        let topic = &message.topic;
        if topic.is_empty()
            || topic.len() > MAX_DATA_MESSAGE_TOPIC_LEN
            || !topic
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(SignalingError::InvalidDataMessage(format!(
                "invalid topic: {topic:?}"
            )));
        }
        if message.data.len() > MAX_DATA_MESSAGE_BYTES {
            return Err(SignalingError::InvalidDataMessage(format!(
                "data is {} bytes, limit is {}",
                message.data.len(),
                MAX_DATA_MESSAGE_BYTES
            )));
        }
        if message.lifetime_ms > MAX_DATA_MESSAGE_LIFETIME_MS {
            return Err(SignalingError::InvalidDataMessage(format!(
                "lifetime {} ms exceeds {} ms",
                message.lifetime_ms, MAX_DATA_MESSAGE_LIFETIME_MS
            )));
        }
    }
    Ok(())
}

/// SDP compression negotiated for the current socket
#[derive(Default)]
struct Compression {
    connection: AtomicU64,
    requested: AtomicBool,
    enabled: AtomicBool,
}

impl Compression {
    fn reset(&self, connection_id: ConnectionId) {
        self.connection.store(connection_id.as_u64(), Ordering::SeqCst);
        self.requested.store(false, Ordering::SeqCst);
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn on_join_ack(&self, connection_id: ConnectionId, wants_compressed_sdp: bool) {
        if connection_id.as_u64() == self.connection.load(Ordering::SeqCst) {
            let enabled = wants_compressed_sdp && self.requested.load(Ordering::SeqCst);
            self.enabled.store(enabled, Ordering::SeqCst);
        }
    }

    fn codec(&self) -> FrameCodec {
        if self.enabled.load(Ordering::SeqCst) {
            FrameCodec::with_sdp_compression()
        } else {
            FrameCodec::new()
        }
    }
}

struct Inner {
    connection: SignalingConnection,
    observers: Arc<ObserverSet<dyn SignalingClientObserver>>,
    compression: Arc<Compression>,
    dispatcher: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Typed signaling client.
///
/// Sends are fire-and-forget: a send returns once the frame is queued on the
/// socket. Everything the socket reports, including server responses, is
/// delivered to observers from a single dispatch task in arrival order.
#[derive(Clone)]
pub struct SignalingClient {
    inner: Arc<Inner>,
}

impl SignalingClient {
    /// Create a client; must be called from within a tokio runtime
    #[must_use]
    pub fn new(connector: Arc<dyn WebSocketConnector>, config: TransportConfig) -> Self {
        let (connection, events) = SignalingConnection::new(connector, config);
        let observers: Arc<ObserverSet<dyn SignalingClientObserver>> = Arc::new(ObserverSet::new());
        let compression = Arc::new(Compression::default());
        let dispatcher = tokio::spawn(dispatch(
            events,
            Arc::clone(&observers),
            Arc::clone(&compression),
        ));
        Self {
            inner: Arc::new(Inner {
                connection,
                observers,
                compression,
                dispatcher,
            }),
        }
    }

    /// Register an observer
    pub fn add_observer(&self, observer: Arc<dyn SignalingClientObserver>) -> ObserverId {
        self.inner.observers.add(observer)
    }

    /// Unregister an observer
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.remove(id)
    }

    /// Number of registered observers, subscriptions included
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Receive events through a channel until the subscription is dropped
    #[must_use]
    pub fn subscribe_events(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.observers.add(Arc::new(ChannelObserver { tx }));
        EventSubscription {
            id,
            observers: Arc::clone(&self.inner.observers),
            rx,
        }
    }

    /// Open a new socket, superseding the current one
    ///
    /// # Errors
    /// Returns `SignalingError::InvalidUrl` if the request URL is unusable
    pub fn open_connection(
        &self,
        request: &SignalingConnectionRequest,
    ) -> Result<ConnectionId, SignalingError> {
        let url = request.url()?;
        let id = self.inner.connection.open(url.as_str());
        self.inner.compression.reset(id);
        info!("Opening signaling connection {} to {}", id, request.signaling_url);
        Ok(id)
    }

    /// Close the socket
    pub fn close_connection(&self) {
        self.inner.connection.close();
    }

    /// Whether the socket is open
    #[must_use]
    pub fn ready(&self) -> bool {
        self.inner.connection.is_open()
    }

    /// Identifier of the current socket
    #[must_use]
    pub fn current_connection_id(&self) -> Option<ConnectionId> {
        self.inner.connection.current_id()
    }

    /// Whether outgoing SDP is compressed on the current socket
    #[must_use]
    pub fn sdp_compression_enabled(&self) -> bool {
        self.inner.compression.enabled.load(Ordering::SeqCst)
    }

    /// Send Join
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn join(&self, settings: &JoinSettings) -> Result<(), SignalingError> {
        self.inner
            .compression
            .requested
            .store(settings.sdp_compression, Ordering::SeqCst);
        self.send_frame(&SignalFrame::Join(settings.to_frame()))
    }

    /// Send Subscribe
    ///
    /// # Errors
    /// Returns an error if the frame cannot be encoded or sent
    pub fn subscribe(&self, settings: &SubscribeSettings) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::Subscribe(settings.to_frame()))
    }

    /// Send RemoteVideoUpdate
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn remote_video_update(
        &self,
        added_or_updated: Vec<VideoSubscriptionConfiguration>,
        removed_mids: Vec<String>,
    ) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::RemoteVideoUpdate(RemoteVideoUpdateFrame {
            added_or_updated,
            removed_mids,
        }))
    }

    /// Send Leave
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn leave(&self) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::Leave(LeaveFrame {}))
    }

    /// Send Mute
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn mute(&self, muted: bool) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::Mute(MuteFrame { muted }))
    }

    /// Ask the server to stop forwarding `stream_ids`
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn pause(&self, stream_ids: &VideoStreamIdSet) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::Pause(PauseResumeFrame {
            stream_ids: stream_ids.to_vec(),
            group_ids: Vec::new(),
        }))
    }

    /// Ask the server to resume forwarding `stream_ids`
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn resume(&self, stream_ids: &VideoStreamIdSet) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::Resume(PauseResumeFrame {
            stream_ids: stream_ids.to_vec(),
            group_ids: Vec::new(),
        }))
    }

    /// Send ClientMetric
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn send_client_metrics(&self, frame: ClientMetricFrame) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::ClientMetric(frame))
    }

    /// Validate and send DataMessage
    ///
    /// # Errors
    /// Returns `SignalingError::InvalidDataMessage` before sending anything if
    /// any message is invalid
    pub fn send_data_message(&self, frame: DataMessageFrame) -> Result<(), SignalingError> {
        validate_data_message(&frame)?;
        self.send_frame(&SignalFrame::DataMessage(frame))
    }

    /// Send PingPong; returns the wall-clock send time in ms
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn ping_pong(&self, frame: PingPongFrame) -> Result<u64, SignalingError> {
        self.send_frame(&SignalFrame::PingPong(frame))?;
        Ok(now_ms())
    }

    /// Ask to be promoted into the primary meeting
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn promote_to_primary_meeting(
        &self,
        credentials: MeetingCredentials,
    ) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::PrimaryMeetingJoin(PrimaryMeetingJoinFrame {
            credentials: Some(credentials),
        }))
    }

    /// Leave the primary meeting
    ///
    /// # Errors
    /// Returns an error if the socket does not accept the frame
    pub fn demote_from_primary_meeting(&self) -> Result<(), SignalingError> {
        self.send_frame(&SignalFrame::PrimaryMeetingLeave(PrimaryMeetingLeaveFrame {}))
    }

    fn send_frame(&self, frame: &SignalFrame) -> Result<(), SignalingError> {
        let data = self.inner.compression.codec().encode(frame)?;
        debug!("Sending {} ({} bytes)", frame.frame_type(), data.len());
        self.inner.connection.send(data)?;
        Ok(())
    }
}

/// Temporary observer feeding a channel; unregistered on drop
pub struct EventSubscription {
    id: ObserverId,
    observers: Arc<ObserverSet<dyn SignalingClientObserver>>,
    rx: mpsc::UnboundedReceiver<SignalingClientEvent>,
}

impl EventSubscription {
    /// Next event, in dispatch order
    pub async fn recv(&mut self) -> Option<SignalingClientEvent> {
        self.rx.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.observers.remove(self.id);
    }
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<SignalingClientEvent>,
}

impl SignalingClientObserver for ChannelObserver {
    fn handle_signaling_client_event(&self, event: &SignalingClientEvent) {
        let _ = self.tx.send(event.clone());
    }
}

async fn dispatch(
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
    observers: Arc<ObserverSet<dyn SignalingClientObserver>>,
    compression: Arc<Compression>,
) {
    let codec = FrameCodec::new();
    while let Some(ConnectionEvent {
        connection_id,
        event,
    }) = events.recv().await
    {
        let signaling_event = match event {
            TransportEvent::Connecting => SignalingClientEvent::new(
                SignalingClientEventType::WebSocketConnecting,
                connection_id,
            ),
            TransportEvent::Open => {
                SignalingClientEvent::new(SignalingClientEventType::WebSocketOpen, connection_id)
            }
            TransportEvent::Message(data) => match codec.decode(&data) {
                Ok(frame) => {
                    debug!("{} received {}", connection_id, frame.frame_type());
                    if let SignalFrame::JoinAck(ack) = &frame {
                        compression.on_join_ack(connection_id, ack.wants_compressed_sdp);
                    }
                    SignalingClientEvent::received(connection_id, frame)
                }
                Err(e) => {
                    warn!("{} dropped undecodable message: {}", connection_id, e);
                    SignalingClientEvent {
                        reason: Some(e.to_string()),
                        ..SignalingClientEvent::new(
                            SignalingClientEventType::ProtocolDecodeFailure,
                            connection_id,
                        )
                    }
                }
            },
            TransportEvent::Closing => {
                SignalingClientEvent::new(SignalingClientEventType::WebSocketClosing, connection_id)
            }
            TransportEvent::Failed(reason) => SignalingClientEvent {
                reason: Some(reason),
                ..SignalingClientEvent::new(SignalingClientEventType::WebSocketFailed, connection_id)
            },
            TransportEvent::Closed { code, reason } => SignalingClientEvent {
                close_code: Some(code),
                reason: Some(reason),
                ..SignalingClientEvent::new(SignalingClientEventType::WebSocketClosed, connection_id)
            },
        };
        observers.for_each(|o| o.handle_signaling_client_event(&signaling_event));
    }
    debug!("Signaling dispatch finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{DataMessagePayload, JoinAckFrame, PingPongKind, SubscribeAckFrame};
    use confab_transport::memory::{MemoryConnector, MemoryListener, MemoryServerConnection};

    const SDP: &str = "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
                       m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=rtpmap:96 VP8/90000\r\n";

    fn client() -> (SignalingClient, MemoryListener) {
        let (connector, listener) = MemoryConnector::new();
        (
            SignalingClient::new(Arc::new(connector), TransportConfig::default()),
            listener,
        )
    }

    fn request() -> SignalingConnectionRequest {
        SignalingConnectionRequest::new("wss://signal.example.com/control/m1", "token-123")
    }

    async fn wait_for(
        events: &mut EventSubscription,
        kind: SignalingClientEventType,
    ) -> SignalingClientEvent {
        loop {
            let event = events.recv().await.unwrap();
            if event.kind == kind {
                return event;
            }
        }
    }

    async fn connect(
        client: &SignalingClient,
        listener: &mut MemoryListener,
    ) -> (ConnectionId, MemoryServerConnection, EventSubscription) {
        let mut events = client.subscribe_events();
        let id = client.open_connection(&request()).unwrap();
        let server = listener.accept().await.unwrap();
        wait_for(&mut events, SignalingClientEventType::WebSocketOpen).await;
        (id, server, events)
    }

    async fn server_recv(server: &mut MemoryServerConnection) -> SignalFrame {
        let data = server.recv_binary().await.unwrap();
        FrameCodec::new().decode(&data).unwrap()
    }

    #[test]
    fn test_request_url() {
        let url = request().url().unwrap();
        assert_eq!(url.scheme(), "wss");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("protocol_version".into(), PROTOCOL_VERSION.to_string())));
        assert!(query.contains(&("join_token".into(), "token-123".into())));

        let bad = SignalingConnectionRequest::new("https://signal.example.com", "t");
        assert!(matches!(bad.url(), Err(SignalingError::InvalidUrl(_))));
        let garbage = SignalingConnectionRequest::new("not a url", "t");
        assert!(matches!(garbage.url(), Err(SignalingError::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_data_message() {
        let ok = DataMessageFrame {
            messages: vec![DataMessagePayload {
                topic: "chat_room-1".into(),
                data: vec![0; MAX_DATA_MESSAGE_BYTES],
                lifetime_ms: 1000,
                ..Default::default()
            }],
        };
        assert!(validate_data_message(&ok).is_ok());

        let mut bad_topic = ok.clone();
        bad_topic.messages[0].topic = "chat room".into();
        assert!(validate_data_message(&bad_topic).is_err());

        let mut long_topic = ok.clone();
        long_topic.messages[0].topic = "a".repeat(MAX_DATA_MESSAGE_TOPIC_LEN + 1);
        assert!(validate_data_message(&long_topic).is_err());

        let mut big = ok.clone();
        big.messages[0].data.push(0);
        assert!(validate_data_message(&big).is_err());

        let mut long_lived = ok;
        long_lived.messages[0].lifetime_ms = MAX_DATA_MESSAGE_LIFETIME_MS + 1;
        assert!(validate_data_message(&long_lived).is_err());
    }

    #[tokio::test]
    async fn test_join_sends_frame_with_flags() {
        let (client, mut listener) = client();
        let (_, mut server, _events) = connect(&client, &mut listener).await;
        assert!(client.ready());
        assert!(server.url().contains("join_token=token-123"));

        client.join(&JoinSettings::default()).unwrap();
        let SignalFrame::Join(join) = server_recv(&mut server).await else {
            panic!("expected Join");
        };
        assert_eq!(join.protocol_version, PROTOCOL_VERSION);
        assert_ne!(join.flags & join_flags::COMPRESSED_SDP, 0);
        assert_ne!(join.flags & join_flags::HAS_STREAM_UPDATE, 0);
        assert_eq!(join.client_details.unwrap().sdk_name, "confab");
    }

    #[tokio::test]
    async fn test_remote_video_update_frame() {
        let (client, mut listener) = client();
        let (_, mut server, _events) = connect(&client, &mut listener).await;

        let added = vec![
            VideoSubscriptionConfiguration {
                mid: "3".into(),
                attendee_id: "alice".into(),
                stream_id: 11,
                priority: 5,
                target_bitrate_kbps: 600,
                group_id: 1,
            },
            VideoSubscriptionConfiguration {
                mid: "4".into(),
                attendee_id: "bob".into(),
                stream_id: 21,
                priority: 2,
                target_bitrate_kbps: 300,
                group_id: 2,
            },
        ];
        client
            .remote_video_update(added.clone(), vec!["1".into(), "2".into()])
            .unwrap();

        let SignalFrame::RemoteVideoUpdate(update) = server_recv(&mut server).await else {
            panic!("expected RemoteVideoUpdate");
        };
        assert_eq!(update.added_or_updated, added);
        assert_eq!(update.removed_mids, vec!["1", "2"]);

        client.close_connection();
        assert!(matches!(
            client.remote_video_update(Vec::new(), vec!["3".into()]),
            Err(SignalingError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_received_frames_reach_observers() {
        let (client, mut listener) = client();
        let (id, server, mut events) = connect(&client, &mut listener).await;

        let ack = SignalFrame::SubscribeAck(SubscribeAckFrame {
            sdp_answer: SDP.into(),
            ..Default::default()
        });
        server.send(FrameCodec::new().encode(&ack).unwrap()).unwrap();

        let event = wait_for(&mut events, SignalingClientEventType::ReceivedSignalFrame).await;
        assert_eq!(event.connection_id, id);
        assert_eq!(event.frame, Some(ack));
    }

    #[tokio::test]
    async fn test_decode_failure_is_reported_and_dropped() {
        let (client, mut listener) = client();
        let (_, server, mut events) = connect(&client, &mut listener).await;

        server.send(vec![0x7F, 0x00]).unwrap();
        let event = wait_for(&mut events, SignalingClientEventType::ProtocolDecodeFailure).await;
        assert!(event.frame.is_none());
        assert!(event.reason.unwrap().contains("unknown frame type"));

        // The socket survives a bad frame.
        assert!(client.ready());
    }

    #[tokio::test]
    async fn test_sdp_compression_negotiated_by_join_ack() {
        let (client, mut listener) = client();
        let (_, mut server, mut events) = connect(&client, &mut listener).await;

        client.join(&JoinSettings::default()).unwrap();
        server_recv(&mut server).await;
        assert!(!client.sdp_compression_enabled());

        let ack = SignalFrame::JoinAck(JoinAckFrame {
            wants_compressed_sdp: true,
            ..Default::default()
        });
        server.send(FrameCodec::new().encode(&ack).unwrap()).unwrap();
        wait_for(&mut events, SignalingClientEventType::ReceivedSignalFrame).await;
        assert!(client.sdp_compression_enabled());

        client
            .subscribe(&SubscribeSettings {
                sdp_offer: SDP.into(),
                ..Default::default()
            })
            .unwrap();
        let raw = server.recv_binary().await.unwrap();
        let needle = b"a=rtpmap:96 VP8/90000";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
        let SignalFrame::Subscribe(subscribe) = FrameCodec::new().decode(&raw).unwrap() else {
            panic!("expected Subscribe");
        };
        assert_eq!(subscribe.sdp_offer, SDP);

        // A new socket starts uncompressed.
        client.open_connection(&request()).unwrap();
        assert!(!client.sdp_compression_enabled());
    }

    #[tokio::test]
    async fn test_compression_requires_local_offer() {
        let (client, mut listener) = client();
        let (_, mut server, mut events) = connect(&client, &mut listener).await;

        let settings = JoinSettings {
            sdp_compression: false,
            ..Default::default()
        };
        client.join(&settings).unwrap();
        let SignalFrame::Join(join) = server_recv(&mut server).await else {
            panic!("expected Join");
        };
        assert_eq!(join.flags & join_flags::COMPRESSED_SDP, 0);

        let ack = SignalFrame::JoinAck(JoinAckFrame {
            wants_compressed_sdp: true,
            ..Default::default()
        });
        server.send(FrameCodec::new().encode(&ack).unwrap()).unwrap();
        wait_for(&mut events, SignalingClientEventType::ReceivedSignalFrame).await;
        assert!(!client.sdp_compression_enabled());
    }

    #[tokio::test]
    async fn test_send_without_connection_fails() {
        let (client, _listener) = client();
        assert!(matches!(client.leave(), Err(SignalingError::NotConnected)));
        assert!(!client.ready());
    }

    #[tokio::test]
    async fn test_ping_pong_returns_timestamp() {
        let (client, mut listener) = client();
        let (_, mut server, _events) = connect(&client, &mut listener).await;

        let before = now_ms();
        let sent = client
            .ping_pong(PingPongFrame {
                kind: PingPongKind::Ping as i32,
                ping_id: 7,
            })
            .unwrap();
        assert!(sent >= before);
        let SignalFrame::PingPong(ping) = server_recv(&mut server).await else {
            panic!("expected PingPong");
        };
        assert_eq!(ping.ping_id, 7);
    }

    #[tokio::test]
    async fn test_pause_resume_and_data_message() {
        let (client, mut listener) = client();
        let (_, mut server, _events) = connect(&client, &mut listener).await;

        client.pause(&VideoStreamIdSet::from([3, 1])).unwrap();
        client.resume(&VideoStreamIdSet::from([1])).unwrap();
        let bad = DataMessageFrame {
            messages: vec![DataMessagePayload {
                topic: String::new(),
                ..Default::default()
            }],
        };
        assert!(client.send_data_message(bad).is_err());
        client.mute(true).unwrap();

        assert_eq!(
            server_recv(&mut server).await,
            SignalFrame::Pause(PauseResumeFrame {
                stream_ids: vec![1, 3],
                group_ids: vec![],
            })
        );
        assert!(matches!(server_recv(&mut server).await, SignalFrame::Resume(_)));
        // The invalid data message never reached the socket.
        assert_eq!(
            server_recv(&mut server).await,
            SignalFrame::Mute(MuteFrame { muted: true })
        );
    }

    #[tokio::test]
    async fn test_subscription_unregisters_on_drop() {
        let (client, _listener) = client();
        assert_eq!(client.observer_count(), 0);
        let subscription = client.subscribe_events();
        assert_eq!(client.observer_count(), 1);
        drop(subscription);
        assert_eq!(client.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_close_reports_closing_and_closed() {
        let (client, mut listener) = client();
        let (id, mut server, mut events) = connect(&client, &mut listener).await;

        client.close_connection();
        wait_for(&mut events, SignalingClientEventType::WebSocketClosing).await;
        assert!(matches!(server.recv().await, Some(confab_transport::SocketMessage::Closed { .. })));
        server.close(confab_transport::CLOSE_NORMAL, "bye");

        let closed = wait_for(&mut events, SignalingClientEventType::WebSocketClosed).await;
        assert_eq!(closed.connection_id, id);
        assert!(closed.is_connection_terminal());
        assert!(!client.ready());
    }
}

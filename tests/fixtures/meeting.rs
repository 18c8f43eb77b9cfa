//! Scripted meeting server fixture
//!
//! Runs a [`SessionController`] against the in-memory WebSocket connector
//! and lets the test play the signaling server:
//!
//! ```ignore
//! use confab_integration_tests::fixtures::{MeetingFixture, index, video};
//!
//! #[tokio::test]
//! async fn test_join() {
//!     let mut fixture = MeetingFixture::new(Default::default());
//!     fixture.controller.start();
//!     let mut server = fixture.accept().await;
//!     let subscribe = server.serve_join(index(vec![video(1, 1, "alice", 300)])).await;
//!     assert_eq!(subscribe.receive_stream_ids, vec![1]);
//! }
//! ```

use confab_core::health::HealthStatus;
use confab_core::messages::{
    DataMessagePayload, IndexFrame, JoinAckFrame, JoinFrame, StreamDescriptor, SubscribeAckFrame,
    SubscribeFrame,
};
use confab_core::session::{LoopbackPeerFactory, PeerConnectionFactory};
use confab_core::{
    FrameCodec, JoinDescriptor, RemoteVideoSource, SessionConfig, SessionController,
    SessionObserver, SessionPhase, SessionStatusCode, SignalFrame, VideoStreamIdSet,
};
use confab_transport::WebSocketConnector;
use confab_transport::memory::{MemoryConnector, MemoryListener, MemoryServerConnection};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answer SDP accepted by the loopback peer
pub const SDP_ANSWER: &str = "v=0\r\no=- 77 1 IN IP4 10.0.0.1\r\ns=-\r\nt=0 0\r\n";

/// How long fixture waits may take before the test fails
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Descriptor for attendee `me` in meeting `m`
#[must_use]
pub fn descriptor() -> JoinDescriptor {
    let mut descriptor = JoinDescriptor::default();
    descriptor.meeting.meeting_id = "m".into();
    descriptor.meeting.media_placement.signaling_url = "wss://signal.example.com/control".into();
    descriptor.meeting.media_placement.audio_host_url = "audio.example.com:3478".into();
    descriptor.attendee.attendee_id = "me".into();
    descriptor.attendee.external_user_id = "me@example.com".into();
    descriptor.attendee.join_token = "token".into();
    descriptor
}

/// One simulcast layer published by `attendee`
#[must_use]
pub fn video(stream_id: u32, group_id: u32, attendee: &str, kbps: u32) -> StreamDescriptor {
    StreamDescriptor {
        stream_id,
        group_id,
        max_bitrate_kbps: kbps,
        attendee_id: attendee.into(),
        external_user_id: format!("{attendee}@example.com"),
        ..Default::default()
    }
}

/// Index listing `sources`, with one participant per distinct attendee plus us
#[must_use]
pub fn index(sources: Vec<StreamDescriptor>) -> IndexFrame {
    let mut attendees: Vec<&str> = sources.iter().map(|s| s.attendee_id.as_str()).collect();
    attendees.sort_unstable();
    attendees.dedup();
    IndexFrame {
        num_participants: attendees.len() as u32 + 1,
        sources,
        ..Default::default()
    }
}

/// Session event captured by [`EventRecorder`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    /// `session_connecting`
    Connecting(bool),
    /// `session_started`
    Started(bool),
    /// `session_stopped`
    Stopped(SessionStatusCode),
    /// `video_subscriptions_changed`
    Subscriptions(Vec<u32>),
    /// `remote_video_sources_changed`
    Sources(Vec<String>),
    /// `data_message_received`
    Data(String, Vec<u8>),
    /// `primary_meeting_promotion`
    Promotion(SessionStatusCode),
    /// `connection_health_changed`
    Health(HealthStatus),
}

/// Observer that records every session callback
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl EventRecorder {
    /// Everything recorded so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of recorded events matching `predicate`
    pub fn count(&self, predicate: impl Fn(&RecordedEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    /// Wait until an event matching `predicate` was recorded
    pub async fn wait_for(&self, predicate: impl Fn(&RecordedEvent) -> bool) {
        tokio::time::timeout(STEP_TIMEOUT, async {
            while self.count(&predicate) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("expected session event was not recorded");
    }

    fn push(&self, event: RecordedEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl SessionObserver for EventRecorder {
    fn session_connecting(&self, reconnecting: bool) {
        self.push(RecordedEvent::Connecting(reconnecting));
    }

    fn session_started(&self, reconnecting: bool) {
        self.push(RecordedEvent::Started(reconnecting));
    }

    fn session_stopped(&self, status: SessionStatusCode) {
        self.push(RecordedEvent::Stopped(status));
    }

    fn video_subscriptions_changed(&self, subscribed: &VideoStreamIdSet) {
        self.push(RecordedEvent::Subscriptions(subscribed.to_vec()));
    }

    fn remote_video_sources_changed(&self, sources: &[RemoteVideoSource]) {
        self.push(RecordedEvent::Sources(
            sources.iter().map(|s| s.attendee_id.clone()).collect(),
        ));
    }

    fn data_message_received(&self, message: &DataMessagePayload) {
        self.push(RecordedEvent::Data(
            message.topic.clone(),
            message.data.clone(),
        ));
    }

    fn primary_meeting_promotion(&self, status: SessionStatusCode) {
        self.push(RecordedEvent::Promotion(status));
    }

    fn connection_health_changed(&self, status: HealthStatus) {
        self.push(RecordedEvent::Health(status));
    }
}

/// A session wired to an in-memory server
pub struct MeetingFixture {
    /// Session under test
    pub controller: SessionController,
    /// Client side of the in-memory transport
    pub connector: Arc<MemoryConnector>,
    /// Peer connections created by the session
    pub peers: Arc<LoopbackPeerFactory>,
    /// Recorded session callbacks
    pub recorder: Arc<EventRecorder>,
    listener: MemoryListener,
}

impl MeetingFixture {
    /// Create a session for [`descriptor`]; must run inside a tokio runtime
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let (connector, listener) = MemoryConnector::new();
        let connector = Arc::new(connector);
        let peers = Arc::new(LoopbackPeerFactory::new());
        let controller = SessionController::new(
            config,
            descriptor(),
            Arc::clone(&connector) as Arc<dyn WebSocketConnector>,
            Arc::clone(&peers) as Arc<dyn PeerConnectionFactory>,
        );
        let recorder = Arc::new(EventRecorder::default());
        controller.add_observer(Arc::clone(&recorder) as Arc<dyn SessionObserver>);
        Self {
            controller,
            connector,
            peers,
            recorder,
            listener,
        }
    }

    /// Next socket the session opens
    pub async fn accept(&mut self) -> ServerConnection {
        let inner = tokio::time::timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .expect("session did not connect")
            .expect("connector dropped");
        tracing::debug!("Fixture accepted socket to {}", inner.url());
        ServerConnection {
            inner,
            codec: FrameCodec::new(),
        }
    }

    /// Wait until the session reaches `phase`
    pub async fn wait_for_phase(&self, phase: SessionPhase) {
        let mut status = self.controller.watch_status();
        tokio::time::timeout(STEP_TIMEOUT, status.wait_for(|p| *p == phase))
            .await
            .expect("phase not reached")
            .expect("session dropped");
    }

    /// Join, reach `Connected` and return the server end
    pub async fn connect(&mut self, frame: IndexFrame) -> (ServerConnection, SubscribeFrame) {
        self.controller.start();
        let mut server = self.accept().await;
        let subscribe = server.serve_join(frame).await;
        self.wait_for_phase(SessionPhase::Connected).await;
        (server, subscribe)
    }
}

/// Server end of one signaling socket
pub struct ServerConnection {
    inner: MemoryServerConnection,
    codec: FrameCodec,
}

impl ServerConnection {
    /// URL the client connected to
    #[must_use]
    pub fn url(&self) -> &str {
        self.inner.url()
    }

    /// Send a frame to the client
    pub fn send(&self, frame: SignalFrame) {
        let bytes = self.codec.encode(&frame).unwrap();
        self.inner.send(bytes).unwrap();
    }

    /// Next frame from the client; `None` once the socket closed
    pub async fn recv(&mut self) -> Option<SignalFrame> {
        let bytes = tokio::time::timeout(STEP_TIMEOUT, self.inner.recv_binary())
            .await
            .expect("client went quiet")?;
        Some(self.codec.decode(&bytes).unwrap())
    }

    /// Next frame accepted by `select`, skipping keep-alive traffic and
    /// anything else `select` rejects
    pub async fn expect<T>(&mut self, mut select: impl FnMut(SignalFrame) -> Option<T>) -> T {
        loop {
            let frame = self.recv().await.expect("socket closed");
            if let Some(found) = select(frame) {
                return found;
            }
        }
    }

    /// Wait for Join
    pub async fn expect_join(&mut self) -> JoinFrame {
        self.expect(|f| match f {
            SignalFrame::Join(join) => Some(join),
            _ => None,
        })
        .await
    }

    /// Wait for Subscribe and acknowledge it
    pub async fn answer_subscribe(&mut self) -> SubscribeFrame {
        let subscribe = self
            .expect(|f| match f {
                SignalFrame::Subscribe(subscribe) => Some(subscribe),
                _ => None,
            })
            .await;
        self.send(SignalFrame::SubscribeAck(SubscribeAckFrame {
            sdp_answer: SDP_ANSWER.into(),
            ..Default::default()
        }));
        subscribe
    }

    /// Answer Join with JoinAck and `frame`, then answer the first Subscribe
    pub async fn serve_join(&mut self, frame: IndexFrame) -> SubscribeFrame {
        self.expect_join().await;
        self.send(SignalFrame::JoinAck(JoinAckFrame::default()));
        self.send(SignalFrame::Index(frame));
        self.answer_subscribe().await
    }

    /// Close the socket from the server side
    pub fn close(&self, code: u16, reason: &str) {
        self.inner.close(code, reason);
    }
}

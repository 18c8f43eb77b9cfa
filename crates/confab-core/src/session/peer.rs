//! Peer connection abstraction.
//!
//! The media stack is not part of this crate. Sessions drive it through the
//! [`PeerConnection`] trait; [`LoopbackPeerConnection`] is a deterministic
//! implementation without media, used by tests and by the CLI.

use crate::error::NegotiationError;
use crate::policy::EncodingParams;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// ICE connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    /// Not started
    New,
    /// Checking candidate pairs
    Checking,
    /// A pair works
    Connected,
    /// Checking finished
    Completed,
    /// Connectivity lost, may recover
    Disconnected,
    /// Connectivity failed
    Failed,
    /// Peer connection closed
    Closed,
}

impl IceConnectionState {
    /// Media can flow
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Completed)
    }

    /// No recovery possible
    #[must_use]
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

/// ICE candidate gathering state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceGatheringState {
    /// Not started
    New,
    /// Gathering
    Gathering,
    /// All candidates gathered
    Complete,
}

/// What the local offer should contain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferRequest {
    /// Send local audio
    pub send_audio: bool,
    /// Send local video
    pub send_video: bool,
    /// Number of remote videos to receive
    pub receive_videos: usize,
    /// Send encodings for local video
    pub encodings: Vec<EncodingParams>,
}

/// WebRTC peer connection as seen by the negotiation tasks
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Generation assigned by the factory; increases with every replacement
    fn generation(&self) -> u64;

    /// Create an SDP offer
    async fn create_offer(&self, request: &OfferRequest) -> Result<String, NegotiationError>;

    /// Apply the local offer; starts ICE gathering
    async fn set_local_description(&self, sdp: &str) -> Result<(), NegotiationError>;

    /// Apply the server's answer
    async fn set_remote_description(&self, sdp: &str) -> Result<(), NegotiationError>;

    /// Local description including gathered candidates
    fn local_description(&self) -> Option<String>;

    /// Gathered ICE candidates
    fn ice_candidates(&self) -> Vec<String>;

    /// Watch the gathering state
    fn ice_gathering_state(&self) -> watch::Receiver<IceGatheringState>;

    /// Watch the connection state
    fn ice_connection_state(&self) -> watch::Receiver<IceConnectionState>;

    /// Change send encodings without renegotiating
    fn set_send_encodings(&self, encodings: &[EncodingParams]) -> Result<(), NegotiationError>;

    /// Close the peer connection
    fn close(&self);
}

/// Creates peer connections
pub trait PeerConnectionFactory: Send + Sync {
    /// Create the peer connection of the given generation
    fn create_peer_connection(
        &self,
        generation: u64,
    ) -> Result<Arc<dyn PeerConnection>, NegotiationError>;
}

/// How a loopback peer's ICE behaves once an answer is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopbackIceBehavior {
    /// Connect immediately
    #[default]
    Connect,
    /// Fail immediately
    Fail,
    /// Stay in `Checking`
    Stall,
}

#[derive(Debug, Default)]
struct LoopbackState {
    offers_created: u32,
    local_description: Option<String>,
    remote_description: Option<String>,
    candidates: Vec<String>,
    encodings: Vec<EncodingParams>,
    closed: bool,
}

/// Peer connection without media
pub struct LoopbackPeerConnection {
    generation: u64,
    behavior: LoopbackIceBehavior,
    state: Mutex<LoopbackState>,
    gathering: watch::Sender<IceGatheringState>,
    ice: watch::Sender<IceConnectionState>,
}

impl LoopbackPeerConnection {
    /// Create a peer
    #[must_use]
    pub fn new(generation: u64, behavior: LoopbackIceBehavior) -> Self {
        Self {
            generation,
            behavior,
            state: Mutex::new(LoopbackState::default()),
            gathering: watch::Sender::new(IceGatheringState::New),
            ice: watch::Sender::new(IceConnectionState::New),
        }
    }

    /// Last applied answer
    #[must_use]
    pub fn remote_description(&self) -> Option<String> {
        self.lock().remote_description.clone()
    }

    /// Current send encodings
    #[must_use]
    pub fn send_encodings(&self) -> Vec<EncodingParams> {
        self.lock().encodings.clone()
    }

    /// Number of offers created
    #[must_use]
    pub fn offers_created(&self) -> u32 {
        self.lock().offers_created
    }

    /// Whether [`PeerConnection::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Force the ICE connection state
    pub fn set_ice_state(&self, state: IceConnectionState) {
        self.ice.send_replace(state);
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), NegotiationError> {
        if self.lock().closed {
            Err(NegotiationError::Peer("peer connection is closed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PeerConnection for LoopbackPeerConnection {
    fn generation(&self) -> u64 {
        self.generation
    }

    async fn create_offer(&self, request: &OfferRequest) -> Result<String, NegotiationError> {
        self.ensure_open()?;
        let mut state = self.lock();
        state.offers_created += 1;
        state.encodings.clone_from(&request.encodings);
        Ok(build_offer(self.generation, state.offers_created, request))
    }

    async fn set_local_description(&self, sdp: &str) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.gathering.send_replace(IceGatheringState::Gathering);
        {
            let mut state = self.lock();
            let port = 50000 + (self.generation % 10000);
            state.candidates = vec![format!(
                "candidate:1 1 udp 2122260223 127.0.0.1 {port} typ host"
            )];
            let mut local = sdp.to_string();
            for candidate in &state.candidates {
                let _ = write!(local, "a={candidate}\r\n");
            }
            state.local_description = Some(local);
        }
        self.gathering.send_replace(IceGatheringState::Complete);
        Ok(())
    }

    async fn set_remote_description(&self, sdp: &str) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        if !sdp.starts_with("v=0") {
            return Err(NegotiationError::Peer("answer is not an SDP".into()));
        }
        self.lock().remote_description = Some(sdp.to_string());
        if self.ice.borrow().is_connected() {
            return Ok(());
        }
        let next = match self.behavior {
            LoopbackIceBehavior::Connect => IceConnectionState::Connected,
            LoopbackIceBehavior::Fail => IceConnectionState::Failed,
            LoopbackIceBehavior::Stall => IceConnectionState::Checking,
        };
        debug!("Loopback peer {} ICE -> {:?}", self.generation, next);
        self.ice.send_replace(next);
        Ok(())
    }

    fn local_description(&self) -> Option<String> {
        self.lock().local_description.clone()
    }

    fn ice_candidates(&self) -> Vec<String> {
        self.lock().candidates.clone()
    }

    fn ice_gathering_state(&self) -> watch::Receiver<IceGatheringState> {
        self.gathering.subscribe()
    }

    fn ice_connection_state(&self) -> watch::Receiver<IceConnectionState> {
        self.ice.subscribe()
    }

    fn set_send_encodings(&self, encodings: &[EncodingParams]) -> Result<(), NegotiationError> {
        self.ensure_open()?;
        self.lock().encodings = encodings.to_vec();
        Ok(())
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ice.send_replace(IceConnectionState::Closed);
    }
}

/// Factory producing [`LoopbackPeerConnection`]s and remembering them
#[derive(Default)]
pub struct LoopbackPeerFactory {
    behavior: Mutex<LoopbackIceBehavior>,
    created: Mutex<Vec<Arc<LoopbackPeerConnection>>>,
}

impl LoopbackPeerFactory {
    /// Factory whose peers connect immediately
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose peers behave as given
    #[must_use]
    pub fn with_behavior(behavior: LoopbackIceBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Change the behavior of peers created from now on
    pub fn set_behavior(&self, behavior: LoopbackIceBehavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    /// Every peer created so far, oldest first
    #[must_use]
    pub fn peers(&self) -> Vec<Arc<LoopbackPeerConnection>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recently created peer
    #[must_use]
    pub fn last_peer(&self) -> Option<Arc<LoopbackPeerConnection>> {
        self.peers().pop()
    }
}

impl PeerConnectionFactory for LoopbackPeerFactory {
    fn create_peer_connection(
        &self,
        generation: u64,
    ) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        let behavior = *self.behavior.lock().unwrap_or_else(PoisonError::into_inner);
        let peer = Arc::new(LoopbackPeerConnection::new(generation, behavior));
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&peer));
        Ok(peer)
    }
}

fn build_offer(generation: u64, version: u32, request: &OfferRequest) -> String {
    let mut sdp = String::new();
    let _ = write!(
        sdp,
        "v=0\r\no=- {generation} {version} IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n"
    );
    let mut mid = 0;

    let audio_direction = if request.send_audio { "sendrecv" } else { "recvonly" };
    let _ = write!(
        sdp,
        "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=mid:{mid}\r\na={audio_direction}\r\n\
         a=rtpmap:111 opus/48000/2\r\n"
    );
    mid += 1;

    if request.send_video {
        let _ = write!(
            sdp,
            "m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=mid:{mid}\r\na=sendonly\r\n\
             a=rtpmap:96 VP8/90000\r\n"
        );
        let rids: Vec<&str> = request
            .encodings
            .iter()
            .filter(|e| e.active)
            .map(|e| e.rid.as_str())
            .collect();
        for rid in &rids {
            let _ = write!(sdp, "a=rid:{rid} send\r\n");
        }
        if rids.len() > 1 {
            let _ = write!(sdp, "a=simulcast:send {}\r\n", rids.join(";"));
        }
        mid += 1;
    }

    for _ in 0..request.receive_videos {
        let _ = write!(
            sdp,
            "m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=mid:{mid}\r\na=recvonly\r\n\
             a=rtpmap:96 VP8/90000\r\n"
        );
        mid += 1;
    }
    sdp
}

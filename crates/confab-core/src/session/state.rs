//! Negotiation state shared by the session tasks.

use super::config::SessionConfig;
use super::credentials::JoinDescriptor;
use super::peer::{OfferRequest, PeerConnection, PeerConnectionFactory};
use crate::error::NegotiationError;
use crate::health::ConnectionHealthData;
use crate::messages::{JoinAckFrame, StreamDirection};
use crate::policy::{ClientMetrics, DownlinkPolicy, UplinkPolicy};
use crate::reconnect::ReconnectController;
use crate::signaling::{SignalingClient, SubscribeSettings};
use crate::stream_id_set::VideoStreamIdSet;
use crate::stream_index::VideoStreamIndex;
use confab_transport::ConnectionId;
use std::sync::Arc;
use tokio::time::Instant;

/// Everything one session knows about its negotiation.
///
/// Owned by the session actor and lent to one task at a time. Fields that
/// belong to a particular signaling connection are cleared by
/// [`Self::reset_connection_specific_state`]; configuration, policies, local
/// media flags and the reconnect controller survive reconnects.
pub struct SessionNegotiationState {
    /// Configuration
    pub config: SessionConfig,
    /// Meeting and attendee
    pub descriptor: JoinDescriptor,
    /// Signaling client
    pub signaling: SignalingClient,
    /// Creates peer connections
    pub peer_factory: Arc<dyn PeerConnectionFactory>,

    /// Socket the session currently talks over
    pub connection_id: Option<ConnectionId>,
    /// JoinAck of the current connection
    pub join_ack: Option<JoinAckFrame>,
    /// Active peer connection
    pub peer: Option<Arc<dyn PeerConnection>>,
    /// Generation of the most recently created peer connection
    pub peer_generation: u64,
    /// Peer generation the pending offer was created on
    pub offer_generation: Option<u64>,
    /// Offer of the previous negotiation round
    pub previous_sdp_offer: Option<String>,
    /// Offer of the current negotiation round
    pub sdp_offer: Option<String>,
    /// Answer of the current negotiation round
    pub sdp_answer: Option<String>,
    /// Gathered candidates
    pub ice_candidates: Vec<String>,
    /// Whether ICE has connected on the active peer
    pub ice_connected: bool,

    /// Remote stream index
    pub index: VideoStreamIndex,
    /// Streams the server was last asked to send
    pub subscribed: VideoStreamIdSet,
    /// Streams the next subscribe asks for
    pub desired: VideoStreamIdSet,
    /// Streams paused by the application; survives reconnects
    pub paused: VideoStreamIdSet,

    /// Send local video
    pub local_video_enabled: bool,
    /// Local audio muted
    pub audio_muted: bool,

    /// Receive-side policy
    pub downlink: Box<dyn DownlinkPolicy>,
    /// Send-side policy
    pub uplink: Box<dyn UplinkPolicy>,
    /// Keep-alive counters
    pub health: ConnectionHealthData,
    /// Reconnect backoff
    pub reconnect: ReconnectController,
    /// Latest metrics from the media stack
    pub last_metrics: Option<ClientMetrics>,
}

impl SessionNegotiationState {
    /// Fresh state for a session that has not connected yet
    #[must_use]
    pub fn new(
        config: SessionConfig,
        descriptor: JoinDescriptor,
        signaling: SignalingClient,
        peer_factory: Arc<dyn PeerConnectionFactory>,
    ) -> Self {
        let index = VideoStreamIndex::new(descriptor.attendee.attendee_id.clone());
        Self {
            downlink: config.downlink_policy(),
            uplink: config.uplink_policy(),
            reconnect: ReconnectController::new(config.reconnect.clone()),
            health: ConnectionHealthData::new(Instant::now()),
            config,
            descriptor,
            signaling,
            peer_factory,
            connection_id: None,
            join_ack: None,
            peer: None,
            peer_generation: 0,
            offer_generation: None,
            previous_sdp_offer: None,
            sdp_offer: None,
            sdp_answer: None,
            ice_candidates: Vec::new(),
            ice_connected: false,
            index,
            subscribed: VideoStreamIdSet::new(),
            desired: VideoStreamIdSet::new(),
            paused: VideoStreamIdSet::new(),
            local_video_enabled: false,
            audio_muted: false,
            last_metrics: None,
        }
    }

    /// Local attendee id
    #[must_use]
    pub fn attendee_id(&self) -> &str {
        &self.descriptor.attendee.attendee_id
    }

    /// Forget everything tied to the current connection
    pub fn reset_connection_specific_state(&mut self, now: Instant) {
        self.connection_id = None;
        self.join_ack = None;
        self.close_peer();
        self.offer_generation = None;
        self.previous_sdp_offer = None;
        self.sdp_offer = None;
        self.sdp_answer = None;
        self.ice_candidates.clear();
        self.index = VideoStreamIndex::new(self.descriptor.attendee.attendee_id.clone());
        self.subscribed = VideoStreamIdSet::new();
        self.desired = VideoStreamIdSet::new();
        self.health.reset(now);
    }

    /// Close and drop the active peer connection
    pub fn close_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            peer.close();
        }
        self.ice_connected = false;
    }

    /// Active peer connection
    ///
    /// # Errors
    /// Returns `NegotiationError::MissingState` if none was created
    pub fn require_peer(&self) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        self.peer
            .clone()
            .ok_or(NegotiationError::MissingState("peer connection"))
    }

    /// Recompute the streams to receive, capped by the server's limit
    pub fn refresh_desired_subscriptions(&mut self) -> &VideoStreamIdSet {
        let mut desired = self.downlink.choose_subscriptions(&self.index);
        let limit = self
            .join_ack
            .as_ref()
            .map_or(0, |ack| ack.video_subscription_limit);
        if limit > 0 {
            desired = desired.truncate(limit as usize);
        }
        self.desired = desired;
        &self.desired
    }

    /// What the next offer must contain
    #[must_use]
    pub fn offer_request(&self) -> OfferRequest {
        OfferRequest {
            send_audio: true,
            send_video: self.local_video_enabled,
            receive_videos: self.desired.len(),
            encodings: if self.local_video_enabled {
                self.uplink.encoding_parameters()
            } else {
                Vec::new()
            },
        }
    }

    /// Subscribe parameters for the pending offer
    ///
    /// # Errors
    /// Returns `NegotiationError::MissingState` if no offer was created
    pub fn subscribe_settings(&self) -> Result<SubscribeSettings, NegotiationError> {
        let sdp_offer = self
            .sdp_offer
            .clone()
            .ok_or(NegotiationError::MissingState("SDP offer"))?;
        Ok(SubscribeSettings {
            duplex: if self.local_video_enabled {
                StreamDirection::Duplex
            } else {
                StreamDirection::Rx
            },
            send_streams: Vec::new(),
            receive_stream_ids: self.desired.clone(),
            sdp_offer,
            audio_host: self.descriptor.meeting.media_placement.audio_host_url.clone(),
            audio_muted: self.audio_muted,
            audio_checkin: false,
        })
    }
}

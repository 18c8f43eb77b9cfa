//! Negotiation tasks.
//!
//! Joining runs every task below in order. Renegotiation (subscription
//! change, local video toggle, simulcast layer change) reruns the suffix
//! from [`CreateSdpOfferTask`] on the same connection and peer.

use super::config::SessionConfig;
use super::peer::IceGatheringState;
use super::state::SessionNegotiationState;
use crate::error::{NegotiationError, TaskError};
use crate::frame::SignalFrame;
use crate::messages::JoinAckFrame;
use crate::signaling::{EventSubscription, SignalingClientEventType};
use crate::task::{Task, TaskPipeline, TaskResult, TimeoutTask};
use async_trait::async_trait;
use confab_transport::ConnectionId;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type State = SessionNegotiationState;

fn current_connection(state: &State) -> Result<ConnectionId, NegotiationError> {
    state
        .connection_id
        .ok_or(NegotiationError::MissingState("signaling connection"))
}

/// Wait until `matcher` accepts a frame from `connection_id`.
///
/// Error frames reject the wait; so does the socket failing or closing.
async fn wait_for_frame<T>(
    events: &mut EventSubscription,
    connection_id: ConnectionId,
    mut matcher: impl FnMut(SignalFrame) -> Result<Option<T>, NegotiationError> + Send,
) -> Result<T, NegotiationError> {
    while let Some(event) = events.recv().await {
        if event.connection_id != connection_id {
            continue;
        }
        match event.kind {
            SignalingClientEventType::WebSocketFailed | SignalingClientEventType::WebSocketClosed => {
                return Err(NegotiationError::ConnectionLost(
                    event.reason.unwrap_or_default(),
                ));
            }
            SignalingClientEventType::ReceivedSignalFrame => match event.frame {
                Some(SignalFrame::Error(error)) => {
                    return Err(NegotiationError::ServerRejected {
                        status: error.status,
                        description: error.description,
                    });
                }
                Some(frame) => {
                    if let Some(value) = matcher(frame)? {
                        return Ok(value);
                    }
                }
                None => {}
            },
            _ => {}
        }
    }
    Err(NegotiationError::ConnectionLost(
        "signaling client dropped".into(),
    ))
}

/// Opens the signaling socket and waits until it is usable
pub struct OpenSignalingConnectionTask;

#[async_trait]
impl Task<State> for OpenSignalingConnectionTask {
    fn name(&self) -> &str {
        "OpenSignalingConnection"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        let mut events = state.signaling.subscribe_events();
        let request = state.descriptor.signaling_request();
        let id = state
            .signaling
            .open_connection(&request)
            .map_err(|e| TaskError::failed(self.name(), e))?;
        state.connection_id = Some(id);

        while let Some(event) = events.recv().await {
            if event.connection_id != id {
                continue;
            }
            match event.kind {
                SignalingClientEventType::WebSocketOpen => {
                    state.health.reset(Instant::now());
                    return Ok(());
                }
                SignalingClientEventType::WebSocketFailed
                | SignalingClientEventType::WebSocketClosed => {
                    return Err(TaskError::failed(
                        self.name(),
                        NegotiationError::ConnectionLost(event.reason.unwrap_or_default()),
                    ));
                }
                _ => {}
            }
        }
        Err(TaskError::failed(
            self.name(),
            NegotiationError::ConnectionLost("signaling client dropped".into()),
        ))
    }
}

/// Sends Join and waits for the first Index
pub struct JoinAndReceiveIndexTask;

impl JoinAndReceiveIndexTask {
    async fn join(&self, state: &mut State) -> Result<(), NegotiationError> {
        let id = current_connection(state)?;
        let mut events = state.signaling.subscribe_events();
        state.signaling.join(&state.config.join_settings())?;

        let mut join_ack: Option<JoinAckFrame> = None;
        let index = wait_for_frame(&mut events, id, |frame| match frame {
            SignalFrame::JoinAck(ack) => {
                join_ack = Some(ack);
                Ok(None)
            }
            SignalFrame::AudioStatus(status) if status.audio_status / 100 != 2 => {
                Err(NegotiationError::JoinRejected(status.audio_status))
            }
            SignalFrame::Index(index) => Ok(Some(index)),
            _ => Ok(None),
        })
        .await?;

        if let Some(ack) = &join_ack {
            debug!(
                "JoinAck: subscription limit {}, compressed SDP {}",
                ack.video_subscription_limit, ack.wants_compressed_sdp
            );
        }
        state.join_ack = join_ack;
        state.index.integrate_index_frame(&index);
        state.uplink.update_index(&state.index);
        info!(
            "Joined; index lists {} remote streams",
            state.index.remote_stream_ids().len()
        );
        Ok(())
    }
}

#[async_trait]
impl Task<State> for JoinAndReceiveIndexTask {
    fn name(&self) -> &str {
        "JoinAndReceiveIndex"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        self.join(state)
            .await
            .map_err(|e| TaskError::failed(self.name(), e))
    }
}

/// Replaces the peer connection with a new generation
pub struct CreatePeerConnectionTask;

#[async_trait]
impl Task<State> for CreatePeerConnectionTask {
    fn name(&self) -> &str {
        "CreatePeerConnection"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        state.close_peer();
        state.peer_generation += 1;
        let peer = state
            .peer_factory
            .create_peer_connection(state.peer_generation)
            .map_err(|e| TaskError::failed(self.name(), e))?;
        debug!("Created peer connection generation {}", peer.generation());
        state.peer = Some(peer);
        Ok(())
    }
}

/// Chooses the streams to receive and creates the matching offer
pub struct CreateSdpOfferTask;

impl CreateSdpOfferTask {
    async fn create(state: &mut State) -> Result<(), NegotiationError> {
        let peer = state.require_peer()?;
        state.refresh_desired_subscriptions();
        let request = state.offer_request();
        let offer = peer.create_offer(&request).await?;
        peer.set_local_description(&offer).await?;
        state.previous_sdp_offer = state.sdp_offer.replace(offer);
        state.offer_generation = Some(peer.generation());
        // The offer carries the current encodings.
        let _ = state.uplink.take_update();
        Ok(())
    }
}

#[async_trait]
impl Task<State> for CreateSdpOfferTask {
    fn name(&self) -> &str {
        "CreateSdpOffer"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        Self::create(state)
            .await
            .map_err(|e| TaskError::failed(self.name(), e))
    }
}

/// Waits for candidate gathering and folds the candidates into the offer
pub struct FinishGatheringIceCandidatesTask;

impl FinishGatheringIceCandidatesTask {
    async fn finish(state: &mut State) -> Result<(), NegotiationError> {
        let peer = state.require_peer()?;
        let mut gathering = peer.ice_gathering_state();
        let complete = gathering
            .wait_for(|s| *s == IceGatheringState::Complete)
            .await
            .is_ok();
        if !complete {
            return Err(NegotiationError::Peer("peer connection dropped".into()));
        }

        let candidates = peer.ice_candidates();
        if candidates.is_empty() {
            return Err(NegotiationError::Peer("no ICE candidates gathered".into()));
        }
        debug!("Gathered {} ICE candidates", candidates.len());
        state.ice_candidates = candidates;
        if let Some(local) = peer.local_description() {
            state.sdp_offer = Some(local);
        }
        Ok(())
    }
}

#[async_trait]
impl Task<State> for FinishGatheringIceCandidatesTask {
    fn name(&self) -> &str {
        "FinishGatheringIceCandidates"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        Self::finish(state)
            .await
            .map_err(|e| TaskError::failed(self.name(), e))
    }
}

/// Sends Subscribe and waits for SubscribeAck
pub struct SubscribeAndReceiveSubscribeAckTask;

impl SubscribeAndReceiveSubscribeAckTask {
    async fn subscribe(state: &mut State) -> Result<(), NegotiationError> {
        let id = current_connection(state)?;
        let settings = state.subscribe_settings()?;
        let mut events = state.signaling.subscribe_events();
        state.signaling.subscribe(&settings)?;

        let ack = wait_for_frame(&mut events, id, |frame| match frame {
            SignalFrame::SubscribeAck(ack) => Ok(Some(ack)),
            _ => Ok(None),
        })
        .await?;

        state.index.integrate_subscribe_ack(&ack);
        state.sdp_answer = Some(ack.sdp_answer);
        debug!("Subscribed to {}", settings.receive_stream_ids);
        state.subscribed = settings.receive_stream_ids;
        Ok(())
    }
}

#[async_trait]
impl Task<State> for SubscribeAndReceiveSubscribeAckTask {
    fn name(&self) -> &str {
        "SubscribeAndReceiveSubscribeAck"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        Self::subscribe(state)
            .await
            .map_err(|e| TaskError::failed(self.name(), e))
    }
}

/// Applies the answer to the peer the offer was created on
pub struct SetRemoteDescriptionTask;

impl SetRemoteDescriptionTask {
    async fn apply(state: &mut State) -> Result<(), NegotiationError> {
        let peer = state.require_peer()?;
        if state.offer_generation != Some(peer.generation())
            || peer.generation() != state.peer_generation
        {
            return Err(NegotiationError::StalePeer);
        }
        let answer = state
            .sdp_answer
            .clone()
            .ok_or(NegotiationError::MissingState("SDP answer"))?;
        peer.set_remote_description(&answer).await
    }
}

#[async_trait]
impl Task<State> for SetRemoteDescriptionTask {
    fn name(&self) -> &str {
        "SetRemoteDescription"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        Self::apply(state)
            .await
            .map_err(|e| TaskError::failed(self.name(), e))
    }
}

/// Waits until ICE connects
pub struct WaitForIceConnectedTask;

impl WaitForIceConnectedTask {
    async fn wait(state: &mut State) -> Result<(), NegotiationError> {
        let peer = state.require_peer()?;
        let mut ice = peer.ice_connection_state();
        let settled = ice
            .wait_for(|s| s.is_connected() || s.is_failed())
            .await
            .map(|s| *s);
        match settled {
            Ok(s) if s.is_connected() => {
                state.ice_connected = true;
                Ok(())
            }
            _ => Err(NegotiationError::IceFailed),
        }
    }
}

#[async_trait]
impl Task<State> for WaitForIceConnectedTask {
    fn name(&self) -> &str {
        "WaitForIceConnected"
    }

    async fn run(&mut self, state: &mut State) -> TaskResult {
        Self::wait(state)
            .await
            .map_err(|e| TaskError::failed(self.name(), e))
    }
}

/// Every step from opening the socket to connected media
#[must_use]
pub fn join_pipeline(config: &SessionConfig, token: CancellationToken) -> TaskPipeline<State> {
    TaskPipeline::with_token("join", token)
        .then(OpenSignalingConnectionTask)
        .then(TimeoutTask::new(JoinAndReceiveIndexTask, config.ack_timeout))
        .then(CreatePeerConnectionTask)
        .then(CreateSdpOfferTask)
        .then(TimeoutTask::new(
            FinishGatheringIceCandidatesTask,
            config.ice_gathering_timeout,
        ))
        .then(TimeoutTask::new(
            SubscribeAndReceiveSubscribeAckTask,
            config.ack_timeout,
        ))
        .then(SetRemoteDescriptionTask)
        .then(TimeoutTask::new(
            WaitForIceConnectedTask,
            config.ice_connected_timeout,
        ))
}

/// Offer/answer round on the existing connection and peer
#[must_use]
pub fn renegotiation_pipeline(
    config: &SessionConfig,
    token: CancellationToken,
    wait_for_ice: bool,
) -> TaskPipeline<State> {
    let mut pipeline = TaskPipeline::with_token("renegotiate", token)
        .then(CreateSdpOfferTask)
        .then(TimeoutTask::new(
            FinishGatheringIceCandidatesTask,
            config.ice_gathering_timeout,
        ))
        .then(TimeoutTask::new(
            SubscribeAndReceiveSubscribeAckTask,
            config.ack_timeout,
        ))
        .then(SetRemoteDescriptionTask);
    if wait_for_ice {
        pipeline = pipeline.then(TimeoutTask::new(
            WaitForIceConnectedTask,
            config.ice_connected_timeout,
        ));
    }
    pipeline
}

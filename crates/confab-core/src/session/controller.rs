//! Session controller.
//!
//! A [`SessionController`] owns one meeting session. All negotiation state
//! lives in a single actor task and the public handle only enqueues
//! commands, so server frames and application requests are processed
//! strictly in arrival order. While a pipeline runs, commands and signaling
//! events are deferred and replayed once it finishes; a burst of index
//! updates therefore collapses into a single renegotiation.

use super::config::SessionConfig;
use super::credentials::JoinDescriptor;
use super::observer::SessionObserver;
use super::peer::{IceConnectionState, PeerConnectionFactory};
use super::state::SessionNegotiationState;
use super::status::SessionStatusCode;
use super::tasks::{join_pipeline, renegotiation_pipeline};
use crate::error::SignalingError;
use crate::frame::SignalFrame;
use crate::health::{ConnectionHealthPolicy, HealthAction, HealthStatus};
use crate::messages::{
    DataMessageFrame, DataMessagePayload, MeetingCredentials, PingPongFrame, PingPongKind,
};
use crate::observer::{ObserverId, ObserverSet};
use crate::policy::ClientMetrics;
use crate::preference::VideoPreferences;
use crate::reconnect::{ReconnectController, ReconnectDecision};
use crate::signaling::{
    validate_data_message, SignalingClient, SignalingClientEvent, SignalingClientEventType,
    SignalingClientObserver,
};
use crate::stream_id_set::VideoStreamIdSet;
use crate::stream_index::RemoteVideoSource;
use crate::task::{TaskPipeline, TaskResult};
use confab_transport::WebSocketConnector;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Coarse session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, not started
    Idle,
    /// First connection attempt in progress
    Connecting,
    /// Media connected
    Connected,
    /// Recovering from a failure
    Reconnecting,
    /// Finished with a final status
    Stopped(SessionStatusCode),
}

impl SessionPhase {
    /// Final status, once stopped
    #[must_use]
    pub fn stopped_status(self) -> Option<SessionStatusCode> {
        match self {
            Self::Stopped(status) => Some(status),
            _ => None,
        }
    }
}

enum Command {
    Start,
    Signaling(SignalingClientEvent),
    SetLocalVideo(bool),
    SetVideoPreferences(VideoPreferences),
    UpdateMetrics(ClientMetrics),
    Mute(bool),
    Pause(VideoStreamIdSet),
    Resume(VideoStreamIdSet),
    SendDataMessage(DataMessageFrame),
    Promote(MeetingCredentials),
    Demote,
}

/// Feeds signaling events into the actor's queue
struct ForwardingObserver {
    commands: mpsc::UnboundedSender<Command>,
}

impl SignalingClientObserver for ForwardingObserver {
    fn handle_signaling_client_event(&self, event: &SignalingClientEvent) {
        let _ = self.commands.send(Command::Signaling(event.clone()));
    }
}

/// Handle to a running meeting session.
///
/// Dropping the handle stops the session.
pub struct SessionController {
    commands: mpsc::UnboundedSender<Command>,
    observers: Arc<ObserverSet<dyn SessionObserver>>,
    phase: watch::Receiver<SessionPhase>,
    stop: CancellationToken,
    credentials: MeetingCredentials,
}

impl SessionController {
    /// Create a session; must be called from within a tokio runtime.
    ///
    /// Nothing is sent until [`Self::start`].
    #[must_use]
    pub fn new(
        config: SessionConfig,
        descriptor: JoinDescriptor,
        connector: Arc<dyn WebSocketConnector>,
        peer_factory: Arc<dyn PeerConnectionFactory>,
    ) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase) = watch::channel(SessionPhase::Idle);
        let observers: Arc<ObserverSet<dyn SessionObserver>> = Arc::new(ObserverSet::new());
        let stop = CancellationToken::new();
        let credentials = descriptor.credentials();

        let signaling = SignalingClient::new(connector, config.transport_config());
        let forwarding = signaling.add_observer(Arc::new(ForwardingObserver {
            commands: commands.clone(),
        }));
        let health_policy = ConnectionHealthPolicy::new(config.health.clone());

        let actor = SessionActor {
            state: SessionNegotiationState::new(config, descriptor, signaling, peer_factory),
            commands: commands_rx,
            commands_open: true,
            deferred: VecDeque::new(),
            observers: Arc::clone(&observers),
            phase: phase_tx,
            stop: stop.clone(),
            forwarding,
            health_policy,
            last_health: HealthStatus::Healthy,
            remote_sources: Vec::new(),
            notified_subscriptions: VideoStreamIdSet::new(),
        };
        tokio::spawn(actor.run());

        Self {
            commands,
            observers,
            phase,
            stop,
            credentials,
        }
    }

    /// Register a session observer
    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    /// Unregister a session observer
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Begin connecting
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Leave the meeting and release every resource.
    ///
    /// Returns immediately; [`Self::wait_until_stopped`] resolves once the
    /// session has shut down.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Start or stop sending local video
    pub fn set_local_video(&self, enabled: bool) {
        self.send(Command::SetLocalVideo(enabled));
    }

    /// Replace the application's remote video preferences
    pub fn set_video_preferences(&self, preferences: VideoPreferences) {
        self.send(Command::SetVideoPreferences(preferences));
    }

    /// Feed the latest media-stack metrics to the bandwidth policies
    pub fn update_metrics(&self, metrics: ClientMetrics) {
        self.send(Command::UpdateMetrics(metrics));
    }

    /// Mute or unmute local audio
    pub fn mute(&self, muted: bool) {
        self.send(Command::Mute(muted));
    }

    /// Ask the server to pause remote streams
    pub fn pause(&self, stream_ids: VideoStreamIdSet) {
        self.send(Command::Pause(stream_ids));
    }

    /// Ask the server to resume remote streams
    pub fn resume(&self, stream_ids: VideoStreamIdSet) {
        self.send(Command::Resume(stream_ids));
    }

    /// Broadcast a data message to the meeting
    ///
    /// # Errors
    /// Returns `SignalingError::InvalidDataMessage` if the topic, payload
    /// size or lifetime is out of bounds
    pub fn send_data_message(
        &self,
        topic: &str,
        data: Vec<u8>,
        lifetime_ms: u32,
    ) -> Result<(), SignalingError> {
        let frame = DataMessageFrame {
            messages: vec![DataMessagePayload {
                topic: topic.to_string(),
                data,
                lifetime_ms,
                ..Default::default()
            }],
        };
        validate_data_message(&frame)?;
        self.send(Command::SendDataMessage(frame));
        Ok(())
    }

    /// Promote this attendee into the primary meeting
    ///
    /// Uses the session's own credentials unless others are given. The
    /// answer arrives through [`SessionObserver::primary_meeting_promotion`].
    pub fn promote_to_primary_meeting(&self, credentials: Option<MeetingCredentials>) {
        let credentials = credentials.unwrap_or_else(|| self.credentials.clone());
        self.send(Command::Promote(credentials));
    }

    /// Leave the primary meeting
    pub fn demote_from_primary_meeting(&self) {
        self.send(Command::Demote);
    }

    /// Current phase
    #[must_use]
    pub fn status(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Phase updates
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<SessionPhase> {
        self.phase.clone()
    }

    /// Wait for the session to end and return its final status
    pub async fn wait_until_stopped(&self) -> SessionStatusCode {
        let mut phase = self.phase.clone();
        let stopped = phase
            .wait_for(|p| p.stopped_status().is_some())
            .await
            .ok()
            .and_then(|p| p.stopped_status());
        stopped.unwrap_or(SessionStatusCode::TaskFailed)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Session already finished; command dropped");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Why the connected phase ended
enum SessionEnd {
    Stopped,
    Failed(SessionStatusCode),
}

/// What a processed command requires
enum Handled {
    Nothing,
    Recompute,
    Renegotiate,
    End(SessionEnd),
}

struct SessionActor {
    state: SessionNegotiationState,
    commands: mpsc::UnboundedReceiver<Command>,
    commands_open: bool,
    deferred: VecDeque<Command>,
    observers: Arc<ObserverSet<dyn SessionObserver>>,
    phase: watch::Sender<SessionPhase>,
    stop: CancellationToken,
    forwarding: ObserverId,
    health_policy: ConnectionHealthPolicy,
    last_health: HealthStatus,
    remote_sources: Vec<RemoteVideoSource>,
    notified_subscriptions: VideoStreamIdSet,
}

impl SessionActor {
    async fn run(mut self) {
        let status = if self.wait_for_start().await {
            self.run_session().await
        } else {
            SessionStatusCode::Left
        };
        self.shutdown(status);
    }

    /// Apply configuration commands until started; false if stopped first
    async fn wait_for_start(&mut self) -> bool {
        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => return false,
                command = self.commands.recv() => match command {
                    Some(Command::Start) => return true,
                    Some(command) => {
                        self.handle_command(command);
                    }
                    None => return false,
                },
            }
        }
    }

    async fn run_session(&mut self) -> SessionStatusCode {
        let mut reconnecting = false;
        loop {
            let failure = match self.connect(reconnecting).await {
                Ok(()) => {
                    self.state.reconnect.on_success();
                    info!(
                        "Session connected on {:?}",
                        self.state.connection_id.map(|id| id.as_u64())
                    );
                    self.set_phase(SessionPhase::Connected);
                    self.observers.for_each(|o| o.session_started(reconnecting));
                    self.notify_remote_sources();
                    self.notify_subscriptions();
                    self.restore_paused();

                    match self.run_connected().await {
                        SessionEnd::Stopped => {
                            self.leave().await;
                            return SessionStatusCode::Left;
                        }
                        SessionEnd::Failed(status) => status,
                    }
                }
                Err(e) if e.is_canceled() => return SessionStatusCode::Left,
                Err(e) => {
                    warn!("Connection attempt failed: {}", e);
                    SessionStatusCode::from_task_error(&e)
                }
            };

            if !failure.is_reconnectable() {
                return failure;
            }
            match self.state.reconnect.on_failure(Instant::now()) {
                ReconnectDecision::Retry(wait) => {
                    info!("Reconnecting in {:?} after {}", wait, failure);
                    self.state.signaling.close_connection();
                    self.state.reset_connection_specific_state(Instant::now());
                    self.set_phase(SessionPhase::Reconnecting);
                    if !ReconnectController::wait(wait, &self.stop).await {
                        return SessionStatusCode::Left;
                    }
                    reconnecting = true;
                }
                ReconnectDecision::GiveUp => {
                    warn!("Giving up reconnecting; last failure {}", failure);
                    return failure;
                }
            }
        }
    }

    async fn connect(&mut self, reconnecting: bool) -> TaskResult {
        self.set_phase(if reconnecting {
            SessionPhase::Reconnecting
        } else {
            SessionPhase::Connecting
        });
        self.observers
            .for_each(|o| o.session_connecting(reconnecting));
        let pipeline = join_pipeline(&self.state.config, self.stop.child_token());
        self.run_pipeline(pipeline).await
    }

    /// Run a pipeline, deferring everything that arrives meanwhile
    async fn run_pipeline(
        &mut self,
        mut pipeline: TaskPipeline<SessionNegotiationState>,
    ) -> TaskResult {
        use crate::task::Task;

        let run = pipeline.run(&mut self.state);
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => return result,
                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => self.deferred.push_back(command),
                    None => self.commands_open = false,
                },
            }
        }
    }

    async fn run_connected(&mut self) -> SessionEnd {
        let ping_interval = self.state.config.ping_interval;
        let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ice = self
            .state
            .peer
            .as_ref()
            .map(|peer| peer.ice_connection_state());
        self.last_health = HealthStatus::Healthy;

        if let Some(end) = self.process_deferred().await {
            return end;
        }

        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => return SessionEnd::Stopped,
                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => {
                        self.deferred.push_back(command);
                        while let Ok(command) = self.commands.try_recv() {
                            self.deferred.push_back(command);
                        }
                        if let Some(end) = self.process_deferred().await {
                            return end;
                        }
                    }
                    None => self.commands_open = false,
                },
                state = next_ice_state(&mut ice) => {
                    if state.is_failed() {
                        warn!("ICE connection failed");
                        return SessionEnd::Failed(SessionStatusCode::IceConnectionFailed);
                    }
                    trace!("ICE connection state {:?}", state);
                }
                _ = ping.tick() => {
                    if let Some(end) = self.keepalive() {
                        return end;
                    }
                }
            }
        }
    }

    /// Handle every deferred command, renegotiating until nothing new
    /// arrives during a renegotiation
    async fn process_deferred(&mut self) -> Option<SessionEnd> {
        loop {
            let mut recompute = false;
            let mut force = false;
            while let Some(command) = self.deferred.pop_front() {
                match self.handle_command(command) {
                    Handled::Nothing => {}
                    Handled::Recompute => recompute = true,
                    Handled::Renegotiate => force = true,
                    Handled::End(end) => return Some(end),
                }
            }
            if !recompute && !force {
                return None;
            }
            match self.update_media(force).await {
                Ok(true) => {}
                Ok(false) => return None,
                Err(end) => return Some(end),
            }
        }
    }

    /// Bring encodings and subscriptions in line with the policies.
    ///
    /// Returns whether a renegotiation ran.
    async fn update_media(&mut self, force: bool) -> Result<bool, SessionEnd> {
        let needs_renegotiation = self.apply_uplink_update();
        let desired = self.state.refresh_desired_subscriptions().clone();
        if !force && !needs_renegotiation && desired == self.state.subscribed {
            return Ok(false);
        }

        debug!(
            "Renegotiating: {:?} -> {:?}",
            self.state.subscribed.to_vec(),
            desired.to_vec()
        );
        let pipeline = renegotiation_pipeline(
            &self.state.config,
            self.stop.child_token(),
            !self.state.ice_connected,
        );
        match self.run_pipeline(pipeline).await {
            Ok(()) => {
                self.notify_subscriptions();
                Ok(true)
            }
            Err(e) if e.is_canceled() => Err(SessionEnd::Stopped),
            Err(e) => {
                warn!("Renegotiation failed: {}", e);
                Err(SessionEnd::Failed(SessionStatusCode::from_task_error(&e)))
            }
        }
    }

    /// Push new encodings to the peer; true if they need a new offer
    fn apply_uplink_update(&mut self) -> bool {
        let Some(update) = self.state.uplink.take_update() else {
            return false;
        };
        if !self.state.local_video_enabled {
            return false;
        }
        if update.needs_renegotiation {
            return true;
        }
        if let Some(peer) = &self.state.peer {
            if let Err(e) = peer.set_send_encodings(&update.encodings) {
                warn!("Failed to apply send encodings: {}", e);
            }
        }
        false
    }

    fn handle_command(&mut self, command: Command) -> Handled {
        match command {
            Command::Start => Handled::Nothing,
            Command::Signaling(event) => self.handle_signaling_event(event),
            Command::SetLocalVideo(enabled) => {
                if self.state.local_video_enabled == enabled {
                    return Handled::Nothing;
                }
                info!("Local video {}", if enabled { "on" } else { "off" });
                self.state.local_video_enabled = enabled;
                Handled::Renegotiate
            }
            Command::SetVideoPreferences(preferences) => {
                self.state.downlink.set_video_preferences(preferences);
                Handled::Recompute
            }
            Command::UpdateMetrics(metrics) => {
                self.state.downlink.update_metrics(&metrics);
                self.state.uplink.update_metrics(&metrics);
                self.state.health.record_packet_loss(
                    metrics.packet_loss_percent,
                    self.state.config.health.packet_loss_window,
                );
                self.state.last_metrics = Some(metrics);
                Handled::Recompute
            }
            Command::Mute(muted) => {
                self.state.audio_muted = muted;
                self.send_if_connected("mute", |s| s.mute(muted));
                Handled::Nothing
            }
            Command::Pause(ids) => {
                self.state.paused = self.state.paused.union(&ids);
                self.send_if_connected("pause", |s| s.pause(&ids));
                Handled::Nothing
            }
            Command::Resume(ids) => {
                self.state.paused = self.state.paused.difference(&ids);
                self.send_if_connected("resume", |s| s.resume(&ids));
                Handled::Nothing
            }
            Command::SendDataMessage(frame) => {
                self.send_if_connected("data message", |s| s.send_data_message(frame));
                Handled::Nothing
            }
            Command::Promote(credentials) => {
                self.send_if_connected("primary meeting join", |s| {
                    s.promote_to_primary_meeting(credentials)
                });
                Handled::Nothing
            }
            Command::Demote => {
                self.send_if_connected("primary meeting leave", |s| {
                    s.demote_from_primary_meeting()
                });
                Handled::Nothing
            }
        }
    }

    fn handle_signaling_event(&mut self, event: SignalingClientEvent) -> Handled {
        if Some(event.connection_id) != self.state.connection_id {
            debug!(
                "Discarding {:?} from stale connection {}",
                event.kind,
                event.connection_id.as_u64()
            );
            return Handled::Nothing;
        }

        match event.kind {
            SignalingClientEventType::WebSocketFailed | SignalingClientEventType::WebSocketClosed => {
                warn!(
                    "Signaling connection lost (code {:?}): {}",
                    event.close_code,
                    event.reason.as_deref().unwrap_or("no reason")
                );
                Handled::End(SessionEnd::Failed(
                    SessionStatusCode::SignalingChannelClosedUnexpectedly,
                ))
            }
            SignalingClientEventType::ReceivedSignalFrame => {
                self.state.health.record_good_signal(Instant::now());
                match event.frame {
                    Some(frame) => self.handle_frame(frame),
                    None => Handled::Nothing,
                }
            }
            _ => Handled::Nothing,
        }
    }

    fn handle_frame(&mut self, frame: SignalFrame) -> Handled {
        match frame {
            SignalFrame::Index(index) => {
                if !self.state.index.integrate_index_frame(&index) {
                    return Handled::Nothing;
                }
                self.state.uplink.update_index(&self.state.index);
                self.notify_remote_sources();
                Handled::Recompute
            }
            SignalFrame::Bitrates(bitrates) => {
                if self.state.index.integrate_bitrates_frame(&bitrates) {
                    Handled::Recompute
                } else {
                    Handled::Nothing
                }
            }
            SignalFrame::PingPong(ping) => {
                match ping.kind() {
                    PingPongKind::Pong => {
                        if let Some(rtt) = self.state.health.record_pong(ping.ping_id, Instant::now())
                        {
                            trace!("Pong {} after {:?}", ping.ping_id, rtt);
                        }
                    }
                    PingPongKind::Ping => {
                        let pong = PingPongFrame {
                            kind: PingPongKind::Pong as i32,
                            ping_id: ping.ping_id,
                        };
                        self.send_if_connected("pong", |s| s.ping_pong(pong).map(|_| ()));
                    }
                    PingPongKind::Unspecified => {}
                }
                Handled::Nothing
            }
            SignalFrame::AudioStatus(status) => {
                let code = SessionStatusCode::from_audio_status(status.audio_status);
                if code.is_failure() {
                    warn!("Audio status {} ({})", status.audio_status, code);
                    Handled::End(SessionEnd::Failed(code))
                } else {
                    Handled::Nothing
                }
            }
            SignalFrame::AudioStreamInfo(info) => {
                for stream in &info.streams {
                    self.observers.for_each(|o| o.attendee_audio_changed(stream));
                }
                Handled::Nothing
            }
            SignalFrame::DataMessage(frame) => {
                for message in &frame.messages {
                    self.observers
                        .for_each(|o| o.data_message_received(message));
                }
                Handled::Nothing
            }
            SignalFrame::PrimaryMeetingJoinAck(ack) => {
                let status = SessionStatusCode::from_audio_status(ack.status);
                info!("Primary meeting promotion: {}", status);
                self.observers
                    .for_each(|o| o.primary_meeting_promotion(status));
                Handled::Nothing
            }
            SignalFrame::Error(error) => {
                let code = SessionStatusCode::from_signal_error(error.status);
                warn!("Server error {}: {}", error.status, error.description);
                if code.is_terminal() {
                    Handled::End(SessionEnd::Failed(code))
                } else {
                    Handled::Nothing
                }
            }
            other => {
                trace!("Ignoring {} frame", other.frame_type().name());
                Handled::Nothing
            }
        }
    }

    /// Periodic health check and ping
    fn keepalive(&mut self) -> Option<SessionEnd> {
        let now = Instant::now();
        let status = self.health_policy.status(&self.state.health, now);
        if status != self.last_health {
            debug!("Connection health {:?} -> {:?}", self.last_health, status);
            self.last_health = status;
            self.observers
                .for_each(|o| o.connection_health_changed(status));
        }
        if self.health_policy.evaluate(&self.state.health, now) == HealthAction::Reconnect {
            warn!(
                "Connection unhealthy ({} missed pongs)",
                self.state.health.consecutive_missed_pongs()
            );
            return Some(SessionEnd::Failed(
                SessionStatusCode::ConnectionHealthReconnect,
            ));
        }

        let ping_id = self.state.health.record_ping_sent(now);
        let ping = PingPongFrame {
            kind: PingPongKind::Ping as i32,
            ping_id,
        };
        if let Err(e) = self.state.signaling.ping_pong(ping) {
            debug!("Ping {} not sent: {}", ping_id, e);
        }
        if let Some(metrics) = &self.state.last_metrics {
            if let Err(e) = self.state.signaling.send_client_metrics(metrics.to_frame()) {
                debug!("Metrics not sent: {}", e);
            }
        }
        None
    }

    /// Send Leave and wait briefly for LeaveAck
    async fn leave(&mut self) {
        let Some(id) = self.state.connection_id else {
            return;
        };
        if !self.state.signaling.ready() {
            return;
        }

        let mut events = self.state.signaling.subscribe_events();
        if let Err(e) = self.state.signaling.leave() {
            warn!("Failed to send leave: {}", e);
            return;
        }
        let acked = tokio::time::timeout(self.state.config.leave_ack_timeout, async {
            while let Some(event) = events.recv().await {
                if event.connection_id != id {
                    continue;
                }
                if matches!(event.frame, Some(SignalFrame::LeaveAck(_))) {
                    return true;
                }
                if event.is_connection_terminal() {
                    break;
                }
            }
            false
        })
        .await
        .unwrap_or(false);
        debug!("Leave acknowledged: {}", acked);
    }

    fn shutdown(&mut self, status: SessionStatusCode) {
        self.stop.cancel();
        self.state.reconnect.cancel();
        self.state.signaling.close_connection();
        self.state.close_peer();
        self.state.signaling.remove_observer(self.forwarding);
        info!("Session stopped: {}", status);
        self.set_phase(SessionPhase::Stopped(status));
        self.observers.for_each(|o| o.session_stopped(status));
    }

    fn send_if_connected(
        &self,
        what: &str,
        send: impl FnOnce(&SignalingClient) -> Result<(), SignalingError>,
    ) {
        if self.state.connection_id.is_none() || !self.state.signaling.ready() {
            debug!("Not connected; {} not sent", what);
            return;
        }
        if let Err(e) = send(&self.state.signaling) {
            warn!("Failed to send {}: {}", what, e);
        }
    }

    /// Re-send the application's pauses on a fresh connection, dropping
    /// streams the new index no longer lists
    fn restore_paused(&mut self) {
        let present = self
            .state
            .paused
            .intersection(&self.state.index.remote_stream_ids());
        if present.len() != self.state.paused.len() {
            debug!(
                "Forgetting pauses of vanished streams {:?}",
                self.state.paused.difference(&present).to_vec()
            );
        }
        self.state.paused = present;
        if self.state.paused.is_empty() {
            return;
        }
        let paused = self.state.paused.clone();
        self.send_if_connected("pause", |s| s.pause(&paused));
    }

    fn notify_remote_sources(&mut self) {
        let sources = self.state.index.remote_video_sources();
        if sources == self.remote_sources {
            return;
        }
        self.remote_sources = sources;
        let sources = &self.remote_sources;
        self.observers
            .for_each(|o| o.remote_video_sources_changed(sources));
    }

    fn notify_subscriptions(&mut self) {
        if self.state.subscribed == self.notified_subscriptions {
            return;
        }
        self.notified_subscriptions = self.state.subscribed.clone();
        let subscribed = &self.notified_subscriptions;
        self.observers
            .for_each(|o| o.video_subscriptions_changed(subscribed));
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }
}

/// Next ICE state of the active peer; pending forever without one
async fn next_ice_state(
    ice: &mut Option<watch::Receiver<IceConnectionState>>,
) -> IceConnectionState {
    let Some(rx) = ice.as_mut() else {
        return std::future::pending().await;
    };
    if rx.changed().await.is_ok() {
        return *rx.borrow_and_update();
    }
    *ice = None;
    std::future::pending().await
}

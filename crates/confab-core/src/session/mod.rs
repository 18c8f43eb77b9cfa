//! Meeting session negotiation.
//!
//! A session joins a meeting over the signaling client, negotiates one peer
//! connection, keeps its video subscriptions in line with the bandwidth
//! policies and reconnects after recoverable failures. The work is split
//! into small [`Task`](crate::task::Task)s over a shared
//! [`SessionNegotiationState`], driven by the [`SessionController`] actor.

mod config;
mod controller;
mod credentials;
mod observer;
mod peer;
mod state;
mod status;
mod tasks;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionPhase};
pub use credentials::{AttendeeInfo, JoinDescriptor, MediaPlacement, MeetingInfo};
pub use observer::SessionObserver;
pub use peer::{
    IceConnectionState, IceGatheringState, LoopbackIceBehavior, LoopbackPeerConnection,
    LoopbackPeerFactory, OfferRequest, PeerConnection, PeerConnectionFactory,
};
pub use state::SessionNegotiationState;
pub use status::SessionStatusCode;
pub use tasks::{
    CreatePeerConnectionTask, CreateSdpOfferTask, FinishGatheringIceCandidatesTask,
    JoinAndReceiveIndexTask, OpenSignalingConnectionTask, SetRemoteDescriptionTask,
    SubscribeAndReceiveSubscribeAckTask, WaitForIceConnectedTask, join_pipeline,
    renegotiation_pipeline,
};

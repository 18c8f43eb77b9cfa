//! # Confab Core
//!
//! Signaling and session-negotiation engine for WebRTC conferencing clients.
//!
//! This crate provides:
//! - Binary signal frame encoding and decoding with SDP compression
//! - The signaling client with observer fan-out
//! - A cancelable task pipeline for join and renegotiation
//! - The remote video stream index
//! - Downlink and uplink bandwidth policies
//! - Connection health monitoring and reconnect backoff
//! - The session controller tying it all together
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     SessionController                           │
//! │   (actor: pipelines, policies, health, reconnect)               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     SignalingClient                             │
//! │   (typed frames, observers, SDP compression negotiation)        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     SignalingConnection                         │
//! │   (one WebSocket at a time, connection ids)                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod error;
pub mod frame;
pub mod health;
pub mod messages;
pub mod observer;
pub mod policy;
pub mod preference;
pub mod reconnect;
pub mod session;
pub mod signaling;
pub mod stream_id_set;
pub mod stream_index;
pub mod task;

pub use error::{Error, FrameError, NegotiationError, SignalingError, TaskError};
pub use frame::{FrameCodec, FrameType, SignalFrame};
pub use health::{ConnectionHealthData, ConnectionHealthPolicy, HealthConfig, HealthStatus};
pub use observer::{ObserverId, ObserverSet};
pub use policy::{ClientMetrics, DownlinkPolicy, DownlinkPolicyKind, UplinkPolicy, UplinkPolicyKind};
pub use preference::{TargetDisplaySize, VideoPreference, VideoPreferences};
pub use reconnect::{ReconnectConfig, ReconnectController, ReconnectDecision};
pub use session::{
    JoinDescriptor, SessionConfig, SessionController, SessionObserver, SessionPhase,
    SessionStatusCode,
};
pub use signaling::{SignalingClient, SignalingClientEvent, SignalingClientObserver};
pub use stream_id_set::VideoStreamIdSet;
pub use stream_index::{RemoteVideoSource, VideoStreamIndex};
pub use task::{Task, TaskPipeline, TaskResult};

/// Signaling protocol version sent in the connection URL
pub const PROTOCOL_VERSION: u32 = 2;

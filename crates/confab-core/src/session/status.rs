//! Session outcome classification.

use crate::error::{NegotiationError, TaskError};
use std::fmt;

/// Why a session is in its current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatusCode {
    /// Everything is fine
    Ok,
    /// The local user left
    Left,
    /// The meeting ended for everyone
    MeetingEnded,
    /// The attendee was removed from the meeting
    AttendeeRemoved,
    /// The same attendee joined from another device
    JoinedFromAnotherDevice,
    /// The join token was rejected
    AuthenticationRejected,
    /// The meeting is full
    CallAtCapacity,
    /// The audio service dropped the call
    AudioDisconnected,
    /// The audio service reported an internal error
    AudioInternalServerError,
    /// The audio service is unavailable
    AudioServiceUnavailable,
    /// The signaling server rejected a request as malformed
    SignalingBadRequest,
    /// The signaling server failed internally
    SignalingInternalServerError,
    /// The signaling server rejected a request
    SignalingRequestFailed,
    /// The signaling socket failed or closed without a leave
    SignalingChannelClosedUnexpectedly,
    /// The peer connection never connected or lost its transport
    IceConnectionFailed,
    /// Keep-alive monitoring declared the connection dead
    ConnectionHealthReconnect,
    /// A negotiation step failed or timed out
    TaskFailed,
}

impl SessionStatusCode {
    /// Status for an audio status code reported by the server
    #[must_use]
    pub fn from_audio_status(status: u32) -> Self {
        match status {
            200 => Self::Ok,
            301 => Self::JoinedFromAnotherDevice,
            302 => Self::AudioDisconnected,
            403 => Self::AuthenticationRejected,
            409 => Self::CallAtCapacity,
            410 => Self::MeetingEnded,
            411 => Self::AttendeeRemoved,
            500 => Self::AudioInternalServerError,
            503 => Self::AudioServiceUnavailable,
            _ if status / 100 == 2 => Self::Ok,
            _ => Self::AudioDisconnected,
        }
    }

    /// Status for the status code of an Error frame
    #[must_use]
    pub fn from_signal_error(status: u32) -> Self {
        match status {
            400 => Self::SignalingBadRequest,
            403 => Self::AuthenticationRejected,
            500 => Self::SignalingInternalServerError,
            _ => Self::SignalingRequestFailed,
        }
    }

    /// Status for a failed negotiation step
    #[must_use]
    pub fn from_negotiation_error(error: &NegotiationError) -> Self {
        match error {
            NegotiationError::ConnectionLost(_) => Self::SignalingChannelClosedUnexpectedly,
            NegotiationError::ServerRejected { status, .. } => Self::from_signal_error(*status),
            NegotiationError::JoinRejected(status) => Self::from_audio_status(*status),
            NegotiationError::IceFailed => Self::IceConnectionFailed,
            NegotiationError::Signaling(_) => Self::SignalingRequestFailed,
            NegotiationError::MissingState(_)
            | NegotiationError::Peer(_)
            | NegotiationError::StalePeer => Self::TaskFailed,
        }
    }

    /// Status for a pipeline error; cancellation maps to [`Self::Left`]
    #[must_use]
    pub fn from_task_error(error: &TaskError) -> Self {
        match error {
            TaskError::Canceled { .. } => Self::Left,
            TaskError::TimedOut { .. } => Self::TaskFailed,
            TaskError::Failed { source, .. } => Self::from_negotiation_error(source),
        }
    }

    /// Whether the session ends for good with this status
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Left
                | Self::MeetingEnded
                | Self::AttendeeRemoved
                | Self::JoinedFromAnotherDevice
                | Self::AuthenticationRejected
                | Self::CallAtCapacity
                | Self::SignalingBadRequest
        )
    }

    /// Whether this status describes something going wrong
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Ok | Self::Left)
    }

    /// Whether the controller may retry after this status
    #[must_use]
    pub fn is_reconnectable(self) -> bool {
        self.is_failure() && !self.is_terminal()
    }
}

impl fmt::Display for SessionStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

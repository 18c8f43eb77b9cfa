//! Error types for the Confab signaling engine.

use std::time::Duration;
use thiserror::Error;

/// Core errors
#[derive(Debug, Error)]
pub enum Error {
    /// Frame codec error
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Signaling client error
    #[error("signaling error: {0}")]
    Signaling(#[from] SignalingError),

    /// Negotiation error
    #[error("negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    /// Task pipeline error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Join descriptor error
    #[error("invalid join descriptor: {0}")]
    Descriptor(String),
}

/// Frame-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Empty buffer
    #[error("frame too short: no type tag")]
    TooShort,

    /// Reserved frame type used
    #[error("reserved frame type used")]
    ReservedFrameType,

    /// Unrecognized frame type byte
    #[error("unknown frame type: 0x{0:02X}")]
    UnknownFrameType(u8),

    /// Length prefix missing or malformed
    #[error("invalid length prefix")]
    InvalidLength,

    /// Payload shorter than its length prefix
    #[error("truncated payload: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Length announced by the prefix
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// Bytes after the payload
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// Payload does not decode as the tagged message
    #[error("malformed {frame_type} payload: {reason}")]
    Malformed {
        /// Frame type name
        frame_type: &'static str,
        /// Decoder message
        reason: String,
    },

    /// SDP compression or decompression failed
    #[error("SDP compression failed: {0}")]
    Compression(String),

    /// Payload could not be encoded
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Signaling client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    /// Socket not connecting or open
    #[error("signaling connection is not open")]
    NotConnected,

    /// Socket write rejected
    #[error("transport error: {0}")]
    Transport(String),

    /// Frame could not be encoded
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Signaling URL could not be built
    #[error("invalid signaling url: {0}")]
    InvalidUrl(String),

    /// Data message rejected before sending
    #[error("invalid data message: {0}")]
    InvalidDataMessage(String),
}

impl From<confab_transport::TransportError> for SignalingError {
    fn from(err: confab_transport::TransportError) -> Self {
        match err {
            confab_transport::TransportError::NotOpen => Self::NotConnected,
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Negotiation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    /// Signaling socket failed or closed during a step
    #[error("signaling connection lost: {0}")]
    ConnectionLost(String),

    /// Server answered with an Error frame
    #[error("server rejected request: status {status}: {description}")]
    ServerRejected {
        /// Status code
        status: u32,
        /// Description
        description: String,
    },

    /// Server reported a terminal audio status during join
    #[error("join rejected with audio status {0}")]
    JoinRejected(u32),

    /// A step needs state an earlier step should have produced
    #[error("missing {0}")]
    MissingState(&'static str),

    /// Peer connection operation failed
    #[error("peer connection error: {0}")]
    Peer(String),

    /// ICE reached failed or closed
    #[error("ICE connection failed")]
    IceFailed,

    /// Answer arrived for a peer connection that has been replaced
    #[error("answer targets a replaced peer connection")]
    StalePeer,

    /// Send failed
    #[error("signaling error: {0}")]
    Signaling(#[from] SignalingError),
}

/// Task pipeline errors
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task was canceled
    #[error("task {task} canceled")]
    Canceled {
        /// Task name
        task: String,
    },

    /// The task exceeded its deadline
    #[error("task {task} timed out after {after:?}")]
    TimedOut {
        /// Task name
        task: String,
        /// Deadline
        after: Duration,
    },

    /// The task failed
    #[error("task {task} failed: {source}")]
    Failed {
        /// Task name
        task: String,
        /// Underlying error
        source: NegotiationError,
    },
}

impl TaskError {
    /// Whether the task was canceled rather than failing
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    /// Name of the task that produced the error
    #[must_use]
    pub fn task(&self) -> &str {
        match self {
            Self::Canceled { task } | Self::TimedOut { task, .. } | Self::Failed { task, .. } => {
                task
            }
        }
    }

    /// Wrap a negotiation error with a task name
    pub fn failed(task: impl Into<String>, source: impl Into<NegotiationError>) -> Self {
        Self::Failed {
            task: task.into(),
            source: source.into(),
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_display() {
        assert_eq!(
            FrameError::UnknownFrameType(0x7F).to_string(),
            "unknown frame type: 0x7F"
        );
        assert_eq!(
            FrameError::Truncated {
                expected: 10,
                actual: 4
            }
            .to_string(),
            "truncated payload: expected 10 bytes, got 4"
        );
    }

    #[test]
    fn test_task_error_classification() {
        let canceled = TaskError::Canceled {
            task: "Subscribe".into(),
        };
        assert!(canceled.is_canceled());
        assert_eq!(canceled.task(), "Subscribe");

        let failed = TaskError::failed("Join", NegotiationError::IceFailed);
        assert!(!failed.is_canceled());
        assert_eq!(failed.to_string(), "task Join failed: ICE connection failed");
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: SignalingError = confab_transport::TransportError::NotOpen.into();
        assert_eq!(err, SignalingError::NotConnected);
    }
}

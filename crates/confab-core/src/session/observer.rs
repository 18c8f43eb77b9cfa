//! Session lifecycle callbacks.

use super::status::SessionStatusCode;
use crate::health::HealthStatus;
use crate::messages::{AudioStreamInfo, DataMessagePayload};
use crate::stream_id_set::VideoStreamIdSet;
use crate::stream_index::RemoteVideoSource;

/// Receives session events.
///
/// Every method has an empty default so observers implement only what they
/// need. Callbacks run on the session actor and must not block.
pub trait SessionObserver: Send + Sync {
    /// A connection attempt started
    fn session_connecting(&self, _reconnecting: bool) {}

    /// Media is connected
    fn session_started(&self, _reconnecting: bool) {}

    /// The session ended; called exactly once
    fn session_stopped(&self, _status: SessionStatusCode) {}

    /// The set of received streams changed
    fn video_subscriptions_changed(&self, _subscribed: &VideoStreamIdSet) {}

    /// Remote attendees started or stopped sending video
    fn remote_video_sources_changed(&self, _sources: &[RemoteVideoSource]) {}

    /// A data message arrived
    fn data_message_received(&self, _message: &DataMessagePayload) {}

    /// A remote attendee's audio presence or mute state changed
    fn attendee_audio_changed(&self, _info: &AudioStreamInfo) {}

    /// The server answered a primary-meeting promotion
    fn primary_meeting_promotion(&self, _status: SessionStatusCode) {}

    /// Signaling connection health changed
    fn connection_health_changed(&self, _status: HealthStatus) {}
}

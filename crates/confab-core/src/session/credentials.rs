//! Join descriptor: where to connect and who is joining.

use crate::error::{Error, Result};
use crate::messages::MeetingCredentials;
use crate::signaling::SignalingConnectionRequest;
use serde::{Deserialize, Serialize};

/// Media endpoints of a meeting
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaPlacement {
    /// Audio host URL
    pub audio_host_url: String,
    /// Signaling WebSocket URL
    pub signaling_url: String,
    /// Audio fallback URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_fallback_url: Option<String>,
    /// TURN control URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_control_url: Option<String>,
}

/// Meeting half of the descriptor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeetingInfo {
    /// Meeting id
    pub meeting_id: String,
    /// Application-defined meeting id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_meeting_id: Option<String>,
    /// Media region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_region: Option<String>,
    /// Media endpoints
    pub media_placement: MediaPlacement,
}

/// Attendee half of the descriptor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttendeeInfo {
    /// Attendee id
    pub attendee_id: String,
    /// Application-defined user id
    #[serde(default)]
    pub external_user_id: String,
    /// Join token
    pub join_token: String,
}

/// Everything needed to join one meeting as one attendee
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JoinDescriptor {
    /// Meeting
    pub meeting: MeetingInfo,
    /// Attendee
    pub attendee: AttendeeInfo,
}

impl JoinDescriptor {
    /// Parse and validate a descriptor from JSON
    ///
    /// # Errors
    /// Returns `Error::Descriptor` if the JSON is malformed or a required
    /// field is empty
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self =
            serde_json::from_str(json).map_err(|e| Error::Descriptor(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check that the required fields are present
    ///
    /// # Errors
    /// Returns `Error::Descriptor` naming the first empty field
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("Meeting.MeetingId", &self.meeting.meeting_id),
            (
                "Meeting.MediaPlacement.SignalingUrl",
                &self.meeting.media_placement.signaling_url,
            ),
            ("Attendee.AttendeeId", &self.attendee.attendee_id),
            ("Attendee.JoinToken", &self.attendee.join_token),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Descriptor(format!("{name} is empty")));
            }
        }
        Ok(())
    }

    /// Request for opening the signaling socket
    #[must_use]
    pub fn signaling_request(&self) -> SignalingConnectionRequest {
        SignalingConnectionRequest::new(
            self.meeting.media_placement.signaling_url.clone(),
            self.attendee.join_token.clone(),
        )
    }

    /// Credentials for primary-meeting promotion
    #[must_use]
    pub fn credentials(&self) -> MeetingCredentials {
        MeetingCredentials {
            attendee_id: self.attendee.attendee_id.clone(),
            external_user_id: self.attendee.external_user_id.clone(),
            join_token: self.attendee.join_token.clone(),
        }
    }
}

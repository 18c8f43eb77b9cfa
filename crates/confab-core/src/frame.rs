//! Frame encoding and decoding for the Confab signaling wire protocol.
//!
//! Every WebSocket message carries exactly one frame:
//!
//! ```text
//! ┌──────────┬────────────────┬──────────────────────────┐
//! │ type (1) │ length (varint)│ protobuf payload (length) │
//! └──────────┴────────────────┴──────────────────────────┘
//! ```
//!
//! SDP in Subscribe and SubscribeAck payloads is optionally DEFLATE
//! compressed into a dedicated bytes field before the payload is laid out.

use crate::compression::{compress_sdp, decompress_sdp};
use crate::error::FrameError;
use crate::messages::{
    AudioStatusFrame, AudioStreamInfoFrame, BitratesFrame, ClientMetricFrame, DataMessageFrame,
    ErrorFrame, IndexFrame, JoinAckFrame, JoinFrame, LeaveAckFrame, LeaveFrame, MuteFrame,
    PauseResumeFrame, PingPongFrame, PrimaryMeetingJoinAckFrame, PrimaryMeetingJoinFrame,
    PrimaryMeetingLeaveFrame, RemoteVideoUpdateFrame, SubscribeAckFrame, SubscribeFrame,
};
use prost::Message;
use std::fmt;

/// Frame types as defined by the signaling protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Reserved (invalid)
    Reserved = 0x00,
    /// Join request
    Join = 0x01,
    /// Join acknowledgement
    JoinAck = 0x02,
    /// Subscribe with SDP offer
    Subscribe = 0x03,
    /// Subscribe acknowledgement with SDP answer
    SubscribeAck = 0x04,
    /// Remote stream catalog
    Index = 0x05,
    /// Pause receive streams
    Pause = 0x07,
    /// Resume receive streams
    Resume = 0x08,
    /// Leave request
    Leave = 0x09,
    /// Leave acknowledgement
    LeaveAck = 0x0A,
    /// Remote stream bitrates
    Bitrates = 0x0D,
    /// Local audio mute
    Mute = 0x10,
    /// Remote audio presence and mute
    AudioStreamInfo = 0x12,
    /// Keep-alive
    PingPong = 0x13,
    /// Server audio status
    AudioStatus = 0x14,
    /// Client metrics
    ClientMetric = 0x15,
    /// Application data messages
    DataMessage = 0x16,
    /// Incremental receive update
    RemoteVideoUpdate = 0x18,
    /// Promotion to primary meeting
    PrimaryMeetingJoin = 0x19,
    /// Promotion result
    PrimaryMeetingJoinAck = 0x1A,
    /// Demotion from primary meeting
    PrimaryMeetingLeave = 0x1B,
    /// Server error
    Error = 0x1C,
}

impl FrameType {
    /// Human-readable name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Reserved => "Reserved",
            Self::Join => "Join",
            Self::JoinAck => "JoinAck",
            Self::Subscribe => "Subscribe",
            Self::SubscribeAck => "SubscribeAck",
            Self::Index => "Index",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Leave => "Leave",
            Self::LeaveAck => "LeaveAck",
            Self::Bitrates => "Bitrates",
            Self::Mute => "Mute",
            Self::AudioStreamInfo => "AudioStreamInfo",
            Self::PingPong => "PingPong",
            Self::AudioStatus => "AudioStatus",
            Self::ClientMetric => "ClientMetric",
            Self::DataMessage => "DataMessage",
            Self::RemoteVideoUpdate => "RemoteVideoUpdate",
            Self::PrimaryMeetingJoin => "PrimaryMeetingJoin",
            Self::PrimaryMeetingJoinAck => "PrimaryMeetingJoinAck",
            Self::PrimaryMeetingLeave => "PrimaryMeetingLeave",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for FrameType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, FrameError> {
        match value {
            0x00 => Err(FrameError::ReservedFrameType),
            0x01 => Ok(Self::Join),
            0x02 => Ok(Self::JoinAck),
            0x03 => Ok(Self::Subscribe),
            0x04 => Ok(Self::SubscribeAck),
            0x05 => Ok(Self::Index),
            0x07 => Ok(Self::Pause),
            0x08 => Ok(Self::Resume),
            0x09 => Ok(Self::Leave),
            0x0A => Ok(Self::LeaveAck),
            0x0D => Ok(Self::Bitrates),
            0x10 => Ok(Self::Mute),
            0x12 => Ok(Self::AudioStreamInfo),
            0x13 => Ok(Self::PingPong),
            0x14 => Ok(Self::AudioStatus),
            0x15 => Ok(Self::ClientMetric),
            0x16 => Ok(Self::DataMessage),
            0x18 => Ok(Self::RemoteVideoUpdate),
            0x19 => Ok(Self::PrimaryMeetingJoin),
            0x1A => Ok(Self::PrimaryMeetingJoinAck),
            0x1B => Ok(Self::PrimaryMeetingLeave),
            0x1C => Ok(Self::Error),
            _ => Err(FrameError::UnknownFrameType(value)),
        }
    }
}

/// A decoded signaling frame
#[derive(Debug, Clone, PartialEq)]
pub enum SignalFrame {
    /// Join request
    Join(JoinFrame),
    /// Join acknowledgement
    JoinAck(JoinAckFrame),
    /// Subscribe with SDP offer
    Subscribe(SubscribeFrame),
    /// Subscribe acknowledgement
    SubscribeAck(SubscribeAckFrame),
    /// Remote stream catalog
    Index(IndexFrame),
    /// Pause receive streams
    Pause(PauseResumeFrame),
    /// Resume receive streams
    Resume(PauseResumeFrame),
    /// Leave request
    Leave(LeaveFrame),
    /// Leave acknowledgement
    LeaveAck(LeaveAckFrame),
    /// Remote stream bitrates
    Bitrates(BitratesFrame),
    /// Local audio mute
    Mute(MuteFrame),
    /// Remote audio presence
    AudioStreamInfo(AudioStreamInfoFrame),
    /// Keep-alive
    PingPong(PingPongFrame),
    /// Server audio status
    AudioStatus(AudioStatusFrame),
    /// Client metrics
    ClientMetric(ClientMetricFrame),
    /// Application data messages
    DataMessage(DataMessageFrame),
    /// Incremental receive update
    RemoteVideoUpdate(RemoteVideoUpdateFrame),
    /// Promotion to primary meeting
    PrimaryMeetingJoin(PrimaryMeetingJoinFrame),
    /// Promotion result
    PrimaryMeetingJoinAck(PrimaryMeetingJoinAckFrame),
    /// Demotion
    PrimaryMeetingLeave(PrimaryMeetingLeaveFrame),
    /// Server error
    Error(ErrorFrame),
}

impl SignalFrame {
    /// Wire type of this frame
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Join(_) => FrameType::Join,
            Self::JoinAck(_) => FrameType::JoinAck,
            Self::Subscribe(_) => FrameType::Subscribe,
            Self::SubscribeAck(_) => FrameType::SubscribeAck,
            Self::Index(_) => FrameType::Index,
            Self::Pause(_) => FrameType::Pause,
            Self::Resume(_) => FrameType::Resume,
            Self::Leave(_) => FrameType::Leave,
            Self::LeaveAck(_) => FrameType::LeaveAck,
            Self::Bitrates(_) => FrameType::Bitrates,
            Self::Mute(_) => FrameType::Mute,
            Self::AudioStreamInfo(_) => FrameType::AudioStreamInfo,
            Self::PingPong(_) => FrameType::PingPong,
            Self::AudioStatus(_) => FrameType::AudioStatus,
            Self::ClientMetric(_) => FrameType::ClientMetric,
            Self::DataMessage(_) => FrameType::DataMessage,
            Self::RemoteVideoUpdate(_) => FrameType::RemoteVideoUpdate,
            Self::PrimaryMeetingJoin(_) => FrameType::PrimaryMeetingJoin,
            Self::PrimaryMeetingJoinAck(_) => FrameType::PrimaryMeetingJoinAck,
            Self::PrimaryMeetingLeave(_) => FrameType::PrimaryMeetingLeave,
            Self::Error(_) => FrameType::Error,
        }
    }
}

/// Encoder/decoder for signaling frames.
///
/// `sdp_compression` controls only the encoder; the decoder always inflates
/// compressed SDP fields it finds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCodec {
    /// Compress outgoing SDP
    pub sdp_compression: bool,
}

impl FrameCodec {
    /// Codec sending plain-text SDP
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sdp_compression: false,
        }
    }

    /// Codec compressing outgoing SDP
    #[must_use]
    pub const fn with_sdp_compression() -> Self {
        Self {
            sdp_compression: true,
        }
    }

    /// Encode a frame into one wire message
    ///
    /// # Errors
    /// Returns `FrameError::Compression` if SDP compression fails
    pub fn encode(&self, frame: &SignalFrame) -> Result<Vec<u8>, FrameError> {
        let tag = frame.frame_type();
        match frame {
            SignalFrame::Join(m) => encode_payload(tag, m),
            SignalFrame::JoinAck(m) => encode_payload(tag, m),
            SignalFrame::Subscribe(m) if self.sdp_compression && !m.sdp_offer.is_empty() => {
                let mut wire = m.clone();
                wire.compressed_sdp_offer = compress_sdp(&m.sdp_offer)?;
                wire.sdp_offer.clear();
                encode_payload(tag, &wire)
            }
            SignalFrame::Subscribe(m) => encode_payload(tag, m),
            SignalFrame::SubscribeAck(m) if self.sdp_compression && !m.sdp_answer.is_empty() => {
                let mut wire = m.clone();
                wire.compressed_sdp_answer = compress_sdp(&m.sdp_answer)?;
                wire.sdp_answer.clear();
                encode_payload(tag, &wire)
            }
            SignalFrame::SubscribeAck(m) => encode_payload(tag, m),
            SignalFrame::Index(m) => encode_payload(tag, m),
            SignalFrame::Pause(m) | SignalFrame::Resume(m) => encode_payload(tag, m),
            SignalFrame::Leave(m) => encode_payload(tag, m),
            SignalFrame::LeaveAck(m) => encode_payload(tag, m),
            SignalFrame::Bitrates(m) => encode_payload(tag, m),
            SignalFrame::Mute(m) => encode_payload(tag, m),
            SignalFrame::AudioStreamInfo(m) => encode_payload(tag, m),
            SignalFrame::PingPong(m) => encode_payload(tag, m),
            SignalFrame::AudioStatus(m) => encode_payload(tag, m),
            SignalFrame::ClientMetric(m) => encode_payload(tag, m),
            SignalFrame::DataMessage(m) => encode_payload(tag, m),
            SignalFrame::RemoteVideoUpdate(m) => encode_payload(tag, m),
            SignalFrame::PrimaryMeetingJoin(m) => encode_payload(tag, m),
            SignalFrame::PrimaryMeetingJoinAck(m) => encode_payload(tag, m),
            SignalFrame::PrimaryMeetingLeave(m) => encode_payload(tag, m),
            SignalFrame::Error(m) => encode_payload(tag, m),
        }
    }

    /// Decode one wire message
    ///
    /// # Errors
    /// Returns a `FrameError` describing why the message is not a valid frame
    pub fn decode(&self, data: &[u8]) -> Result<SignalFrame, FrameError> {
        let (&tag, mut rest) = data.split_first().ok_or(FrameError::TooShort)?;
        let frame_type = FrameType::try_from(tag)?;

        let len = prost::encoding::decode_varint(&mut rest)
            .ok()
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(FrameError::InvalidLength)?;
        if rest.len() < len {
            return Err(FrameError::Truncated {
                expected: len,
                actual: rest.len(),
            });
        }
        if rest.len() > len {
            return Err(FrameError::TrailingBytes(rest.len() - len));
        }
        let payload = rest;

        let frame = match frame_type {
            FrameType::Reserved => return Err(FrameError::ReservedFrameType),
            FrameType::Join => SignalFrame::Join(decode_payload(frame_type, payload)?),
            FrameType::JoinAck => SignalFrame::JoinAck(decode_payload(frame_type, payload)?),
            FrameType::Subscribe => {
                let mut m: SubscribeFrame = decode_payload(frame_type, payload)?;
                if !m.compressed_sdp_offer.is_empty() {
                    m.sdp_offer = decompress_sdp(&m.compressed_sdp_offer)?;
                    m.compressed_sdp_offer.clear();
                }
                SignalFrame::Subscribe(m)
            }
            FrameType::SubscribeAck => {
                let mut m: SubscribeAckFrame = decode_payload(frame_type, payload)?;
                if !m.compressed_sdp_answer.is_empty() {
                    m.sdp_answer = decompress_sdp(&m.compressed_sdp_answer)?;
                    m.compressed_sdp_answer.clear();
                }
                SignalFrame::SubscribeAck(m)
            }
            FrameType::Index => SignalFrame::Index(decode_payload(frame_type, payload)?),
            FrameType::Pause => SignalFrame::Pause(decode_payload(frame_type, payload)?),
            FrameType::Resume => SignalFrame::Resume(decode_payload(frame_type, payload)?),
            FrameType::Leave => SignalFrame::Leave(decode_payload(frame_type, payload)?),
            FrameType::LeaveAck => SignalFrame::LeaveAck(decode_payload(frame_type, payload)?),
            FrameType::Bitrates => SignalFrame::Bitrates(decode_payload(frame_type, payload)?),
            FrameType::Mute => SignalFrame::Mute(decode_payload(frame_type, payload)?),
            FrameType::AudioStreamInfo => {
                SignalFrame::AudioStreamInfo(decode_payload(frame_type, payload)?)
            }
            FrameType::PingPong => SignalFrame::PingPong(decode_payload(frame_type, payload)?),
            FrameType::AudioStatus => {
                SignalFrame::AudioStatus(decode_payload(frame_type, payload)?)
            }
            FrameType::ClientMetric => {
                SignalFrame::ClientMetric(decode_payload(frame_type, payload)?)
            }
            FrameType::DataMessage => {
                SignalFrame::DataMessage(decode_payload(frame_type, payload)?)
            }
            FrameType::RemoteVideoUpdate => {
                SignalFrame::RemoteVideoUpdate(decode_payload(frame_type, payload)?)
            }
            FrameType::PrimaryMeetingJoin => {
                SignalFrame::PrimaryMeetingJoin(decode_payload(frame_type, payload)?)
            }
            FrameType::PrimaryMeetingJoinAck => {
                SignalFrame::PrimaryMeetingJoinAck(decode_payload(frame_type, payload)?)
            }
            FrameType::PrimaryMeetingLeave => {
                SignalFrame::PrimaryMeetingLeave(decode_payload(frame_type, payload)?)
            }
            FrameType::Error => SignalFrame::Error(decode_payload(frame_type, payload)?),
        };
        Ok(frame)
    }
}

fn encode_payload<M: Message>(frame_type: FrameType, message: &M) -> Result<Vec<u8>, FrameError> {
    let len = message.encoded_len();
    let mut buf = Vec::with_capacity(1 + prost::encoding::encoded_len_varint(len as u64) + len);
    buf.push(frame_type as u8);
    message
        .encode_length_delimited(&mut buf)
        .map_err(|e| FrameError::Encode(e.to_string()))?;
    Ok(buf)
}

fn decode_payload<M: Message + Default>(
    frame_type: FrameType,
    payload: &[u8],
) -> Result<M, FrameError> {
    M::decode(payload).map_err(|e| FrameError::Malformed {
        frame_type: frame_type.name(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{
        Bitrate, MediaType, MeetingCredentials, PingPongKind, StreamDescriptor, StreamDirection,
        TrackMapping,
    };

    const SDP: &str = "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=rtpmap:96 VP8/90000\r\na=mid:1\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=rtpmap:96 VP8/90000\r\na=mid:2\r\n";

    fn descriptor(stream_id: u32, attendee: &str, kbps: u32) -> StreamDescriptor {
        StreamDescriptor {
            stream_id,
            group_id: 1,
            max_bitrate_kbps: kbps,
            attendee_id: attendee.to_string(),
            media_type: MediaType::Video as i32,
            ..Default::default()
        }
    }

    fn sample_frames() -> Vec<SignalFrame> {
        vec![
            SignalFrame::Join(JoinFrame {
                protocol_version: 2,
                max_num_of_videos: 25,
                flags: 0x46,
                client_details: None,
                audio_session_id: 77,
            }),
            SignalFrame::JoinAck(JoinAckFrame {
                video_subscription_limit: 25,
                wants_compressed_sdp: true,
            }),
            SignalFrame::Subscribe(SubscribeFrame {
                duplex: StreamDirection::Duplex as i32,
                send_streams: vec![descriptor(1, "self", 600)],
                receive_stream_ids: vec![2, 3],
                sdp_offer: SDP.to_string(),
                audio_host: "audio.example.com:3478".to_string(),
                ..Default::default()
            }),
            SignalFrame::SubscribeAck(SubscribeAckFrame {
                duplex: StreamDirection::Duplex as i32,
                sdp_answer: SDP.to_string(),
                tracks: vec![TrackMapping {
                    stream_id: 2,
                    ssrc: 1234,
                    track_label: "v".into(),
                }],
                ..Default::default()
            }),
            SignalFrame::Index(IndexFrame {
                at_capacity: false,
                sources: vec![descriptor(2, "a", 300), descriptor(3, "a", 1200)],
                paused_at_source_ids: vec![],
                num_participants: 2,
            }),
            SignalFrame::Pause(PauseResumeFrame {
                stream_ids: vec![2],
                group_ids: vec![],
            }),
            SignalFrame::Resume(PauseResumeFrame {
                stream_ids: vec![2],
                group_ids: vec![],
            }),
            SignalFrame::Leave(LeaveFrame {}),
            SignalFrame::LeaveAck(LeaveAckFrame {}),
            SignalFrame::Bitrates(BitratesFrame {
                bitrates: vec![Bitrate {
                    source_stream_id: 2,
                    avg_bitrate_bps: 250_000,
                }],
                server_available_outgoing_bitrate: 2_000_000,
            }),
            SignalFrame::Mute(MuteFrame { muted: true }),
            SignalFrame::AudioStreamInfo(AudioStreamInfoFrame::default()),
            SignalFrame::PingPong(PingPongFrame {
                kind: PingPongKind::Ping as i32,
                ping_id: 9,
            }),
            SignalFrame::AudioStatus(AudioStatusFrame { audio_status: 200 }),
            SignalFrame::ClientMetric(ClientMetricFrame::default()),
            SignalFrame::DataMessage(DataMessageFrame::default()),
            SignalFrame::RemoteVideoUpdate(RemoteVideoUpdateFrame {
                added_or_updated: vec![],
                removed_mids: vec!["3".into()],
            }),
            SignalFrame::PrimaryMeetingJoin(PrimaryMeetingJoinFrame {
                credentials: Some(MeetingCredentials {
                    attendee_id: "p".into(),
                    external_user_id: "ext".into(),
                    join_token: "tok".into(),
                }),
            }),
            SignalFrame::PrimaryMeetingJoinAck(PrimaryMeetingJoinAckFrame { status: 0 }),
            SignalFrame::PrimaryMeetingLeave(PrimaryMeetingLeaveFrame {}),
            SignalFrame::Error(ErrorFrame {
                status: 403,
                description: "forbidden".into(),
            }),
        ]
    }

    #[test]
    fn test_frame_type_conversion() {
        assert_eq!(FrameType::try_from(0x01).unwrap(), FrameType::Join);
        assert_eq!(FrameType::try_from(0x1C).unwrap(), FrameType::Error);
        assert!(matches!(
            FrameType::try_from(0x00),
            Err(FrameError::ReservedFrameType)
        ));
        assert!(matches!(
            FrameType::try_from(0x06),
            Err(FrameError::UnknownFrameType(0x06))
        ));
        assert!(matches!(
            FrameType::try_from(0xFF),
            Err(FrameError::UnknownFrameType(0xFF))
        ));
    }

    #[test]
    fn test_tags_are_unique() {
        let mut tags: Vec<u8> = sample_frames()
            .iter()
            .map(|f| f.frame_type() as u8)
            .collect();
        let total = tags.len();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), total);
        assert!(!tags.contains(&0));
    }

    #[test]
    fn test_round_trip_every_frame_type() {
        for codec in [FrameCodec::new(), FrameCodec::with_sdp_compression()] {
            for frame in sample_frames() {
                let wire = codec.encode(&frame).unwrap();
                assert_eq!(wire[0], frame.frame_type() as u8);
                assert_eq!(codec.decode(&wire).unwrap(), frame, "{}", frame.frame_type());
            }
        }
    }

    #[test]
    fn test_compressed_sdp_is_not_plain_on_wire() {
        let frame = SignalFrame::Subscribe(SubscribeFrame {
            sdp_offer: SDP.to_string(),
            ..Default::default()
        });
        let plain = FrameCodec::new().encode(&frame).unwrap();
        let compressed = FrameCodec::with_sdp_compression().encode(&frame).unwrap();

        let needle = b"a=rtpmap:96 VP8/90000";
        assert!(plain.windows(needle.len()).any(|w| w == needle));
        assert!(!compressed.windows(needle.len()).any(|w| w == needle));

        // Decoders inflate regardless of their own encode setting.
        assert_eq!(FrameCodec::new().decode(&compressed).unwrap(), frame);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(FrameCodec::new().decode(&[]), Err(FrameError::TooShort));
    }

    #[test]
    fn test_decode_reserved_and_unknown() {
        let codec = FrameCodec::new();
        assert_eq!(codec.decode(&[0x00, 0x00]), Err(FrameError::ReservedFrameType));
        assert_eq!(
            codec.decode(&[0x7E, 0x00]),
            Err(FrameError::UnknownFrameType(0x7E))
        );
    }

    #[test]
    fn test_decode_missing_length() {
        assert_eq!(FrameCodec::new().decode(&[0x05]), Err(FrameError::InvalidLength));
        // Unterminated varint
        assert_eq!(
            FrameCodec::new().decode(&[0x05, 0x80]),
            Err(FrameError::InvalidLength)
        );
    }

    #[test]
    fn test_decode_truncated_payload() {
        let codec = FrameCodec::new();
        let wire = codec
            .encode(&SignalFrame::Error(ErrorFrame {
                status: 500,
                description: "internal".into(),
            }))
            .unwrap();
        let cut = &wire[..wire.len() - 3];
        assert!(matches!(
            codec.decode(cut),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let codec = FrameCodec::new();
        let mut wire = codec.encode(&SignalFrame::Leave(LeaveFrame {})).unwrap();
        wire.extend_from_slice(&[1, 2]);
        assert_eq!(codec.decode(&wire), Err(FrameError::TrailingBytes(2)));
    }

    #[test]
    fn test_decode_malformed_payload() {
        // Field 1 of IndexFrame is a bool but arrives length-delimited.
        let wire = [0x05, 0x03, 0x0A, 0x01, 0x00];
        assert!(matches!(
            FrameCodec::new().decode(&wire),
            Err(FrameError::Malformed {
                frame_type: "Index",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_bad_compressed_sdp() {
        let frame = SignalFrame::SubscribeAck(SubscribeAckFrame {
            compressed_sdp_answer: vec![0xFF, 0xFF, 0xFF],
            ..Default::default()
        });
        let wire = FrameCodec::new().encode(&frame).unwrap();
        assert!(matches!(
            FrameCodec::new().decode(&wire),
            Err(FrameError::Compression(_))
        ));
    }

    #[test]
    fn test_ping_wire_bytes() {
        let frame = SignalFrame::PingPong(PingPongFrame {
            kind: PingPongKind::Ping as i32,
            ping_id: 7,
        });
        let wire = FrameCodec::new().encode(&frame).unwrap();
        assert_eq!(hex::encode(&wire), "130408011007");
        assert_eq!(
            FrameCodec::new().decode(&hex::decode("130408011007").unwrap()),
            Ok(frame)
        );
    }
}

//! Protobuf payloads carried by signaling frames.
//!
//! Field numbers are part of the wire contract; never renumber a field,
//! only add new ones.

/// Media kind of an advertised stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MediaType {
    /// Not set
    Unspecified = 0,
    /// Video stream
    Video = 1,
    /// Audio stream
    Audio = 2,
}

/// Direction of a subscribe request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StreamDirection {
    /// Not set
    Unspecified = 0,
    /// Receive only
    Rx = 1,
    /// Send only
    Tx = 2,
    /// Send and receive
    Duplex = 3,
}

/// Ping or pong
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PingPongKind {
    /// Not set
    Unspecified = 0,
    /// Request
    Ping = 1,
    /// Response
    Pong = 2,
}

/// Client metric identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MetricKind {
    /// Not set
    Unspecified = 0,
    /// Downlink estimate (kbps)
    AvailableIncomingBitrate = 1,
    /// Uplink estimate (kbps)
    AvailableOutgoingBitrate = 2,
    /// Receive packet loss (percent)
    PacketLossPercent = 3,
    /// Round trip time (ms)
    RoundTripTime = 4,
    /// Sent video bitrate (kbps)
    VideoSendBitrate = 5,
    /// Received video bitrate (kbps)
    VideoReceiveBitrate = 6,
}

/// Capability bits announced in [`JoinFrame::flags`]
pub mod join_flags {
    /// Client understands incremental stream updates
    pub const HAS_STREAM_UPDATE: u32 = 0x02;
    /// Client wants the complete source list in every Index
    pub const COMPLETE_VIDEO_SOURCES_LIST: u32 = 0x04;
    /// Server should omit the client's own streams from Index frames
    pub const EXCLUDE_SELF_CONTENT_IN_INDEX: u32 = 0x08;
    /// Client can send and receive DEFLATE-compressed SDP
    pub const COMPRESSED_SDP: u32 = 0x40;
}

/// Client build information sent with Join
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientDetails {
    /// Application name
    #[prost(string, tag = "1")]
    pub app_name: String,
    /// Application version
    #[prost(string, tag = "2")]
    pub app_version: String,
    /// Device model
    #[prost(string, tag = "3")]
    pub device_model: String,
    /// Operating system name
    #[prost(string, tag = "4")]
    pub os_name: String,
    /// Operating system version
    #[prost(string, tag = "5")]
    pub os_version: String,
    /// SDK name
    #[prost(string, tag = "6")]
    pub sdk_name: String,
    /// SDK version
    #[prost(string, tag = "7")]
    pub sdk_version: String,
}

/// Join request
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinFrame {
    /// Signaling protocol version
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    /// Maximum remote videos the client can render
    #[prost(uint32, tag = "2")]
    pub max_num_of_videos: u32,
    /// Capability bits, see [`join_flags`]
    #[prost(uint32, tag = "3")]
    pub flags: u32,
    /// Client build information
    #[prost(message, optional, tag = "4")]
    pub client_details: Option<ClientDetails>,
    /// Audio session id, stable across reconnects
    #[prost(uint64, tag = "5")]
    pub audio_session_id: u64,
}

/// Join acknowledgement
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JoinAckFrame {
    /// Maximum number of remote videos the server will forward
    #[prost(uint32, tag = "1")]
    pub video_subscription_limit: u32,
    /// Server accepts compressed SDP on this connection
    #[prost(bool, tag = "2")]
    pub wants_compressed_sdp: bool,
}

/// One stream advertised by the server or offered by the client
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct StreamDescriptor {
    /// Stream id, unique within one Index
    #[prost(uint32, tag = "1")]
    pub stream_id: u32,
    /// Frame rate
    #[prost(uint32, tag = "2")]
    pub framerate: u32,
    /// Layer ceiling (kbps)
    #[prost(uint32, tag = "3")]
    pub max_bitrate_kbps: u32,
    /// Track label
    #[prost(string, tag = "4")]
    pub track_label: String,
    /// Group id shared by all layers of one source
    #[prost(uint32, tag = "6")]
    pub group_id: u32,
    /// Measured average (bps), zero when unknown
    #[prost(uint32, tag = "7")]
    pub avg_bitrate_bps: u32,
    /// Owning attendee
    #[prost(string, tag = "8")]
    pub attendee_id: String,
    /// Media kind
    #[prost(enumeration = "MediaType", tag = "9")]
    pub media_type: i32,
    /// Owning attendee's external user id
    #[prost(string, tag = "10")]
    pub external_user_id: String,
}

/// Subscribe request carrying the SDP offer
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeFrame {
    /// Direction
    #[prost(enumeration = "StreamDirection", tag = "1")]
    pub duplex: i32,
    /// Streams the client will send
    #[prost(message, repeated, tag = "2")]
    pub send_streams: Vec<StreamDescriptor>,
    /// Streams the client wants to receive
    #[prost(uint32, repeated, tag = "3")]
    pub receive_stream_ids: Vec<u32>,
    /// Plain-text SDP offer
    #[prost(string, tag = "4")]
    pub sdp_offer: String,
    /// Audio host URL
    #[prost(string, tag = "5")]
    pub audio_host: String,
    /// Audio check-in only
    #[prost(bool, tag = "6")]
    pub audio_checkin: bool,
    /// Local audio muted
    #[prost(bool, tag = "7")]
    pub audio_muted: bool,
    /// DEFLATE-compressed SDP offer, replaces `sdp_offer` on the wire
    #[prost(bytes = "vec", tag = "8")]
    pub compressed_sdp_offer: Vec<u8>,
}

/// Mapping from a negotiated track to its stream
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct TrackMapping {
    /// Stream id
    #[prost(uint32, tag = "1")]
    pub stream_id: u32,
    /// RTP SSRC
    #[prost(uint32, tag = "2")]
    pub ssrc: u32,
    /// Track label
    #[prost(string, tag = "3")]
    pub track_label: String,
}

/// Subscribe acknowledgement carrying the SDP answer
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeAckFrame {
    /// Direction
    #[prost(enumeration = "StreamDirection", tag = "1")]
    pub duplex: i32,
    /// Plain-text SDP answer
    #[prost(string, tag = "3")]
    pub sdp_answer: String,
    /// Track mappings for received streams
    #[prost(message, repeated, tag = "4")]
    pub tracks: Vec<TrackMapping>,
    /// DEFLATE-compressed SDP answer, replaces `sdp_answer` on the wire
    #[prost(bytes = "vec", tag = "5")]
    pub compressed_sdp_answer: Vec<u8>,
}

/// Server-advertised catalog of remote streams
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IndexFrame {
    /// Server will not accept more senders
    #[prost(bool, tag = "1")]
    pub at_capacity: bool,
    /// Available streams
    #[prost(message, repeated, tag = "2")]
    pub sources: Vec<StreamDescriptor>,
    /// Streams paused by their sender
    #[prost(uint32, repeated, tag = "3")]
    pub paused_at_source_ids: Vec<u32>,
    /// Attendees in the meeting
    #[prost(uint32, tag = "4")]
    pub num_participants: u32,
}

/// Pause or resume receive streams (same payload, distinct frame tags)
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PauseResumeFrame {
    /// Stream ids
    #[prost(uint32, repeated, tag = "1")]
    pub stream_ids: Vec<u32>,
    /// Group ids
    #[prost(uint32, repeated, tag = "2")]
    pub group_ids: Vec<u32>,
}

/// Leave request
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaveFrame {}

/// Leave acknowledgement
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaveAckFrame {}

/// Average bitrate of one source stream
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Bitrate {
    /// Source stream id
    #[prost(uint32, tag = "1")]
    pub source_stream_id: u32,
    /// Average (bps)
    #[prost(uint32, tag = "2")]
    pub avg_bitrate_bps: u32,
}

/// Periodic bitrate report for remote streams
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BitratesFrame {
    /// Per-stream averages
    #[prost(message, repeated, tag = "1")]
    pub bitrates: Vec<Bitrate>,
    /// Server's estimate of the bitrate it can send us (bps)
    #[prost(uint32, tag = "2")]
    pub server_available_outgoing_bitrate: u32,
}

/// Local audio mute state
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MuteFrame {
    /// Muted
    #[prost(bool, tag = "1")]
    pub muted: bool,
}

/// Presence and mute state of one remote audio stream
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct AudioStreamInfo {
    /// Audio stream id
    #[prost(uint32, tag = "1")]
    pub audio_stream_id: u32,
    /// Attendee id
    #[prost(string, tag = "2")]
    pub attendee_id: String,
    /// External user id
    #[prost(string, tag = "3")]
    pub external_user_id: String,
    /// Muted
    #[prost(bool, tag = "4")]
    pub muted: bool,
    /// Attendee dropped out
    #[prost(bool, tag = "5")]
    pub dropped: bool,
}

/// Remote audio presence update
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioStreamInfoFrame {
    /// Stream infos
    #[prost(message, repeated, tag = "1")]
    pub streams: Vec<AudioStreamInfo>,
}

/// Keep-alive probe
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PingPongFrame {
    /// Ping or pong
    #[prost(enumeration = "PingPongKind", tag = "1")]
    pub kind: i32,
    /// Correlation id echoed by the pong
    #[prost(uint32, tag = "2")]
    pub ping_id: u32,
}

/// Server-side audio status
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioStatusFrame {
    /// Status code
    #[prost(uint32, tag = "1")]
    pub audio_status: u32,
}

/// One metric sample
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metric {
    /// Metric identifier
    #[prost(enumeration = "MetricKind", tag = "1")]
    pub kind: i32,
    /// Value
    #[prost(double, tag = "2")]
    pub value: f64,
}

/// Client metric report
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientMetricFrame {
    /// Samples
    #[prost(message, repeated, tag = "1")]
    pub metrics: Vec<Metric>,
}

/// One application data message
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct DataMessagePayload {
    /// Topic
    #[prost(string, tag = "1")]
    pub topic: String,
    /// Payload
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
    /// Server-side retention (ms)
    #[prost(uint32, tag = "3")]
    pub lifetime_ms: u32,
    /// Sender attendee id, set by the server
    #[prost(string, tag = "4")]
    pub sender_attendee_id: String,
    /// Server ingest time (ns since epoch), set by the server
    #[prost(int64, tag = "5")]
    pub ingest_time_ns: i64,
    /// Sender external user id, set by the server
    #[prost(string, tag = "6")]
    pub sender_external_user_id: String,
}

/// Application data messages
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataMessageFrame {
    /// Messages
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<DataMessagePayload>,
}

/// Receive configuration for one transceiver
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct VideoSubscriptionConfiguration {
    /// Transceiver mid
    #[prost(string, tag = "1")]
    pub mid: String,
    /// Remote attendee
    #[prost(string, tag = "2")]
    pub attendee_id: String,
    /// Stream id
    #[prost(uint32, tag = "3")]
    pub stream_id: u32,
    /// Priority, higher is more important
    #[prost(uint32, tag = "4")]
    pub priority: u32,
    /// Target bitrate (kbps)
    #[prost(uint32, tag = "5")]
    pub target_bitrate_kbps: u32,
    /// Group id
    #[prost(uint32, tag = "6")]
    pub group_id: u32,
}

/// Incremental receive-side update without renegotiation
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoteVideoUpdateFrame {
    /// Added or updated configurations
    #[prost(message, repeated, tag = "1")]
    pub added_or_updated: Vec<VideoSubscriptionConfiguration>,
    /// Removed transceiver mids
    #[prost(string, repeated, tag = "2")]
    pub removed_mids: Vec<String>,
}

/// Credentials for joining another meeting as a promoted attendee
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct MeetingCredentials {
    /// Attendee id
    #[prost(string, tag = "1")]
    pub attendee_id: String,
    /// External user id
    #[prost(string, tag = "2")]
    pub external_user_id: String,
    /// Join token
    #[prost(string, tag = "3")]
    pub join_token: String,
}

/// Promote this client into a primary meeting
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrimaryMeetingJoinFrame {
    /// Credentials in the primary meeting
    #[prost(message, optional, tag = "1")]
    pub credentials: Option<MeetingCredentials>,
}

/// Result of a promotion
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrimaryMeetingJoinAckFrame {
    /// Zero on success, otherwise a status code
    #[prost(uint32, tag = "1")]
    pub status: u32,
}

/// Demote from the primary meeting (either direction)
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrimaryMeetingLeaveFrame {}

/// Server-side error
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorFrame {
    /// Status code
    #[prost(uint32, tag = "1")]
    pub status: u32,
    /// Description
    #[prost(string, tag = "2")]
    pub description: String,
}

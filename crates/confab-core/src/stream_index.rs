//! Catalog of remote video streams advertised by the server.
//!
//! The index is replaced wholesale by every Index frame. Bitrates frames
//! refine the average bitrate of known streams, and SubscribeAck frames
//! record which negotiated track carries which stream.

use crate::messages::{
    BitratesFrame, IndexFrame, MediaType, StreamDescriptor, SubscribeAckFrame, TrackMapping,
};
use crate::stream_id_set::VideoStreamIdSet;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// One advertised simulcast layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescription {
    /// Stream id
    pub stream_id: u32,
    /// Group id shared by all layers of one source
    pub group_id: u32,
    /// Layer ceiling (kbps)
    pub max_bitrate_kbps: u32,
    /// Measured average (bps), zero when unknown
    pub avg_bitrate_bps: u32,
    /// Owning attendee
    pub attendee_id: String,
    /// Owning attendee's external user id
    pub external_user_id: String,
}

impl StreamDescription {
    /// Bitrate used for admission: the measured average when known,
    /// otherwise the advertised ceiling
    #[must_use]
    pub fn estimated_bitrate_kbps(&self) -> u32 {
        if self.avg_bitrate_bps > 0 {
            self.avg_bitrate_bps.div_ceil(1000)
        } else {
            self.max_bitrate_kbps
        }
    }
}

impl From<&StreamDescriptor> for StreamDescription {
    fn from(d: &StreamDescriptor) -> Self {
        Self {
            stream_id: d.stream_id,
            group_id: d.group_id,
            max_bitrate_kbps: d.max_bitrate_kbps,
            avg_bitrate_bps: d.avg_bitrate_bps,
            attendee_id: d.attendee_id.clone(),
            external_user_id: d.external_user_id.clone(),
        }
    }
}

/// Remote attendee publishing video
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteVideoSource {
    /// Attendee id
    pub attendee_id: String,
    /// External user id
    pub external_user_id: String,
}

/// Snapshot of remote video streams
#[derive(Debug, Clone, Default)]
pub struct VideoStreamIndex {
    local_attendee_id: String,
    sources: Vec<StreamDescription>,
    paused_at_source: VideoStreamIdSet,
    num_participants: u32,
    at_capacity: bool,
    received_index: bool,
    tracks: HashMap<u32, TrackMapping>,
}

impl VideoStreamIndex {
    /// Empty index; streams owned by `local_attendee_id` are never reported
    /// as remote
    pub fn new(local_attendee_id: impl Into<String>) -> Self {
        Self {
            local_attendee_id: local_attendee_id.into(),
            ..Self::default()
        }
    }

    /// Replace the snapshot with the content of an Index frame.
    ///
    /// Non-video sources are ignored and duplicate stream ids are dropped
    /// (first occurrence wins). Averages learned from Bitrates frames are
    /// kept for streams that survive. Returns whether anything a policy
    /// could observe changed.
    pub fn integrate_index_frame(&mut self, frame: &IndexFrame) -> bool {
        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(frame.sources.len());
        for descriptor in &frame.sources {
            if descriptor.media_type() == MediaType::Audio {
                continue;
            }
            if !seen.insert(descriptor.stream_id) {
                debug!("Dropping duplicate stream id {} in index", descriptor.stream_id);
                continue;
            }
            let mut description = StreamDescription::from(descriptor);
            if description.avg_bitrate_bps == 0 {
                if let Some(previous) = self.stream(description.stream_id) {
                    description.avg_bitrate_bps = previous.avg_bitrate_bps;
                }
            }
            sources.push(description);
        }
        let paused: VideoStreamIdSet = frame.paused_at_source_ids.iter().copied().collect();

        let changed = !self.received_index
            || sources != self.sources
            || paused != self.paused_at_source
            || frame.num_participants != self.num_participants
            || frame.at_capacity != self.at_capacity;

        self.sources = sources;
        self.paused_at_source = paused;
        self.num_participants = frame.num_participants;
        self.at_capacity = frame.at_capacity;
        self.received_index = true;
        changed
    }

    /// Record track mappings from a SubscribeAck
    pub fn integrate_subscribe_ack(&mut self, frame: &SubscribeAckFrame) {
        self.tracks = frame
            .tracks
            .iter()
            .map(|track| (track.stream_id, track.clone()))
            .collect();
    }

    /// Apply measured averages. Returns whether any known stream changed.
    pub fn integrate_bitrates_frame(&mut self, frame: &BitratesFrame) -> bool {
        let mut changed = false;
        for bitrate in &frame.bitrates {
            if let Some(source) = self
                .sources
                .iter_mut()
                .find(|s| s.stream_id == bitrate.source_stream_id)
            {
                if source.avg_bitrate_bps != bitrate.avg_bitrate_bps {
                    source.avg_bitrate_bps = bitrate.avg_bitrate_bps;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Whether an Index frame has been integrated
    #[must_use]
    pub fn has_received_index(&self) -> bool {
        self.received_index
    }

    /// Local attendee id
    #[must_use]
    pub fn local_attendee_id(&self) -> &str {
        &self.local_attendee_id
    }

    /// Attendees in the meeting, as reported by the server
    #[must_use]
    pub fn num_participants(&self) -> u32 {
        self.num_participants
    }

    /// Server refuses more senders
    #[must_use]
    pub fn at_capacity(&self) -> bool {
        self.at_capacity
    }

    /// Look up any stream, local or remote
    #[must_use]
    pub fn stream(&self, stream_id: u32) -> Option<&StreamDescription> {
        self.sources.iter().find(|s| s.stream_id == stream_id)
    }

    /// Owner of a stream
    #[must_use]
    pub fn attendee_for_stream(&self, stream_id: u32) -> Option<&str> {
        self.stream(stream_id).map(|s| s.attendee_id.as_str())
    }

    /// Whether the sender paused the stream
    #[must_use]
    pub fn is_paused_at_source(&self, stream_id: u32) -> bool {
        self.paused_at_source.contains(stream_id)
    }

    /// Track negotiated for a stream
    #[must_use]
    pub fn track_for_stream(&self, stream_id: u32) -> Option<&TrackMapping> {
        self.tracks.get(&stream_id)
    }

    /// All remote streams, in index order
    pub fn remote_streams(&self) -> impl Iterator<Item = &StreamDescription> {
        self.sources
            .iter()
            .filter(|s| s.attendee_id != self.local_attendee_id)
    }

    /// Ids of all remote streams
    #[must_use]
    pub fn remote_stream_ids(&self) -> VideoStreamIdSet {
        self.remote_streams().map(|s| s.stream_id).collect()
    }

    /// Remote attendees with at least one stream, ordered by attendee id
    #[must_use]
    pub fn remote_attendees(&self) -> Vec<&str> {
        let attendees: BTreeSet<&str> = self
            .remote_streams()
            .map(|s| s.attendee_id.as_str())
            .collect();
        attendees.into_iter().collect()
    }

    /// Remote video sources, ordered by attendee id
    #[must_use]
    pub fn remote_video_sources(&self) -> Vec<RemoteVideoSource> {
        let sources: BTreeSet<RemoteVideoSource> = self
            .remote_streams()
            .map(|s| RemoteVideoSource {
                attendee_id: s.attendee_id.clone(),
                external_user_id: s.external_user_id.clone(),
            })
            .collect();
        sources.into_iter().collect()
    }

    /// Layers published by a remote attendee, cheapest first (ties by stream id)
    #[must_use]
    pub fn streams_for_attendee(&self, attendee_id: &str) -> Vec<&StreamDescription> {
        if attendee_id == self.local_attendee_id {
            return Vec::new();
        }
        let mut streams: Vec<&StreamDescription> = self
            .sources
            .iter()
            .filter(|s| s.attendee_id == attendee_id)
            .collect();
        streams.sort_by_key(|s| (s.estimated_bitrate_kbps(), s.stream_id));
        streams
    }

    /// Most expensive layer of a remote attendee
    #[must_use]
    pub fn highest_quality_stream(&self, attendee_id: &str) -> Option<&StreamDescription> {
        self.streams_for_attendee(attendee_id).last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Bitrate;

    fn video(stream_id: u32, attendee: &str, kbps: u32) -> StreamDescriptor {
        StreamDescriptor {
            stream_id,
            group_id: stream_id / 10,
            max_bitrate_kbps: kbps,
            attendee_id: attendee.to_string(),
            media_type: MediaType::Video as i32,
            ..Default::default()
        }
    }

    fn index(sources: Vec<StreamDescriptor>) -> IndexFrame {
        IndexFrame {
            sources,
            num_participants: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_index_is_a_change() {
        let mut idx = VideoStreamIndex::new("me");
        assert!(!idx.has_received_index());
        assert!(idx.integrate_index_frame(&index(vec![])));
        assert!(idx.has_received_index());
        assert!(!idx.integrate_index_frame(&index(vec![])));
    }

    #[test]
    fn test_unchanged_index_reports_no_change() {
        let mut idx = VideoStreamIndex::new("me");
        let frame = index(vec![video(11, "x", 300), video(12, "x", 1200)]);
        assert!(idx.integrate_index_frame(&frame));
        assert!(!idx.integrate_index_frame(&frame));

        let removed = index(vec![video(11, "x", 300)]);
        assert!(idx.integrate_index_frame(&removed));
        assert!(idx.stream(12).is_none());
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let mut idx = VideoStreamIndex::new("me");
        idx.integrate_index_frame(&index(vec![video(11, "x", 300), video(11, "y", 900)]));
        assert_eq!(idx.attendee_for_stream(11), Some("x"));
        assert_eq!(idx.remote_stream_ids().len(), 1);
    }

    #[test]
    fn test_local_streams_excluded() {
        let mut idx = VideoStreamIndex::new("me");
        idx.integrate_index_frame(&index(vec![
            video(11, "me", 300),
            video(21, "b", 300),
            video(31, "a", 300),
        ]));
        assert_eq!(idx.remote_attendees(), vec!["a", "b"]);
        assert!(idx.streams_for_attendee("me").is_empty());
        assert!(!idx.remote_stream_ids().contains(11));
        assert!(idx.stream(11).is_some());
    }

    #[test]
    fn test_audio_sources_ignored() {
        let mut idx = VideoStreamIndex::new("me");
        let mut audio = video(5, "x", 64);
        audio.media_type = MediaType::Audio as i32;
        idx.integrate_index_frame(&index(vec![audio, video(11, "x", 300)]));
        assert_eq!(idx.remote_stream_ids(), VideoStreamIdSet::from([11]));
    }

    #[test]
    fn test_layers_sorted_by_bitrate() {
        let mut idx = VideoStreamIndex::new("me");
        idx.integrate_index_frame(&index(vec![video(12, "x", 1200), video(11, "x", 300)]));
        let layers: Vec<u32> = idx
            .streams_for_attendee("x")
            .iter()
            .map(|s| s.stream_id)
            .collect();
        assert_eq!(layers, vec![11, 12]);
        assert_eq!(idx.highest_quality_stream("x").unwrap().stream_id, 12);
    }

    #[test]
    fn test_bitrates_refine_estimate_and_survive_index() {
        let mut idx = VideoStreamIndex::new("me");
        let frame = index(vec![video(11, "x", 300), video(12, "x", 1200)]);
        idx.integrate_index_frame(&frame);

        let bitrates = BitratesFrame {
            bitrates: vec![Bitrate {
                source_stream_id: 12,
                avg_bitrate_bps: 800_000,
            }],
            server_available_outgoing_bitrate: 0,
        };
        assert!(idx.integrate_bitrates_frame(&bitrates));
        assert!(!idx.integrate_bitrates_frame(&bitrates));
        assert_eq!(idx.stream(12).unwrap().estimated_bitrate_kbps(), 800);

        // Re-advertised without an average: the measured value is kept.
        assert!(!idx.integrate_index_frame(&frame));
        assert_eq!(idx.stream(12).unwrap().estimated_bitrate_kbps(), 800);
    }

    #[test]
    fn test_subscribe_ack_tracks() {
        let mut idx = VideoStreamIndex::new("me");
        idx.integrate_subscribe_ack(&SubscribeAckFrame {
            tracks: vec![TrackMapping {
                stream_id: 11,
                ssrc: 99,
                track_label: "t".into(),
            }],
            ..Default::default()
        });
        assert_eq!(idx.track_for_stream(11).unwrap().ssrc, 99);
        assert!(idx.track_for_stream(12).is_none());
    }
}

//! Test fixtures

mod meeting;

pub use meeting::{
    EventRecorder, MeetingFixture, RecordedEvent, ServerConnection, SDP_ANSWER, descriptor,
    index, video,
};

//! Typed signaling client over the signaling transport.

mod client;
mod event;

pub use client::{
    EventSubscription, JoinSettings, MAX_DATA_MESSAGE_BYTES, MAX_DATA_MESSAGE_LIFETIME_MS,
    MAX_DATA_MESSAGE_TOPIC_LEN, SignalingClient, SignalingConnectionRequest, SubscribeSettings,
    validate_data_message,
};
pub use event::{SignalingClientEvent, SignalingClientEventType, SignalingClientObserver, now_ms};

//! Receive-side subscription policies.

use super::ClientMetrics;
use crate::preference::{VideoPreference, VideoPreferences};
use crate::stream_id_set::VideoStreamIdSet;
use crate::stream_index::VideoStreamIndex;
use tracing::trace;

/// Chooses which remote streams to receive.
///
/// `choose_subscriptions` must be a pure function of the index and the state
/// accumulated through the setters: equal inputs give equal sets, so the
/// caller can diff the result against what is already subscribed.
pub trait DownlinkPolicy: Send {
    /// Policy name for logs
    fn name(&self) -> &'static str;

    /// Feed the latest metrics
    fn update_metrics(&mut self, metrics: &ClientMetrics);

    /// Streams to receive
    fn choose_subscriptions(&self, index: &VideoStreamIndex) -> VideoStreamIdSet;

    /// Replace the application's video preferences
    fn set_video_preferences(&mut self, _preferences: VideoPreferences) {}
}

/// Receives the best layer of every remote attendee
#[derive(Debug, Clone)]
pub struct AllHighestDownlinkPolicy {
    max_subscriptions: usize,
}

impl AllHighestDownlinkPolicy {
    /// Create a policy receiving at most `max_subscriptions` streams
    #[must_use]
    pub fn new(max_subscriptions: usize) -> Self {
        Self { max_subscriptions }
    }
}

impl DownlinkPolicy for AllHighestDownlinkPolicy {
    fn name(&self) -> &'static str {
        "all-highest"
    }

    fn update_metrics(&mut self, _metrics: &ClientMetrics) {}

    fn choose_subscriptions(&self, index: &VideoStreamIndex) -> VideoStreamIdSet {
        index
            .remote_attendees()
            .into_iter()
            .filter_map(|attendee| index.highest_quality_stream(attendee))
            .take(self.max_subscriptions)
            .map(|stream| stream.stream_id)
            .collect()
    }
}

/// Receives nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVideoDownlinkPolicy;

impl DownlinkPolicy for NoVideoDownlinkPolicy {
    fn name(&self) -> &'static str {
        "no-video"
    }

    fn update_metrics(&mut self, _metrics: &ClientMetrics) {}

    fn choose_subscriptions(&self, _index: &VideoStreamIndex) -> VideoStreamIdSet {
        VideoStreamIdSet::new()
    }
}

/// Configuration for [`VideoPriorityBasedPolicy`]
#[derive(Debug, Clone)]
pub struct PriorityPolicyConfig {
    /// Maximum streams received at once
    pub max_subscriptions: usize,
    /// Downlink estimate assumed until the first metrics arrive (kbps)
    pub initial_downlink_estimate_kbps: u32,
}

impl Default for PriorityPolicyConfig {
    fn default() -> Self {
        Self {
            max_subscriptions: 25,
            initial_downlink_estimate_kbps: 2000,
        }
    }
}

/// Priority-ordered greedy admission under the downlink estimate.
///
/// Preferences are walked by descending priority (ties keep the order in
/// which they were given). Each attendee gets the best layer that fits both
/// its display-size cap and the remaining budget; the walk stops at the
/// first attendee for which not even the cheapest eligible layer fits, so a
/// lower-priority attendee is never admitted ahead of a higher-priority one.
/// Without explicit preferences every remote attendee gets equal priority in
/// attendee-id order.
#[derive(Debug, Clone)]
pub struct VideoPriorityBasedPolicy {
    config: PriorityPolicyConfig,
    downlink_estimate_kbps: u32,
    preferences: Option<VideoPreferences>,
}

impl VideoPriorityBasedPolicy {
    /// Create a policy
    #[must_use]
    pub fn new(config: PriorityPolicyConfig) -> Self {
        Self {
            downlink_estimate_kbps: config.initial_downlink_estimate_kbps,
            config,
            preferences: None,
        }
    }

    /// Current downlink estimate (kbps)
    #[must_use]
    pub fn downlink_estimate_kbps(&self) -> u32 {
        self.downlink_estimate_kbps
    }

    fn default_preferences(index: &VideoStreamIndex) -> VideoPreferences {
        index
            .remote_attendees()
            .into_iter()
            .map(|attendee| VideoPreference::new(attendee, 1))
            .collect()
    }
}

impl DownlinkPolicy for VideoPriorityBasedPolicy {
    fn name(&self) -> &'static str {
        "priority-based"
    }

    fn update_metrics(&mut self, metrics: &ClientMetrics) {
        if let Some(kbps) = metrics.available_incoming_kbps {
            self.downlink_estimate_kbps = kbps;
        }
    }

    fn set_video_preferences(&mut self, preferences: VideoPreferences) {
        self.preferences = Some(preferences);
    }

    fn choose_subscriptions(&self, index: &VideoStreamIndex) -> VideoStreamIdSet {
        let defaults;
        let preferences = match &self.preferences {
            Some(preferences) => preferences,
            None => {
                defaults = Self::default_preferences(index);
                &defaults
            }
        };

        let mut remaining = self.downlink_estimate_kbps;
        let mut chosen = VideoStreamIdSet::new();

        for preference in preferences.highest_priority_first() {
            if chosen.len() >= self.config.max_subscriptions {
                break;
            }
            let layers = index.streams_for_attendee(&preference.attendee_id);
            if layers.is_empty() {
                continue;
            }

            let cap = preference.target_size.max_bitrate_kbps();
            let eligible: Vec<_> = layers
                .iter()
                .filter(|s| s.max_bitrate_kbps <= cap)
                .collect();
            // An attendee publishing only layers above the cap still gets its cheapest one.
            let eligible = if eligible.is_empty() {
                vec![&layers[0]]
            } else {
                eligible
            };

            let Some(layer) = eligible
                .iter()
                .rev()
                .find(|s| s.estimated_bitrate_kbps() <= remaining)
            else {
                trace!(
                    "Budget exhausted at attendee {} ({} kbps left)",
                    preference.attendee_id, remaining
                );
                break;
            };

            remaining -= layer.estimated_bitrate_kbps();
            chosen.add(layer.stream_id);
        }

        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{IndexFrame, MediaType, StreamDescriptor};
    use crate::preference::TargetDisplaySize;

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

    fn index_of(sources: Vec<StreamDescriptor>) -> VideoStreamIndex {
        let mut index = VideoStreamIndex::new("me");
        index.integrate_index_frame(&IndexFrame {
            sources,
            num_participants: 4,
            ..Default::default()
        });
        index
    }

    fn priority_policy(budget_kbps: u32) -> VideoPriorityBasedPolicy {
        VideoPriorityBasedPolicy::new(PriorityPolicyConfig {
            max_subscriptions: 25,
            initial_downlink_estimate_kbps: budget_kbps,
        })
    }

    #[test]
    fn test_priority_order_with_stable_ties() {
        let index = index_of(vec![
            video(11, "a", 300),
            video(21, "b", 300),
            video(31, "c", 300),
        ]);
        let mut policy = priority_policy(600);
        policy.set_video_preferences(
            [
                VideoPreference::new("a", 2),
                VideoPreference::new("b", 5),
                VideoPreference::new("c", 5),
            ]
            .into_iter()
            .collect(),
        );

        assert_eq!(
            policy.choose_subscriptions(&index),
            VideoStreamIdSet::from([21, 31])
        );
    }

    #[test]
    fn test_best_layer_under_budget() {
        let index = index_of(vec![video(11, "x", 300), video(12, "x", 1200)]);
        let policy = priority_policy(1000);
        assert_eq!(
            policy.choose_subscriptions(&index),
            VideoStreamIdSet::from([11])
        );

        let generous = priority_policy(5000);
        assert_eq!(
            generous.choose_subscriptions(&index),
            VideoStreamIdSet::from([12])
        );
    }

    #[test]
    fn test_target_size_caps_layer() {
        let index = index_of(vec![video(11, "x", 300), video(12, "x", 1200)]);
        let mut policy = priority_policy(5000);
        policy.set_video_preferences(
            [VideoPreference::new("x", 1).with_target_size(TargetDisplaySize::Low)]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            policy.choose_subscriptions(&index),
            VideoStreamIdSet::from([11])
        );
    }

    #[test]
    fn test_nothing_fits_gives_empty_set() {
        let index = index_of(vec![video(11, "x", 300)]);
        let policy = priority_policy(100);
        assert!(policy.choose_subscriptions(&index).is_empty());
    }

    #[test]
    fn test_idempotent_choice() {
        let index = index_of(vec![
            video(11, "a", 300),
            video(12, "a", 1200),
            video(21, "b", 300),
        ]);
        let mut policy = priority_policy(1600);
        policy.update_metrics(&ClientMetrics {
            available_incoming_kbps: Some(1600),
            ..Default::default()
        });
        let first = policy.choose_subscriptions(&index);
        let second = policy.choose_subscriptions(&index);
        assert_eq!(first, second);
        assert_eq!(first, VideoStreamIdSet::from([12, 21]));
    }

    #[test]
    fn test_metrics_update_budget() {
        let index = index_of(vec![video(11, "x", 300), video(12, "x", 1200)]);
        let mut policy = priority_policy(5000);
        policy.update_metrics(&ClientMetrics {
            available_incoming_kbps: Some(400),
            ..Default::default()
        });
        assert_eq!(policy.downlink_estimate_kbps(), 400);
        assert_eq!(
            policy.choose_subscriptions(&index),
            VideoStreamIdSet::from([11])
        );
    }

    #[test]
    fn test_max_subscriptions() {
        let index = index_of(vec![
            video(11, "a", 100),
            video(21, "b", 100),
            video(31, "c", 100),
        ]);
        let policy = VideoPriorityBasedPolicy::new(PriorityPolicyConfig {
            max_subscriptions: 2,
            initial_downlink_estimate_kbps: 10_000,
        });
        assert_eq!(
            policy.choose_subscriptions(&index),
            VideoStreamIdSet::from([11, 21])
        );
    }

    #[test]
    fn test_preferences_for_absent_attendees_are_skipped() {
        let index = index_of(vec![video(21, "b", 300)]);
        let mut policy = priority_policy(1000);
        policy.set_video_preferences(
            [VideoPreference::new("gone", 9), VideoPreference::new("b", 1)]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            policy.choose_subscriptions(&index),
            VideoStreamIdSet::from([21])
        );
    }

    #[test]
    fn test_all_highest() {
        let index = index_of(vec![
            video(11, "a", 300),
            video(12, "a", 1200),
            video(21, "b", 300),
            video(91, "me", 1200),
        ]);
        let policy = AllHighestDownlinkPolicy::new(25);
        assert_eq!(
            policy.choose_subscriptions(&index),
            VideoStreamIdSet::from([12, 21])
        );
        assert_eq!(
            AllHighestDownlinkPolicy::new(1).choose_subscriptions(&index),
            VideoStreamIdSet::from([12])
        );
    }

    #[test]
    fn test_no_video() {
        let index = index_of(vec![video(11, "a", 300)]);
        assert!(NoVideoDownlinkPolicy.choose_subscriptions(&index).is_empty());
    }
}

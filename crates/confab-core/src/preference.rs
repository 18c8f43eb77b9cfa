//! Receive-side video preferences.

use serde::{Deserialize, Serialize};

/// Size at which a remote video is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetDisplaySize {
    /// Thumbnail
    Low,
    /// Tile
    Medium,
    /// Featured
    #[default]
    High,
}

impl TargetDisplaySize {
    /// Highest layer bitrate (kbps) worth receiving at this size
    #[must_use]
    pub fn max_bitrate_kbps(self) -> u32 {
        match self {
            Self::Low => 300,
            Self::Medium => 600,
            Self::High => 1500,
        }
    }
}

/// Preference for one remote attendee's video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoPreference {
    /// Remote attendee
    pub attendee_id: String,
    /// Priority, higher is more important
    pub priority: u32,
    /// Render size
    #[serde(default)]
    pub target_size: TargetDisplaySize,
}

impl VideoPreference {
    /// Preference at the default (largest) display size
    pub fn new(attendee_id: impl Into<String>, priority: u32) -> Self {
        Self {
            attendee_id: attendee_id.into(),
            priority,
            target_size: TargetDisplaySize::default(),
        }
    }

    /// Set the render size
    #[must_use]
    pub fn with_target_size(mut self, target_size: TargetDisplaySize) -> Self {
        self.target_size = target_size;
        self
    }
}

/// Ordered collection of preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoPreferences {
    items: Vec<VideoPreference>,
}

impl VideoPreferences {
    /// Empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a preference, replacing any earlier one for the same attendee
    pub fn add(&mut self, preference: VideoPreference) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|p| p.attendee_id == preference.attendee_id)
        {
            *existing = preference;
        } else {
            self.items.push(preference);
        }
    }

    /// Number of preferences
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no preferences
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Preferences in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &VideoPreference> {
        self.items.iter()
    }

    /// Preferences by descending priority; equal priorities keep insertion order
    #[must_use]
    pub fn highest_priority_first(&self) -> Vec<&VideoPreference> {
        let mut sorted: Vec<&VideoPreference> = self.items.iter().collect();
        // sort_by is stable
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        sorted
    }
}

impl FromIterator<VideoPreference> for VideoPreferences {
    fn from_iter<I: IntoIterator<Item = VideoPreference>>(iter: I) -> Self {
        let mut prefs = Self::new();
        for pref in iter {
            prefs.add(pref);
        }
        prefs
    }
}

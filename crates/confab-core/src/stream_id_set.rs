//! Ordered sets of stream ids.

use std::collections::BTreeSet;
use std::fmt;

/// Ordered set of stream ids.
///
/// Used for the subscribed, desired and paused sets. Operations return new
/// sets rather than mutating in place, so a set handed to a caller never
/// changes underneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VideoStreamIdSet {
    ids: BTreeSet<u32>,
}

impl VideoStreamIdSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id
    pub fn add(&mut self, id: u32) {
        self.ids.insert(id);
    }

    /// Remove an id, returning whether it was present
    pub fn remove(&mut self, id: u32) -> bool {
        self.ids.remove(&id)
    }

    /// Whether `id` is in the set
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    /// Number of ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    /// Ids in ascending order, collected
    #[must_use]
    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Set keeping only the `len` smallest ids
    #[must_use]
    pub fn truncate(&self, len: usize) -> Self {
        self.ids.iter().copied().take(len).collect()
    }

    /// Ids in either set
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        self.ids.union(&other.ids).copied().collect()
    }

    /// Ids in `self` but not in `other`
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.ids.difference(&other.ids).copied().collect()
    }

    /// Ids in both sets
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        self.ids.intersection(&other.ids).copied().collect()
    }
}

impl FromIterator<u32> for VideoStreamIdSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[u32; N]> for VideoStreamIdSet {
    fn from(ids: [u32; N]) -> Self {
        ids.into_iter().collect()
    }
}

impl fmt::Display for VideoStreamIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let a = VideoStreamIdSet::from([1, 2, 3]);
        let b = VideoStreamIdSet::from([3, 4]);

        assert_eq!(a.union(&b), VideoStreamIdSet::from([1, 2, 3, 4]));
        assert_eq!(a.difference(&b), VideoStreamIdSet::from([1, 2]));
        assert_eq!(a.intersection(&b), VideoStreamIdSet::from([3]));
        assert_eq!(a.truncate(2), VideoStreamIdSet::from([1, 2]));
        assert_eq!(a.truncate(10), a);
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut a = VideoStreamIdSet::new();
        a.add(5);
        a.add(1);
        let b: VideoStreamIdSet = [1, 5, 5].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_add_remove_contains() {
        let mut set = VideoStreamIdSet::new();
        assert!(set.is_empty());
        set.add(7);
        assert!(set.contains(7));
        assert!(set.remove(7));
        assert!(!set.remove(7));
        assert!(set.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(VideoStreamIdSet::from([3, 1]).to_string(), "[1,3]");
        assert_eq!(VideoStreamIdSet::new().to_string(), "[]");
    }
}

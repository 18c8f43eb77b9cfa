//! Observer registry with snapshot fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned when registering an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registered observers.
///
/// Notification iterates over a snapshot taken before the first callback,
/// so an observer may add or remove observers (itself included) from inside
/// a callback: every observer registered at snapshot time is called exactly
/// once and none registered later is called in that round.
pub struct ObserverSet<T: ?Sized> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Arc<T>)>>,
}

impl<T: ?Sized> Default for ObserverSet<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> ObserverSet<T> {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn add(&self, observer: Arc<T>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, observer));
        id
    }

    /// Unregister an observer; returns whether it was registered
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of observers
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no observer is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current observers
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.lock().iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    /// Call `f` for every observer in a snapshot
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        for observer in self.snapshot() {
            f(&observer);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ObserverId, Arc<T>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

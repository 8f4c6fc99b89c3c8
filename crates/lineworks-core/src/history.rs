//! Append-only, timestamp-ordered log of snapshots.
//!
//! [`History`] has a single logical writer (the recorder) and any number
//! of readers (replayer, state queries). Readers copy the entry list of
//! `Arc<Snapshot>` under a read lock, so they only ever see entries that
//! were fully built before being pushed.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::snapshot::Snapshot;

struct Inner {
    /// Instant that timestamp zero refers to. Moved forward by `clear()`.
    origin: Instant,
    entries: Vec<Arc<Snapshot>>,
}

/// Ordered snapshot log with non-decreasing timestamps.
pub struct History {
    inner: RwLock<Inner>,
}

// Compile-time assertion: History must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<History>();
};

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History").field("len", &self.len()).finish()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history whose clock starts now.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                origin: Instant::now(),
                entries: Vec::new(),
            }),
        }
    }

    /// Time elapsed on the history clock.
    pub fn elapsed(&self) -> Duration {
        self.read(|inner| inner.origin.elapsed())
    }

    /// Append a pre-built snapshot.
    ///
    /// A timestamp earlier than the last entry's is raised to it, keeping
    /// the log ordered.
    pub fn append(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = inner.entries.last() {
            if snapshot.timestamp() < last.timestamp() {
                snapshot.set_timestamp(last.timestamp());
            }
        }
        let arc = Arc::new(snapshot);
        inner.entries.push(Arc::clone(&arc));
        arc
    }

    /// Stamp, build, and append a snapshot in one critical section.
    ///
    /// `build` receives the current history-clock time (never earlier
    /// than the last entry) and runs under the write lock, so entries
    /// appended this way are ordered by the moment their state was read.
    pub fn record_with<F>(&self, build: F) -> Arc<Snapshot>
    where
        F: FnOnce(Duration) -> Snapshot,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut now = inner.origin.elapsed();
        if let Some(last) = inner.entries.last() {
            now = now.max(last.timestamp());
        }
        let mut snapshot = build(now);
        snapshot.set_timestamp(now);
        let arc = Arc::new(snapshot);
        inner.entries.push(Arc::clone(&arc));
        arc
    }

    /// Copy of the entry list at this instant.
    pub fn entries(&self) -> Vec<Arc<Snapshot>> {
        self.read(|inner| inner.entries.clone())
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.read(|inner| inner.entries.last().cloned())
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<Snapshot>> {
        self.read(|inner| inner.entries.get(index).cloned())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.read(|inner| inner.entries.len())
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and restart the clock.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.origin = Instant::now();
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        f(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(ms: u64) -> Snapshot {
        Snapshot::new(Duration::from_millis(ms))
    }

    #[test]
    fn append_keeps_order_and_clamps_regressions() {
        let history = History::new();
        history.append(at(0));
        history.append(at(100));
        let clamped = history.append(at(40));

        assert_eq!(history.len(), 3);
        assert_eq!(clamped.timestamp(), Duration::from_millis(100));
        assert_eq!(
            history.latest().unwrap().timestamp(),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn entries_are_a_stable_copy() {
        let history = History::new();
        history.append(at(1));
        let before = history.entries();
        history.append(at(2));
        assert_eq!(before.len(), 1);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn record_with_stamps_from_the_clock() {
        let history = History::new();
        history.append(at(60_000));
        // Clock is far behind the previous entry, so the stamp is raised.
        let snap = history.record_with(Snapshot::new);
        assert_eq!(snap.timestamp(), Duration::from_millis(60_000));

        history.clear();
        assert!(history.is_empty());
        let fresh = history.record_with(Snapshot::new);
        assert!(fresh.timestamp() < Duration::from_secs(60));
    }

    proptest! {
        #[test]
        fn timestamps_never_decrease(stamps in proptest::collection::vec(0u64..10_000, 0..64)) {
            let history = History::new();
            for ms in &stamps {
                history.append(at(*ms));
            }
            let entries = history.entries();
            prop_assert_eq!(entries.len(), stamps.len());
            for pair in entries.windows(2) {
                prop_assert!(pair[0].timestamp() <= pair[1].timestamp());
            }
        }
    }
}

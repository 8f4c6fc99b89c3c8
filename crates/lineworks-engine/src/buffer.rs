//! Unbounded FIFO buffer between stations.
//!
//! All buffer state (items and the waiter registration list) sits behind
//! one mutex. Wake-ups are delivered after the lock is released.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lineworks_core::{BufferId, Color, Item, WorkerId};

use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::wake::WakeSignal;

#[derive(Default)]
struct Inner {
    items: VecDeque<Item>,
    /// Oldest registration first.
    waiters: VecDeque<Arc<WakeSignal>>,
}

/// A FIFO queue of items with a single hand-off wake protocol.
///
/// Workers that find all their inputs empty [`attach`](Self::attach)
/// their [`WakeSignal`] and block on it. A [`put`](Self::put) into an
/// empty buffer removes the oldest registration and notifies only that
/// worker.
pub struct Buffer {
    id: BufferId,
    inner: Mutex<Inner>,
    notifier: ChangeNotifier,
    /// Shared across a topology; bumped on every put and take.
    activity: Arc<AtomicU64>,
}

// Compile-time assertion: Buffer must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Buffer>();
};

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("size", &inner.items.len())
            .field("waiters", &inner.waiters.len())
            .finish()
    }
}

impl Buffer {
    /// A standalone buffer that reports to nobody.
    pub fn new(id: BufferId) -> Self {
        Self::wired(id, ChangeNotifier::disabled(), Arc::default())
    }

    /// A buffer that reports changes to `notifier` and counts movement
    /// in `activity`.
    pub(crate) fn wired(id: BufferId, notifier: ChangeNotifier, activity: Arc<AtomicU64>) -> Self {
        Self {
            id,
            inner: Mutex::new(Inner::default()),
            notifier,
            activity,
        }
    }

    /// Buffer id.
    pub fn id(&self) -> &BufferId {
        &self.id
    }

    /// Append `item`.
    ///
    /// If the buffer was empty and a worker is registered, the oldest
    /// registration is removed, its signal notified, and its owner
    /// returned.
    pub fn put(&self, item: Item) -> Option<WorkerId> {
        let woken = {
            let mut inner = self.lock();
            let was_empty = inner.items.is_empty();
            inner.items.push_back(item);
            self.activity.fetch_add(1, Ordering::AcqRel);
            if was_empty {
                inner.waiters.pop_front()
            } else {
                None
            }
        };
        self.notifier.notify(ChangeEvent::Buffer(self.id.clone()));

        woken.map(|signal| {
            tracing::trace!(buffer = %self.id, worker = %signal.owner(), "hand-off wake");
            signal.notify();
            signal.owner().clone()
        })
    }

    /// Remove and return the head item. Never blocks.
    pub fn take(&self) -> Option<Item> {
        let item = {
            let mut inner = self.lock();
            let item = inner.items.pop_front();
            if item.is_some() {
                self.activity.fetch_add(1, Ordering::AcqRel);
            }
            item
        };
        if item.is_some() {
            self.notifier.notify(ChangeEvent::Buffer(self.id.clone()));
        }
        item
    }

    /// Register `signal` as waiting on this buffer.
    ///
    /// Registering the same owner twice is a no-op. Returns whether the
    /// buffer holds items right now; a caller seeing `true` must not
    /// block, since no put will wake it.
    pub fn attach(&self, signal: &Arc<WakeSignal>) -> bool {
        let mut inner = self.lock();
        if !inner.waiters.iter().any(|w| w.owner() == signal.owner()) {
            inner.waiters.push_back(Arc::clone(signal));
        }
        !inner.items.is_empty()
    }

    /// Remove the registration of `worker`, if any. Returns whether one
    /// was removed.
    pub fn detach(&self, worker: &WorkerId) -> bool {
        let mut inner = self.lock();
        let before = inner.waiters.len();
        inner.waiters.retain(|w| w.owner() != worker);
        inner.waiters.len() != before
    }

    /// Number of items held.
    pub fn size(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the buffer holds no items.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Colours of the held items, head first.
    pub fn colors(&self) -> Vec<Color> {
        self.lock().items.iter().map(Item::color).collect()
    }

    /// Number of registered waiters.
    pub fn waiter_count(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Drop every item and registration.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.items.clear();
            inner.waiters.clear();
        }
        self.notifier.notify(ChangeEvent::Buffer(self.id.clone()));
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

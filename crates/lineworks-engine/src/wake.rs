//! Per-worker wake signal.
//!
//! Each worker owns one [`WakeSignal`] and registers it with every input
//! buffer it waits on. A `put` into an empty buffer notifies exactly one
//! registered signal: a targeted hand-off rather than a broadcast.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use lineworks_core::WorkerId;

/// A latched boolean plus condition variable owned by one worker.
///
/// The flag stays set after a notification until [`reset`](Self::reset),
/// so a notify that lands before the owner starts waiting is not lost.
#[derive(Debug)]
pub struct WakeSignal {
    owner: WorkerId,
    notified: Mutex<bool>,
    cvar: Condvar,
}

impl WakeSignal {
    /// A cleared signal owned by `owner`.
    pub fn new(owner: WorkerId) -> Self {
        Self {
            owner,
            notified: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    /// The owning worker.
    pub fn owner(&self) -> &WorkerId {
        &self.owner
    }

    /// Latch the flag and wake the owner if it is waiting.
    pub fn notify(&self) {
        *self.lock() = true;
        self.cvar.notify_one();
    }

    /// Clear the flag.
    pub fn reset(&self) {
        *self.lock() = false;
    }

    /// Whether a notification is pending.
    pub fn is_notified(&self) -> bool {
        *self.lock()
    }

    /// Block until notified or until `running` is cleared.
    ///
    /// The flag is left as found; returns whether it was set on wake.
    /// Whoever clears `running` must call [`notify`](Self::notify)
    /// afterwards to release the waiter.
    pub fn wait(&self, running: &AtomicBool) -> bool {
        let guard = self
            .cvar
            .wait_while(self.lock(), |notified| {
                !*notified && running.load(Ordering::Acquire)
            })
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Like [`wait`](Self::wait) with an upper bound. Returns whether
    /// the flag was set when the wait ended.
    pub fn wait_timeout(&self, running: &AtomicBool, timeout: Duration) -> bool {
        let (guard, _) = self
            .cvar
            .wait_timeout_while(self.lock(), timeout, |notified| {
                !*notified && running.load(Ordering::Acquire)
            })
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.notified.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn notify_before_wait_is_not_lost() {
        let signal = WakeSignal::new("M1".into());
        let running = AtomicBool::new(true);
        signal.notify();
        assert!(signal.wait(&running));
        assert!(signal.is_notified());
        signal.reset();
        assert!(!signal.is_notified());
    }

    #[test]
    fn notify_releases_a_blocked_waiter() {
        let signal = Arc::new(WakeSignal::new("M1".into()));
        let running = Arc::new(AtomicBool::new(true));
        let waiter = {
            let signal = Arc::clone(&signal);
            let running = Arc::clone(&running);
            thread::spawn(move || signal.wait(&running))
        };
        thread::sleep(Duration::from_millis(20));
        signal.notify();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn stop_protocol_releases_the_waiter() {
        let signal = Arc::new(WakeSignal::new("M1".into()));
        let running = Arc::new(AtomicBool::new(true));
        let waiter = {
            let signal = Arc::clone(&signal);
            let running = Arc::clone(&running);
            thread::spawn(move || signal.wait(&running))
        };
        thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::Release);
        signal.notify();
        waiter.join().unwrap();
    }

    #[test]
    fn wait_timeout_expires_when_nothing_happens() {
        let signal = WakeSignal::new("M1".into());
        let running = AtomicBool::new(true);
        assert!(!signal.wait_timeout(&running, Duration::from_millis(5)));
    }
}

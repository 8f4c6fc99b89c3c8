//! Run-scoped cancellation.
//!
//! A [`StopHandle`] owns the only sender of a zero-capacity crossbeam
//! channel that never carries a message. Every [`StopToken`] holds a
//! receiver. Triggering the handle drops the sender, which disconnects
//! the channel and wakes every `recv_timeout` or `select!` parked on a
//! token at once. Sleeps built on tokens therefore double as
//! interruption points.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Trigger side of a stop signal.
#[derive(Debug)]
pub struct StopHandle {
    tx: Option<Sender<()>>,
    rx: Receiver<()>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    /// Create an untriggered stop signal.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self { tx: Some(tx), rx }
    }

    /// A token observing this handle.
    pub fn token(&self) -> StopToken {
        StopToken {
            rx: self.rx.clone(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn trigger(&mut self) {
        self.tx.take();
    }

    /// Whether [`trigger`](Self::trigger) has been called.
    pub fn is_triggered(&self) -> bool {
        self.tx.is_none()
    }
}

/// Observer side of a stop signal. Cheap to clone.
#[derive(Clone, Debug)]
pub struct StopToken {
    rx: Receiver<()>,
}

impl StopToken {
    /// A token that is never triggered.
    pub fn never() -> Self {
        Self {
            rx: crossbeam_channel::never(),
        }
    }

    /// Whether the owning handle has fired.
    pub fn is_stopped(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `duration` unless stopped first.
    ///
    /// Returns `true` if the full duration elapsed and `false` if the
    /// sleep was cut short by a stop.
    pub fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_stopped();
        }
        match self.rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) | Ok(()) => false,
        }
    }

    /// The underlying receiver, for use in `crossbeam_channel::select!`.
    ///
    /// A receive on it only ever completes with a disconnection error,
    /// once the handle fires.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn untriggered_sleep_runs_to_completion() {
        let handle = StopHandle::new();
        let token = handle.token();
        assert!(token.sleep(Duration::from_millis(5)));
        assert!(!token.is_stopped());
    }

    #[test]
    fn trigger_interrupts_sleepers_promptly() {
        let mut handle = StopHandle::new();
        let token = handle.token();
        let sleeper = std::thread::spawn(move || {
            let start = Instant::now();
            let completed = token.sleep(Duration::from_secs(30));
            (completed, start.elapsed())
        });

        std::thread::sleep(Duration::from_millis(20));
        handle.trigger();
        let (completed, waited) = sleeper.join().unwrap();
        assert!(!completed);
        assert!(waited < Duration::from_secs(5));
        assert!(handle.is_triggered());
    }

    #[test]
    fn triggered_token_reports_stopped_even_for_zero_sleep() {
        let mut handle = StopHandle::new();
        let token = handle.token();
        handle.trigger();
        handle.trigger();
        assert!(token.is_stopped());
        assert!(!token.sleep(Duration::ZERO));
    }

    #[test]
    fn never_token_is_never_stopped() {
        let token = StopToken::never();
        assert!(!token.is_stopped());
        assert!(token.sleep(Duration::from_millis(1)));
    }
}

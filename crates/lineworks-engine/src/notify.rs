//! State change notifications from buffers and workers to the recorder.
//!
//! Senders live on the hot path of worker threads, so the channel is
//! unbounded and sending never blocks. A disconnected receiver (no
//! recorder running) is silently ignored.

use crossbeam_channel::{Receiver, Sender};
use lineworks_core::{BufferId, WorkerId};

/// Which entity changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A worker's state or colour changed.
    Worker(WorkerId),
    /// A buffer's contents changed.
    Buffer(BufferId),
}

/// Cloneable sending half of the change channel.
#[derive(Clone, Debug, Default)]
pub struct ChangeNotifier {
    tx: Option<Sender<ChangeEvent>>,
}

impl ChangeNotifier {
    /// A connected notifier and the receiver the recorder drains.
    pub fn channel() -> (Self, Receiver<ChangeEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Send `event` without blocking.
    pub fn notify(&self, event: ChangeEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

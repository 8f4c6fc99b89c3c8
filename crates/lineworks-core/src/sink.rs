//! Event sinks: the push side towards viewers.
//!
//! The simulator never waits on a viewer. [`SinkHub`] fans each
//! [`StateView`] out to every subscriber; a subscriber whose delivery
//! fails is removed on the spot and never retried.

use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::SinkError;
use crate::view::StateView;

/// A consumer of live or replayed state.
///
/// Implementations must return promptly; anything slow belongs behind
/// a channel (see [`ChannelSink`]).
pub trait EventSink: Send + Sync {
    /// Deliver one frame.
    fn publish(&self, view: &StateView) -> Result<(), SinkError>;

    /// The live run or replay has ended.
    fn run_ended(&self) -> Result<(), SinkError>;
}

/// Message carried by a [`ChannelSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    /// A state frame.
    State(StateView),
    /// End of a run or replay.
    RunEnded,
}

/// [`EventSink`] that forwards into a bounded crossbeam channel.
///
/// Uses `try_send`, so a full queue is reported as [`SinkError::Full`]
/// instead of blocking the publisher.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<SinkEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver a viewer reads from.
    pub fn bounded(capacity: usize) -> (Self, Receiver<SinkEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) -> Result<(), SinkError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Disconnected(_) => SinkError::Disconnected,
        })
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, view: &StateView) -> Result<(), SinkError> {
        self.send(SinkEvent::State(view.clone()))
    }

    fn run_ended(&self) -> Result<(), SinkError> {
        self.send(SinkEvent::RunEnded)
    }
}

/// Fan-out over every subscribed sink.
#[derive(Default)]
pub struct SinkHub {
    sinks: Mutex<Vec<Box<dyn EventSink>>>,
}

impl std::fmt::Debug for SinkHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHub")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl SinkHub {
    /// A hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns the new subscriber count.
    pub fn subscribe(&self, sink: Box<dyn EventSink>) -> usize {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.push(sink);
        sinks.len()
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a frame to every subscriber, dropping those that fail.
    pub fn publish(&self, view: &StateView) {
        self.deliver("publish", |sink| sink.publish(view));
    }

    /// Tell every subscriber the run ended, dropping those that fail.
    pub fn notify_run_ended(&self) {
        self.deliver("run_ended", |sink| sink.run_ended());
    }

    fn deliver(&self, what: &str, f: impl Fn(&dyn EventSink) -> Result<(), SinkError>) {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sinks.len();
        sinks.retain(|sink| match f(sink.as_ref()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, event = what, "dropping event sink subscriber");
                false
            }
        });
        let dropped = before - sinks.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = sinks.len(), "sink hub pruned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::snapshot::Snapshot;
    use crate::state::SimulationMode;
    use std::time::Duration;

    fn view() -> StateView {
        StateView::project(
            &Snapshot::new(Duration::ZERO),
            &Layout::default(),
            SimulationMode::Live,
        )
    }

    #[test]
    fn publish_with_no_subscribers_is_fine() {
        let hub = SinkHub::new();
        hub.publish(&view());
        hub.notify_run_ended();
        assert!(hub.is_empty());
    }

    #[test]
    fn disconnected_subscriber_is_dropped() {
        let hub = SinkHub::new();
        let (alive, alive_rx) = ChannelSink::bounded(8);
        let (gone, gone_rx) = ChannelSink::bounded(8);
        hub.subscribe(Box::new(alive));
        hub.subscribe(Box::new(gone));
        drop(gone_rx);

        hub.publish(&view());
        assert_eq!(hub.len(), 1);
        assert!(matches!(alive_rx.try_recv(), Ok(SinkEvent::State(_))));

        hub.notify_run_ended();
        assert_eq!(alive_rx.try_recv(), Ok(SinkEvent::RunEnded));
    }

    #[test]
    fn full_subscriber_is_dropped_without_blocking() {
        let hub = SinkHub::new();
        let (slow, slow_rx) = ChannelSink::bounded(1);
        hub.subscribe(Box::new(slow));

        hub.publish(&view());
        assert_eq!(hub.len(), 1);
        hub.publish(&view());
        assert_eq!(hub.len(), 0);
        assert_eq!(slow_rx.len(), 1);
    }
}

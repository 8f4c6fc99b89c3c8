//! Snapshot recorder: turns state changes into history entries.
//!
//! During a run the recorder thread waits on the change channel, the run
//! stop token, and an optional ticker. A burst of pending change events
//! is coalesced into one capture.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use lineworks_core::{History, Layout, ModeCell, SinkHub, Snapshot, StateView, StopToken};

use crate::notify::ChangeEvent;
use crate::topology::Topology;

/// Appends snapshots to a [`History`] and forwards projections to a
/// [`SinkHub`].
#[derive(Clone, Debug)]
pub struct Recorder {
    history: Arc<History>,
    sinks: Arc<SinkHub>,
    mode: Arc<ModeCell>,
}

impl Recorder {
    /// A recorder writing to `history` and publishing to `sinks`; views
    /// are tagged with the mode read from `mode` at publish time.
    pub fn new(history: Arc<History>, sinks: Arc<SinkHub>, mode: Arc<ModeCell>) -> Self {
        Self {
            history,
            sinks,
            mode,
        }
    }

    /// The history written to.
    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    /// Capture `topology`, append, and publish. The timestamp is taken
    /// inside the history write lock.
    pub fn record(&self, topology: &Topology, layout: &Layout) -> Arc<Snapshot> {
        let snapshot = self.history.record_with(|now| topology.capture(now));
        self.sinks
            .publish(&StateView::project(&snapshot, layout, self.mode.get()));
        snapshot
    }

    /// Recorder thread body. Returns the number of snapshots taken.
    pub(crate) fn run(
        &self,
        topology: &Topology,
        layout: &Layout,
        events: &Receiver<ChangeEvent>,
        stop: &StopToken,
        interval: Option<Duration>,
    ) -> usize {
        let ticker = interval.map_or_else(crossbeam_channel::never, crossbeam_channel::tick);
        let mut recorded = 0;
        loop {
            crossbeam_channel::select! {
                recv(events) -> event => {
                    if event.is_err() {
                        break;
                    }
                    let coalesced = events.try_iter().count();
                    tracing::trace!(coalesced, "recording change");
                    self.record(topology, layout);
                    recorded += 1;
                }
                recv(ticker) -> _ => {
                    self.record(topology, layout);
                    recorded += 1;
                }
                recv(stop.receiver()) -> _ => break,
            }
        }
        recorded
    }
}

//! Id-only description of a topology, used to project snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{BufferId, WorkerId};

/// Which way a connection carries items relative to its worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// The worker takes items from the buffer.
    #[serde(alias = "input")]
    Input,
    /// The worker puts items into the buffer.
    #[serde(alias = "output")]
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("INPUT"),
            Self::Output => f.write_str("OUTPUT"),
        }
    }
}

/// One worker and the buffers it is wired to, in registration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerLayout {
    /// The worker.
    pub id: WorkerId,
    /// Buffers the worker takes from.
    pub inputs: Vec<BufferId>,
    /// Buffers the worker puts into.
    pub outputs: Vec<BufferId>,
}

/// The shape of a topology without any runtime state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    /// Workers in creation order.
    pub workers: Vec<WorkerLayout>,
    /// Buffers in creation order.
    pub buffers: Vec<BufferId>,
}

impl Layout {
    /// All connections: every input of every worker, then every output.
    pub fn connections(&self) -> impl Iterator<Item = (&WorkerId, &BufferId, Direction)> + '_ {
        let inputs = self.workers.iter().flat_map(|w| {
            w.inputs
                .iter()
                .map(move |b| (&w.id, b, Direction::Input))
        });
        let outputs = self.workers.iter().flat_map(|w| {
            w.outputs
                .iter()
                .map(move |b| (&w.id, b, Direction::Output))
        });
        inputs.chain(outputs)
    }
}

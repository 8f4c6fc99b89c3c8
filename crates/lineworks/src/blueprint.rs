//! JSON description of a topology.

use lineworks_core::{BufferId, Direction, Layout, WorkerId};
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// One worker/buffer edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDef {
    /// Worker end.
    pub worker: WorkerId,
    /// Buffer end.
    pub buffer: BufferId,
    /// `"input"` or `"output"` relative to the worker.
    pub direction: Direction,
}

/// Buffers, workers, and connections, applied in that order.
///
/// ```
/// use lineworks::Blueprint;
///
/// let bp = Blueprint::from_json_str(r#"{ "buffers": ["Q0"], "workers": [] }"#).unwrap();
/// assert_eq!(bp.buffers.len(), 1);
/// assert!(bp.connections.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blueprint {
    /// Buffer ids in creation order.
    pub buffers: Vec<BufferId>,
    /// Worker ids in creation order.
    pub workers: Vec<WorkerId>,
    /// Connections in registration order.
    pub connections: Vec<ConnectionDef>,
    /// Generator target; defaults to the first buffer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<BufferId>,
    /// Buffer counted by the completion monitor; defaults to the last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<BufferId>,
}

impl Blueprint {
    /// Parse a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ControlError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Render as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ControlError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Describe an existing layout. Entry and terminal are left at their
    /// defaults.
    pub fn from_layout(layout: &Layout) -> Self {
        Self {
            buffers: layout.buffers.clone(),
            workers: layout.workers.iter().map(|w| w.id.clone()).collect(),
            connections: layout
                .connections()
                .map(|(worker, buffer, direction)| ConnectionDef {
                    worker: worker.clone(),
                    buffer: buffer.clone(),
                    direction,
                })
                .collect(),
            entry: None,
            terminal: None,
        }
    }
}

//! Serialisable projection of a snapshot for event sinks.
//!
//! A [`StateView`] joins one [`Snapshot`] with the topology [`Layout`]
//! and the current [`SimulationMode`]. Workers or buffers that the
//! snapshot does not mention fall back to IDLE, neutral colour, and
//! empty contents, so a view is always complete for its layout.

use serde::Serialize;

use crate::id::{BufferId, WorkerId};
use crate::item::Color;
use crate::layout::{Direction, Layout};
use crate::snapshot::Snapshot;
use crate::state::{SimulationMode, WorkerState};

/// Display state of one worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerView {
    /// Worker id.
    pub id: WorkerId,
    /// Activity state.
    pub state: WorkerState,
    /// Colour of the held item, or neutral.
    pub color: Color,
    /// Input buffer ids.
    pub input_buffers: Vec<BufferId>,
    /// Output buffer ids.
    pub output_buffers: Vec<BufferId>,
}

/// Display state of one buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    /// Buffer id.
    pub id: BufferId,
    /// Number of items held.
    pub size: usize,
    /// Colours of the held items, head first.
    pub item_colors: Vec<Color>,
}

/// One edge of the topology graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    /// Worker end.
    pub worker_id: WorkerId,
    /// Buffer end.
    pub buffer_id: BufferId,
    /// Direction relative to the worker.
    #[serde(rename = "type")]
    pub direction: Direction,
}

/// Everything a viewer needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    /// Snapshot timestamp in milliseconds since the history origin.
    pub timestamp: u64,
    /// Simulation mode when the view was produced.
    pub mode: SimulationMode,
    /// Workers in layout order.
    pub machines: Vec<WorkerView>,
    /// Buffers in layout order.
    pub queues: Vec<BufferView>,
    /// All connections, inputs first.
    pub connections: Vec<ConnectionView>,
}

impl StateView {
    /// Project `snapshot` onto `layout`.
    pub fn project(snapshot: &Snapshot, layout: &Layout, mode: SimulationMode) -> Self {
        let machines = layout
            .workers
            .iter()
            .map(|w| WorkerView {
                id: w.id.clone(),
                state: snapshot.worker_state(&w.id).unwrap_or_default(),
                color: snapshot.worker_color(&w.id).unwrap_or_default(),
                input_buffers: w.inputs.clone(),
                output_buffers: w.outputs.clone(),
            })
            .collect();

        let queues = layout
            .buffers
            .iter()
            .map(|id| {
                let item_colors = snapshot
                    .buffer_contents(id)
                    .map(<[Color]>::to_vec)
                    .unwrap_or_default();
                BufferView {
                    id: id.clone(),
                    size: item_colors.len(),
                    item_colors,
                }
            })
            .collect();

        let connections = layout
            .connections()
            .map(|(worker, buffer, direction)| ConnectionView {
                worker_id: worker.clone(),
                buffer_id: buffer.clone(),
                direction,
            })
            .collect();

        Self {
            timestamp: u64::try_from(snapshot.timestamp().as_millis()).unwrap_or(u64::MAX),
            mode,
            machines,
            queues,
            connections,
        }
    }

    /// Look up a worker by id.
    pub fn machine(&self, id: &WorkerId) -> Option<&WorkerView> {
        self.machines.iter().find(|m| &m.id == id)
    }

    /// Look up a buffer by id.
    pub fn queue(&self, id: &BufferId) -> Option<&BufferView> {
        self.queues.iter().find(|q| &q.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::WorkerLayout;
    use std::time::Duration;

    fn line_layout() -> Layout {
        Layout {
            workers: vec![WorkerLayout {
                id: "M1".into(),
                inputs: vec!["Q0".into()],
                outputs: vec!["Q1".into()],
            }],
            buffers: vec!["Q0".into(), "Q1".into()],
        }
    }

    #[test]
    fn missing_entries_fall_back_to_defaults() {
        let snap = Snapshot::new(Duration::from_millis(250));
        let view = StateView::project(&snap, &line_layout(), SimulationMode::Live);

        assert_eq!(view.timestamp, 250);
        let m1 = view.machine(&"M1".into()).unwrap();
        assert_eq!(m1.state, WorkerState::Idle);
        assert!(m1.color.is_neutral());
        assert_eq!(view.queue(&"Q1".into()).unwrap().size, 0);
        assert_eq!(view.connections.len(), 2);
    }

    #[test]
    fn projection_carries_snapshot_values() {
        let red = Color::Rgb { r: 255, g: 0, b: 0 };
        let snap = Snapshot::new(Duration::ZERO)
            .with_worker("M1".into(), WorkerState::Busy, red)
            .with_buffer("Q0".into(), vec![red, red]);
        let view = StateView::project(&snap, &line_layout(), SimulationMode::Replay);

        assert_eq!(view.machine(&"M1".into()).unwrap().state, WorkerState::Busy);
        assert_eq!(view.queue(&"Q0".into()).unwrap().item_colors, vec![red, red]);
        assert_eq!(view.mode, SimulationMode::Replay);
    }

    #[test]
    fn serializes_with_viewer_field_names() {
        let snap = Snapshot::new(Duration::from_millis(5));
        let view = StateView::project(&snap, &line_layout(), SimulationMode::Stopped);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["mode"], "STOPPED");
        assert_eq!(json["machines"][0]["state"], "IDLE");
        assert_eq!(json["machines"][0]["color"], "GRAY");
        assert_eq!(json["machines"][0]["inputBuffers"][0], "Q0");
        assert_eq!(json["queues"][1]["itemColors"].as_array().unwrap().len(), 0);
        assert_eq!(json["connections"][1]["type"], "OUTPUT");
        assert_eq!(json["connections"][1]["workerId"], "M1");
    }
}

//! Core types and traits for the Lineworks production-line simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the engine and the replayer: identifiers,
//! items, worker and simulation states, snapshots and their history,
//! the projected state view pushed to event sinks, cancellation tokens,
//! and the error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod history;
pub mod id;
pub mod item;
pub mod layout;
pub mod sink;
pub mod snapshot;
pub mod state;
pub mod stop;
pub mod timing;
pub mod view;

pub use error::{ConfigError, SinkError, TransitionError};
pub use history::History;
pub use id::{BufferId, ItemId, WorkerId};
pub use item::{Color, Item};
pub use layout::{Direction, Layout, WorkerLayout};
pub use sink::{ChannelSink, EventSink, SinkEvent, SinkHub};
pub use snapshot::Snapshot;
pub use state::{ModeCell, SimulationMode, WorkerState};
pub use stop::{StopHandle, StopToken};
pub use timing::DelayRange;
pub use view::{BufferView, ConnectionView, StateView, WorkerView};

//! Lineworks: a concurrent production-line simulator.
//!
//! This is the top-level facade crate. It re-exports the sub-crates and
//! adds the [`Simulation`] control surface, TOML configuration
//! ([`SimConfig`]), and JSON topology descriptions ([`Blueprint`]).
//!
//! # Quick start
//!
//! ```rust
//! use lineworks::prelude::*;
//! use std::time::Duration;
//!
//! let config = SimConfig::from_toml_str(
//!     r#"
//!     [engine]
//!     arrival = { min_ms = 1, max_ms = 3 }
//!     service = { min_ms = 1, max_ms = 3 }
//!     grace_ms = 10
//!     poll_ms = 5
//!
//!     [replay]
//!     trailing_ms = 0
//!     "#,
//! )
//! .unwrap();
//! let sim = Simulation::new(config).unwrap();
//!
//! let blueprint = Blueprint::from_json_str(
//!     r#"{
//!         "buffers": ["Q0", "Q1"],
//!         "workers": ["M1"],
//!         "connections": [
//!             { "worker": "M1", "buffer": "Q0", "direction": "input" },
//!             { "worker": "M1", "buffer": "Q1", "direction": "output" }
//!         ]
//!     }"#,
//! )
//! .unwrap();
//! sim.apply_blueprint(&blueprint).unwrap();
//!
//! let (sink, events) = ChannelSink::bounded(1024);
//! sim.subscribe(Box::new(sink));
//! sim.start(3).unwrap();
//! while let Ok(event) = events.recv_timeout(Duration::from_secs(10)) {
//!     if event == SinkEvent::RunEnded {
//!         break;
//!     }
//! }
//! let state = sim.latest_state();
//! assert_eq!(state.queue(&"Q1".into()).unwrap().size, 3);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `lineworks-core` | ids, items, snapshots, history, views, sinks, errors |
//! | [`engine`] | `lineworks-engine` | buffers, workers, generator, recorder, orchestrator |
//! | [`replay`] | `lineworks-replay` | paced replay of recorded histories |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod blueprint;
pub mod config;
pub mod control;
pub mod error;

pub use blueprint::{Blueprint, ConnectionDef};
pub use config::SimConfig;
pub use control::Simulation;
pub use error::ControlError;

/// Core types, traits, and ids (`lineworks-core`).
pub use lineworks_core as types;

/// Live engine (`lineworks-engine`).
///
/// [`engine::Orchestrator`] owns the topology and drives runs;
/// [`engine::Topology`] and [`engine::Buffer`] are available for direct
/// use and benchmarking.
pub use lineworks_engine as engine;

/// Replay of recorded histories (`lineworks-replay`).
pub use lineworks_replay as replay;

/// Common imports for typical Lineworks usage.
///
/// ```rust
/// use lineworks::prelude::*;
/// ```
pub mod prelude {
    // Control surface
    pub use crate::{Blueprint, ControlError, SimConfig, Simulation};

    // Core types
    pub use lineworks_core::{
        BufferId, ChannelSink, Color, Direction, EventSink, SimulationMode, SinkEvent, StateView,
        WorkerId, WorkerState,
    };

    // Configuration
    pub use lineworks_core::DelayRange;
    pub use lineworks_engine::{EngineConfig, StopReport};
    pub use lineworks_replay::{ReplayConfig, ReplayOutcome, ReplayPacing};
}

//! Concurrent production-line engine.
//!
//! Provides the runtime half of Lineworks: FIFO [`Buffer`]s with a
//! single hand-off wake protocol, [`Worker`] threads cycling IDLE/BUSY,
//! the item [`Generator`], the owned [`Topology`] they live in, the
//! snapshot [`Recorder`], and the [`Orchestrator`] that starts, monitors,
//! stops, and resets a run.
//!
//! # Threads of a live run
//!
//! ```text
//! Generator ──put──▶ entry Buffer ──take──▶ Worker ──put──▶ ... ──▶ terminal Buffer
//!                        │  wake (oldest waiter)  │ status change
//!                        ▼                        ▼
//!                  ChangeNotifier ───────▶ Recorder thread ──▶ History + SinkHub
//!
//! Monitor: join Generator → grace → poll drain check → Orchestrator::stop()
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod generator;
mod monitor;
pub mod notify;
pub mod orchestrator;
pub mod recorder;
pub mod topology;
pub mod wake;
pub mod worker;

pub use buffer::Buffer;
pub use config::EngineConfig;
pub use error::EngineError;
pub use generator::Generator;
pub use notify::{ChangeEvent, ChangeNotifier};
pub use orchestrator::{Orchestrator, StopReport};
pub use recorder::Recorder;
pub use topology::{DrainReason, Topology};
pub use wake::WakeSignal;
pub use worker::{Worker, WorkerReport, WorkerStatus};

//! Paced replay of recorded snapshot histories.
//!
//! A [`Replayer`] walks a copy of a [`History`](lineworks_core::History)
//! on its own thread and pushes each entry to the sink hub, either at its
//! recorded relative time or at a fixed interval.
//!
//! # Timing
//!
//! ```text
//! entry:     0        1              2         (end)
//! recorded:  t0       t1             t2
//! emitted:   start    start+(t1-t0)  start+(t2-t0)  +trailing → STOPPED
//! ```
//!
//! Each emission is scheduled against the replay start, so sink latency
//! does not accumulate into drift.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod replayer;

pub use config::{ReplayConfig, ReplayPacing};
pub use error::ReplayError;
pub use replayer::{ReplayOutcome, Replayer};

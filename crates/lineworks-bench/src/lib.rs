//! Benchmark profiles and utilities for Lineworks.
//!
//! - [`line_topology`]: a straight line of `stations` workers
//! - [`fan_out_topology`]: one splitter feeding `width` parallel workers
//!   that merge into a single terminal buffer
//! - [`zero_delay_config`]: engine settings with every delay removed
//! - [`colored_items`]: deterministic items via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use lineworks_core::{Color, ConfigError, DelayRange, Item, ItemId};
use lineworks_engine::{EngineConfig, EngineError, Orchestrator, Topology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Build `Q0 → M1 → Q1 → … → M{stations} → Q{stations}`.
pub fn line_topology(stations: usize) -> Result<Topology, ConfigError> {
    let mut topology = Topology::new();
    let mut upstream = topology.create_buffer("Q0")?;
    for i in 1..=stations {
        let worker = topology.create_worker(format!("M{i}"))?;
        let downstream = topology.create_buffer(format!("Q{i}"))?;
        topology.connect_input(&worker, &upstream)?;
        topology.connect_output(&worker, &downstream)?;
        upstream = downstream;
    }
    Ok(topology)
}

/// Build the same line on an orchestrator.
pub fn line_orchestrator(
    stations: usize,
    config: EngineConfig,
) -> Result<Orchestrator, EngineError> {
    let orchestrator = Orchestrator::new(config)?;
    let mut upstream = orchestrator.create_buffer("Q0")?;
    for i in 1..=stations {
        let worker = orchestrator.create_worker(format!("M{i}"))?;
        let downstream = orchestrator.create_buffer(format!("Q{i}"))?;
        orchestrator.connect_input(&worker, &upstream)?;
        orchestrator.connect_output(&worker, &downstream)?;
        upstream = downstream;
    }
    Ok(orchestrator)
}

/// Build a splitter `S` from `Q0` into branch buffers `B1..B{width}`,
/// each drained by its own worker `P{i}` into the shared buffer `OUT`.
pub fn fan_out_topology(width: usize) -> Result<Topology, ConfigError> {
    let mut topology = Topology::new();
    let entry = topology.create_buffer("Q0")?;
    let splitter = topology.create_worker("S")?;
    topology.connect_input(&splitter, &entry)?;
    let mut branches = Vec::with_capacity(width);
    for i in 1..=width {
        let branch = topology.create_buffer(format!("B{i}"))?;
        topology.connect_output(&splitter, &branch)?;
        branches.push(branch);
    }
    let out = topology.create_buffer("OUT")?;
    for (i, branch) in branches.iter().enumerate() {
        let worker = topology.create_worker(format!("P{}", i + 1))?;
        topology.connect_input(&worker, branch)?;
        topology.connect_output(&worker, &out)?;
    }
    Ok(topology)
}

/// Engine settings with no arrival, service, start, or grace delay.
pub fn zero_delay_config(seed: u64) -> EngineConfig {
    EngineConfig {
        seed,
        arrival: DelayRange::fixed(0),
        service: DelayRange::fixed(0),
        start_delay_ms: 0,
        grace_ms: 0,
        poll_ms: 1,
        snapshot_interval_ms: None,
    }
}

/// `count` items with seeded random colours, numbered from 1.
pub fn colored_items(count: usize, seed: u64) -> Vec<Item> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (1..=count as u64)
        .map(|n| Item::new(ItemId(n), Color::random(&mut rng)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_validate() {
        line_topology(8).unwrap().validate().unwrap();
        fan_out_topology(4).unwrap().validate().unwrap();
        zero_delay_config(1).validate().unwrap();
    }

    #[test]
    fn fan_out_shape() {
        let topology = fan_out_topology(3).unwrap();
        assert_eq!(topology.worker_count(), 4);
        assert_eq!(topology.terminal_id().map(|b| b.as_str()), Some("OUT"));
    }

    #[test]
    fn items_are_deterministic() {
        assert_eq!(colored_items(16, 9), colored_items(16, 9));
        assert_eq!(colored_items(3, 9)[2].id(), ItemId(3));
    }
}

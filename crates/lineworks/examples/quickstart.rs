//! Run a three-station line with a fan-out, then replay it.
//!
//! ```text
//! cargo run --example quickstart -- [config.toml]
//! ```
//!
//! Set `RUST_LOG` to change verbosity (default `info,lineworks=debug`).

use std::time::Duration;

use lineworks::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const BLUEPRINT: &str = r#"{
    "buffers": ["Q0", "Q1", "Q2", "Q3"],
    "workers": ["M1", "M2", "M3"],
    "connections": [
        { "worker": "M1", "buffer": "Q0", "direction": "input" },
        { "worker": "M1", "buffer": "Q1", "direction": "output" },
        { "worker": "M1", "buffer": "Q2", "direction": "output" },
        { "worker": "M2", "buffer": "Q1", "direction": "input" },
        { "worker": "M2", "buffer": "Q3", "direction": "output" },
        { "worker": "M3", "buffer": "Q2", "direction": "input" },
        { "worker": "M3", "buffer": "Q3", "direction": "output" }
    ]
}"#;

const DEFAULT_CONFIG: &str = r#"
[engine]
seed = 7
arrival = { min_ms = 20, max_ms = 60 }
service = { min_ms = 10, max_ms = 40 }
grace_ms = 200
poll_ms = 50

[replay]
pacing = { mode = "recorded" }
trailing_ms = 100
"#;

fn main() -> Result<(), ControlError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lineworks=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    let sim = Simulation::new(config)?;
    sim.apply_blueprint(&Blueprint::from_json_str(BLUEPRINT)?)?;

    let (sink, events) = ChannelSink::bounded(4096);
    sim.subscribe(Box::new(sink));

    sim.start(10)?;
    let frames = wait_for_end(&events);
    let state = sim.latest_state();
    tracing::info!(
        frames,
        history = sim.history().len(),
        terminal = state.queue(&"Q3".into()).map_or(0, |q| q.size),
        "live run finished"
    );

    sim.replay()?;
    let frames = wait_for_end(&events);
    tracing::info!(frames, mode = %sim.mode(), "replay finished");

    println!("{}", sim.blueprint().to_json_string()?);
    Ok(())
}

/// Drain frames until the run-ended notice. Returns the frame count.
fn wait_for_end(events: &crossbeam_channel::Receiver<SinkEvent>) -> usize {
    let mut frames = 0;
    while let Ok(event) = events.recv_timeout(Duration::from_secs(30)) {
        match event {
            SinkEvent::State(_) => frames += 1,
            SinkEvent::RunEnded => break,
        }
    }
    frames
}

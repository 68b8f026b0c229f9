// demos/session.rs
// Run with:
//   cargo run --example session --features scenario-session
//
// Tunes the gains on a short synthetic episode, then simulates a day with
// a two-step reference schedule using the tuned gains.

use std::cell::Cell;

use thermo_loop::config::{AmbientSource, SimConfig};
use thermo_loop::scenarios::{SessionConfig, tune_and_simulate};
use thermo_loop::systems::pid::ControlPolicy;
use thermo_loop::systems::plant::PlantParams;
use thermo_loop::systems::sdk::CancelToken;
use thermo_loop::systems::sensors::FaultMode;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut cfg = SimConfig {
        plant: PlantParams { gain: 25.0, time_constant: 900.0, step_size: 30.0 },
        ambient: AmbientSource::Synthetic { temperatures: vec![-5.0, 2.0, -3.0], hours: 24 },
        session: SessionConfig { passes: 2, start_from_control_gains: false },
        ..SimConfig::default()
    };
    cfg.sensors.fault = FaultMode::Overheated;
    cfg.sensors.weighted_mean = true;
    cfg.control.policy = ControlPolicy::clipped_threshold();
    cfg.control.references = vec![19.0, 21.0];
    cfg.control.control_period = 4;
    cfg.validate()?;

    let ambient = cfg.ambient.resolve(None)?;
    let shown = Cell::new(0u8);
    let progress = |p: u8| {
        if p >= shown.get().saturating_add(10) {
            eprintln!("session {p:>3}%");
            shown.set(p);
        }
    };
    let out = tune_and_simulate(&cfg, ambient, &CancelToken::new(), &progress)?;

    println!("== Session Outcome ==");
    for (i, pass) in out.passes.iter().enumerate() {
        println!("pass {i}: reference {:.1} °C", pass.reference);
        println!("  tuned θ -> {:?}", pass.tuning.theta);
        println!("  best    -> {:?}", pass.tuning.obs.best);
        if let Some(sim) = &pass.simulation {
            println!("  sim   π -> {:?}", sim.obs);
        }
    }
    println!("final gains -> {:?}", out.gains);
    Ok(())
}

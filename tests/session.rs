// tests/session.rs
use std::cell::Cell;

use thermo_loop::Exit;
use thermo_loop::config::{AmbientSource, SimConfig};
use thermo_loop::scenarios::{SessionConfig, tune_and_simulate};
use thermo_loop::systems::pid::Gains;
use thermo_loop::systems::plant::PlantParams;
use thermo_loop::systems::sdk::{CancelToken, ProgressGauge, Quiet};

fn config(passes: usize) -> SimConfig {
    let mut cfg = SimConfig {
        plant: PlantParams { gain: 25.0, time_constant: 900.0, step_size: 60.0 },
        ambient: AmbientSource::Synthetic { temperatures: vec![0.0, 4.0], hours: 3 },
        session: SessionConfig { passes, start_from_control_gains: false },
        ..SimConfig::default()
    };
    cfg.tuner.iterations = 10;
    cfg.tuner.episode_time_constants = 0.2;
    cfg.control.references = vec![19.0, 21.0];
    cfg
}

#[test]
fn single_pass_tunes_then_simulates_with_tuned_gains() {
    let cfg = config(1);
    let ambient = cfg.ambient.resolve(None).unwrap();
    let out = tune_and_simulate(&cfg, ambient, &CancelToken::new(), &Quiet).unwrap();

    assert_eq!(out.exit, Exit::Exhausted);
    assert_eq!(out.passes.len(), 1);
    let pass = &out.passes[0];
    assert_eq!(pass.reference, 19.0);
    assert_eq!(pass.tuning.iters, 10);
    assert_eq!(out.gains, pass.tuning.theta);

    let sim = out.last_simulation().expect("simulation ran");
    assert_eq!(sim.theta.len(), 60 * 2 + 1);
    assert!(sim.theta.room.iter().all(|t| t.is_finite()));
}

#[test]
fn passes_walk_the_reference_schedule() {
    let cfg = config(3);
    let ambient = cfg.ambient.resolve(None).unwrap();
    let gauge = ProgressGauge::new();
    let out = tune_and_simulate(&cfg, ambient, &CancelToken::new(), &gauge).unwrap();

    let refs: Vec<f64> = out.passes.iter().map(|p| p.reference).collect();
    assert_eq!(refs, vec![19.0, 21.0, 21.0]);
    assert_eq!(gauge.get(), 100);
    // each pass starts from the previous pass' gains
    assert_eq!(out.passes[2].tuning.obs.history.len(), 10);
    assert!(out.passes.iter().all(|p| p.simulation.is_some()));
}

#[test]
fn cancel_during_tuning_skips_simulation() {
    let cfg = config(2);
    let ambient = cfg.ambient.resolve(None).unwrap();
    let cancel = CancelToken::new();
    let calls = Cell::new(0u32);
    let progress = |_p: u8| {
        calls.set(calls.get() + 1);
        if calls.get() == 3 {
            cancel.cancel();
        }
    };
    let out = tune_and_simulate(&cfg, ambient, &cancel, &progress).unwrap();
    assert_eq!(out.exit, Exit::Cancelled);
    assert_eq!(out.passes.len(), 1);
    assert!(out.passes[0].tuning.cancelled());
    assert!(out.passes[0].simulation.is_none());
    assert!(out.last_simulation().is_none());
    assert!(out.gains.is_finite());
}

#[test]
fn seeding_from_control_gains_is_checked_against_bounds() {
    let mut cfg = config(1);
    cfg.session.start_from_control_gains = true;
    cfg.control.gains = Gains::new(500.0, 0.0, 0.0);
    let ambient = cfg.ambient.resolve(None).unwrap();
    assert!(tune_and_simulate(&cfg, ambient, &CancelToken::new(), &Quiet).is_err());
}

#[test]
fn zero_passes_is_a_configuration_error() {
    let cfg = config(0);
    let ambient = AmbientSource::default().resolve(None).unwrap();
    assert!(tune_and_simulate(&cfg, ambient, &CancelToken::new(), &Quiet).is_err());
    assert!(cfg.validate().is_err());
}

#[test]
fn progress_spans_are_monotonic() {
    let cfg = config(2);
    let ambient = cfg.ambient.resolve(None).unwrap();
    let last = Cell::new(0u8);
    let sink = |p: u8| {
        assert!(p >= last.get(), "progress went back from {} to {p}", last.get());
        last.set(p);
    };
    tune_and_simulate(&cfg, ambient, &CancelToken::new(), &sink).unwrap();
    assert_eq!(last.get(), 100);
}

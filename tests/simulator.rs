// tests/simulator.rs
use std::cell::RefCell;

use thermo_loop::Exit;
use thermo_loop::config::{AmbientSource, SimConfig};
use thermo_loop::systems::ambient::AmbientSeries;
use thermo_loop::systems::pid::{ControlPolicy, Gains, Heater};
use thermo_loop::systems::plant::PlantParams;
use thermo_loop::systems::sdk::{CancelToken, Progress, ProgressGauge, Quiet};
use thermo_loop::error::{ConfigError, ThermoError};
use thermo_loop::systems::simulator::{MAX_HORIZON, Simulation, Trace, TraceRow, horizon_len};

/// One simulated hour per ambient sample at Δt = 60 s.
fn short_config() -> SimConfig {
    SimConfig {
        plant: PlantParams { gain: 25.0, time_constant: 900.0, step_size: 60.0 },
        ambient: AmbientSource::Synthetic { temperatures: vec![0.0, 4.0], hours: 4 },
        ..SimConfig::default()
    }
}

fn run(cfg: SimConfig) -> thermo_loop::systems::sdk::Outcome<Trace, thermo_loop::systems::simulator::TraceSummary> {
    Simulation::from_config(cfg).unwrap().run(&CancelToken::new(), &Quiet).unwrap()
}

#[test]
fn trace_columns_match_horizon() {
    let sim = Simulation::from_config(short_config()).unwrap();
    assert_eq!(sim.horizon(), 60 * 3 + 1);
    assert_eq!(Some(sim.horizon()), horizon_len(60, sim.ambient()));

    let out = sim.run(&CancelToken::new(), &Quiet).unwrap();
    let tr = &out.theta;
    assert_eq!(out.exit, Exit::Exhausted);
    assert_eq!(out.iters, sim.horizon());
    for len in [tr.time.len(), tr.room.len(), tr.ambient.len(), tr.reference.len(), tr.measured.len(), tr.heater.len()] {
        assert_eq!(len, sim.horizon());
    }
    assert_eq!(tr.time[0], 0.0);
    assert_eq!(*tr.time.last().unwrap(), 3.0);
}

#[test]
fn ambient_column_interpolates_profile() {
    let out = run(short_config());
    let tr = &out.theta;
    // samples [0, 0, 4, 4]: flat, ramp over hour 1..2, flat
    assert_eq!(tr.ambient[30], 0.0);
    assert!((tr.ambient[90] - 2.0).abs() < 1e-12);
    assert_eq!(tr.ambient[150], 4.0);
}

#[test]
fn closed_loop_holds_room_near_reference() {
    let out = run(short_config());
    let tr = &out.theta;
    let tail = &tr.room[tr.len() / 2..];
    assert!(tail.iter().all(|t| (t - 20.0).abs() < 3.0), "room left the band: {tail:?}");
    assert!(tr.heater.iter().any(|h| *h == Heater::On));
    assert!(tr.heater.iter().any(|h| *h == Heater::Off));
    assert!(out.obs.duty_cycle > 0.0 && out.obs.duty_cycle < 1.0);
}

#[test]
fn reference_schedule_advances_and_clamps() {
    let mut cfg = short_config();
    cfg.control.references = vec![18.0, 20.0, 22.0];
    let out = run(cfg);
    let refs = &out.theta.reference;
    // block = ceil(181 / 3) = 61
    assert_eq!(refs[60], 18.0);
    assert_eq!(refs[61], 20.0);
    assert_eq!(refs[122], 22.0);
    assert_eq!(*refs.last().unwrap(), 22.0);
    let mut distinct = refs.clone();
    distinct.dedup();
    assert_eq!(distinct, vec![18.0, 20.0, 22.0]);
}

#[test]
fn more_set_points_than_blocks_clamps_at_last() {
    let mut cfg = short_config();
    cfg.ambient = AmbientSource::Synthetic { temperatures: vec![0.0], hours: 1 };
    cfg.control.references = vec![18.0, 19.0, 20.0];
    let out = run(cfg);
    // horizon 1: the schedule never advances
    assert_eq!(out.theta.reference, vec![18.0]);
}

#[test]
fn cancellation_returns_partial_trace() {
    let sim = Simulation::from_config(short_config()).unwrap();
    let cancel = CancelToken::new();
    let steps = RefCell::new(0usize);
    let progress = |_p: u8| {
        *steps.borrow_mut() += 1;
        if *steps.borrow() == 25 {
            cancel.cancel();
        }
    };
    let out = sim.run(&cancel, &progress).unwrap();
    assert_eq!(out.exit, Exit::Cancelled);
    assert!(out.cancelled());
    assert_eq!(out.theta.len(), 25);
    assert_eq!(out.iters, 25);
}

#[test]
fn progress_is_monotonic_and_finishes() {
    let sim = Simulation::from_config(short_config()).unwrap();
    let gauge = ProgressGauge::new();
    let seen = RefCell::new(Vec::new());
    let sink = |p: u8| {
        gauge.report(p);
        seen.borrow_mut().push(p);
    };
    sim.run(&CancelToken::new(), &sink).unwrap();
    let seen = seen.into_inner();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(gauge.get(), 100);
}

#[test]
fn rows_survive_json_round_trip() {
    let out = run(short_config());
    let rows: Vec<TraceRow> = out.theta.rows().collect();
    let text = serde_json::to_string(&rows).unwrap();
    let back: Vec<TraceRow> = serde_json::from_str(&text).unwrap();
    assert_eq!(back.len(), out.theta.len());
    let rebuilt = Trace::from_rows(back);
    let close = |a: &[f64], b: &[f64]| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= 1e-12 * (1.0 + x.abs()));
    assert!(close(&rebuilt.time, &out.theta.time));
    assert!(close(&rebuilt.room, &out.theta.room));
    assert!(close(&rebuilt.ambient, &out.theta.ambient));
    assert!(close(&rebuilt.reference, &out.theta.reference));
    assert!(close(&rebuilt.measured, &out.theta.measured));
    assert_eq!(rebuilt.heater, out.theta.heater);
}

#[test]
fn same_seed_same_trace() {
    let mut cfg = short_config();
    cfg.sensors.weighted_mean = true;
    cfg.sensors.fault = thermo_loop::systems::sensors::FaultMode::FaultyConnection;
    assert_eq!(run(cfg.clone()).theta, run(cfg).theta);
}

#[test]
fn clipped_threshold_policy_runs_and_stays_finite() {
    let mut cfg = short_config();
    cfg.control.policy = ControlPolicy::clipped_threshold();
    cfg.control.gains = Gains::new(0.5, 0.01, 0.0);
    cfg.control.control_period = 4;
    cfg.control.measure_period = 2;
    let out = run(cfg);
    assert!(out.theta.room.iter().all(|t| t.is_finite()));
    assert!(out.obs.mean_abs_error.is_finite());
}

#[test]
fn invalid_configuration_prevents_run() {
    let mut cfg = short_config();
    cfg.control.references.clear();
    assert!(Simulation::from_config(cfg).is_err());

    let mut cfg = short_config();
    cfg.plant.time_constant = 0.0;
    let ambient = AmbientSeries::from_samples(vec![0.0, 1.0]).unwrap();
    assert!(Simulation::new(cfg, ambient).is_err());
}

#[test]
fn tiny_step_size_is_rejected_before_allocating() {
    let mut cfg = short_config();
    cfg.plant.step_size = 1e-13;
    cfg.ambient = AmbientSource::Synthetic { temperatures: vec![0.0, 4.0], hours: 24 };
    match Simulation::from_config(cfg) {
        Err(ThermoError::Config(ConfigError::InvalidField { field, .. })) => assert_eq!(field, "plant.step_size"),
        other => panic!("expected plant.step_size rejection, got {other:?}"),
    }

    let ambient = AmbientSeries::from_samples(vec![0.0, 1.0, 2.0]).unwrap();
    assert_eq!(horizon_len(usize::MAX, &ambient), None);
    assert!(horizon_len(MAX_HORIZON, &ambient).unwrap() > MAX_HORIZON);
}

#[test]
fn non_finite_gains_are_rejected() {
    let sim = Simulation::from_config(short_config()).unwrap();
    for gains in [
        Gains { p: f64::NAN, i: 0.0, d: 0.0 },
        Gains { p: 1.0, i: f64::INFINITY, d: 0.0 },
        Gains { p: 1.0, i: 0.0, d: f64::NEG_INFINITY },
    ] {
        match sim.clone().with_gains(gains) {
            Err(ThermoError::Config(ConfigError::InvalidField { field, .. })) => assert_eq!(field, "control.gains"),
            other => panic!("expected control.gains rejection, got {:?}", other.map(|s| s.horizon())),
        }
    }

    let tuned = Gains { p: 2.0, i: 0.01, d: 0.0 };
    let out = sim.with_gains(tuned).unwrap().run(&CancelToken::new(), &Quiet).unwrap();
    assert_eq!(out.exit, Exit::Exhausted);
}

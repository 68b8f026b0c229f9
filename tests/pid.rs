// tests/pid.rs
use thermo_loop::systems::pid::{ControlPolicy, Decision, ErrorScaling, Gains, Heater, PidController};

fn tick_once(gains: Gains, policy: ControlPolicy, measured: f64, reference: f64) -> Heater {
    let mut c = PidController::new(gains, policy, 1, measured);
    c.record(measured);
    c.tick(reference).heater
}

#[test]
fn dead_band_forces_heater_outside_the_band() {
    let policy = ControlPolicy::dead_band(1.0);
    for gains in [Gains::new(0.0, 0.0, 0.0), Gains::new(-50.0, -5.0, -50.0), Gains::new(50.0, 5.0, 50.0)] {
        assert_eq!(tick_once(gains, policy, 18.0, 20.0), Heater::On, "{gains:?}");
        assert_eq!(tick_once(gains, policy, 22.0, 20.0), Heater::Off, "{gains:?}");
    }
}

#[test]
fn dead_band_boundary_is_inside_the_band() {
    let policy = ControlPolicy::dead_band(1.0);
    // err == clamp: the PID sum decides.
    assert_eq!(policy.decide(1.0, 0.5), Heater::On);
    assert_eq!(policy.decide(1.0, -0.5), Heater::Off);
    assert_eq!(policy.decide(-1.0, 0.5), Heater::On);
    assert_eq!(policy.decide(-1.0, 0.0), Heater::Off);
    assert_eq!(tick_once(Gains::new(-1.0, 0.0, 0.0), policy, 19.0, 20.0), Heater::Off);
}

#[test]
fn clipped_threshold_switches_above_half() {
    let policy = ControlPolicy::clipped_threshold();
    assert_eq!(policy.decide(0.0, 0.5), Heater::Off);
    assert_eq!(policy.decide(0.0, 0.51), Heater::On);
    assert_eq!(policy.decide(-10.0, 7.0), Heater::On);
    assert_eq!(policy.decide(10.0, -7.0), Heater::Off);
}

#[test]
fn scaling_conventions_differ_only_by_period() {
    let gains = Gains::new(0.0, 1.0, 1.0);
    let mut tick = PidController::new(gains, ControlPolicy::clipped_threshold().with_scaling(ErrorScaling::PerTick), 4, 0.0);
    let mut period = PidController::new(gains, ControlPolicy::clipped_threshold(), 4, 0.0);
    for c in [&mut tick, &mut period] {
        c.record(18.0);
    }
    let a = tick.tick(20.0);
    let b = period.tick(20.0);
    assert_eq!(a.integral, 2.0);
    assert_eq!(b.integral, 8.0);
    assert_eq!(a.derivative, 2.0);
    assert_eq!(b.derivative, 0.5);
}

#[test]
fn integral_and_previous_error_persist_across_ticks() {
    let mut c = PidController::new(Gains::new(0.0, 1.0, 0.0), ControlPolicy::dead_band(5.0), 1, 0.0);
    for _ in 0..3 {
        c.record(19.0);
        c.tick(20.0);
    }
    assert_eq!(c.integral(), 3.0);
    assert_eq!(c.heater(), Heater::On);
}

#[test]
fn gains_and_heater_serialize_by_name() {
    let g: Gains = toml::from_str("p = 2.0\ni = 0.1\nd = 0.0\n").unwrap();
    assert_eq!(g, Gains::new(2.0, 0.1, 0.0));
    assert_eq!(serde_json::to_string(&Heater::On).unwrap(), "\"on\"");
    let d: Decision = toml::from_str("decision = \"clipped-threshold\"\n").unwrap();
    assert_eq!(d, Decision::ClippedThreshold);
}

// tests/sensors.rs
use thermo_loop::mechanics::{MIN_DISAGREEMENT, disagreement_weights, mean, weighted_mean};
use thermo_loop::systems::sensors::{FaultMode, SENSOR_SIGMA, SensorArray, SensorConfig, fuse};

fn array(count: usize, fault: FaultMode, weighted_mean: bool, seed: u64) -> SensorArray {
    SensorArray::new(SensorConfig { count, fault, weighted_mean, seed }).unwrap()
}

#[test]
fn weighted_fusion_pulls_toward_agreeing_sensors() {
    let xs = [10.0, 10.0, 20.0];
    let w = disagreement_weights(&xs);
    assert!((w[0] - 4.0 / 9.0).abs() < 1e-12);
    assert!((w[1] - 4.0 / 9.0).abs() < 1e-12);
    assert!((w[2] - 1.0 / 9.0).abs() < 1e-12);

    let plain = mean(&xs);
    let weighted = weighted_mean(&xs);
    assert!((plain - 13.333_333).abs() < 1e-5);
    assert!((weighted - 11.111_111).abs() < 1e-5);
    assert!((weighted - 10.0).abs() < (plain - 10.0).abs());
}

#[test]
fn identical_readings_keep_weights_finite() {
    let xs = [21.5; 4];
    let w = disagreement_weights(&xs);
    assert!(w.iter().all(|w| w.is_finite()));
    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    assert_eq!(weighted_mean(&xs), 21.5);
    assert!(MIN_DISAGREEMENT > 0.0);
}

#[test]
fn fuse_switches_on_the_toggle_and_count() {
    let xs = [10.0, 10.0, 20.0];
    assert_eq!(fuse(&xs, false), mean(&xs));
    assert_eq!(fuse(&xs, true), weighted_mean(&xs));
    assert_eq!(fuse(&[3.0], true), 3.0);
}

#[test]
fn fused_mean_converges_to_true_temperature() {
    // Each fused reading averages 5 draws: σ_fused = 0.2/√5.
    let truth = 21.0;
    let trials = 4_000;
    let mut s = array(5, FaultMode::None, false, 7);
    let total: f64 = (0..trials).map(|_| s.measure(truth)).sum();
    let estimate = total / trials as f64;
    let bound = 4.0 * SENSOR_SIGMA / (5.0 * trials as f64).sqrt();
    assert!((estimate - truth).abs() < bound, "estimate {estimate}, bound {bound}");
}

#[test]
fn overheated_sensor_biases_plain_mean_more_than_weighted() {
    let truth = 20.0;
    let trials = 2_000;
    let mut plain = array(5, FaultMode::Overheated, false, 11);
    let mut weighted = array(5, FaultMode::Overheated, true, 11);
    let bias = |s: &mut SensorArray| (0..trials).map(|_| s.measure(truth) - truth).sum::<f64>() / trials as f64;
    let (bp, bw) = (bias(&mut plain), bias(&mut weighted));
    assert!((bp - 1.0).abs() < 0.1, "plain bias {bp}");
    assert!(bw < bp, "weighted {bw} vs plain {bp}");
}

#[test]
fn faulty_connection_only_adds_positive_offsets() {
    let mut s = array(3, FaultMode::FaultyConnection, false, 3);
    let mut offsets = 0;
    for _ in 0..500 {
        let xs = s.readings(15.0);
        // healthy noise stays well inside ±1 °C
        assert!(xs[0] > 14.0 && xs[0] < 21.0);
        if xs[0] > 16.0 {
            offsets += 1;
        }
    }
    assert!(offsets > 100 && offsets < 300, "offset reads {offsets}/500");
}

mod props {
    use proptest::prelude::*;
    use thermo_loop::mechanics::{disagreement_weights, weighted_mean};

    proptest! {
        /// Weights are a probability vector and the fused value stays inside the readings.
        #[test]
        fn weighted_mean_is_a_convex_combination(xs in prop::collection::vec(-50.0f64..50.0, 2..12)) {
            let w = disagreement_weights(&xs);
            prop_assert!(w.iter().all(|w| w.is_finite() && *w >= 0.0));
            prop_assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);

            let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let m = weighted_mean(&xs);
            prop_assert!(m >= lo - 1e-9 && m <= hi + 1e-9, "{m} outside [{lo}, {hi}]");
        }
    }
}

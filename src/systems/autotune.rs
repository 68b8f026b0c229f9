// src/systems/autotune.rs
#![cfg(feature = "system-autotune")]

//! Gradient-based PID gain tuner.
//!
//! Each outer iteration runs one short synthetic **episode**: the plant starts
//! below the reference, the ambient is fixed (constant or slowly drifting),
//! and the controller ticks every `control_period` steps. The hard heater
//! threshold is replaced by a steep [`Sigmoid`] so the plant temperature is a
//! differentiable function of the gains.
//!
//! Alongside the forward simulation the episode carries a [`Sensitivity`]
//! state: the first and (diagonal) second derivative of the plant
//! temperature with respect to each gain, plus the matching derivatives of
//! the integral and previous-error accumulators. The Euler update is linear
//! in the temperature, so for gain `k`
//!
//! ```text
//! y1[k] ← decay·y1[k] + input_gain·σ'(g)·∂g/∂k
//! y2[k] ← decay·y2[k] + input_gain·(σ''(g)·(∂g/∂k)² + σ'(g)·∂²g/∂k²)
//! ```
//!
//! with `decay = 1 − Δt/τ` and `input_gain = K·Δt/τ`. Every step adds the
//! tracking error's contribution to the loss gradient and Hessian diagonal.
//! At the end of the episode the gains take a Newton or a scaled gradient
//! step, clipped to a trust region and to absolute bounds.
//!
//! The tuner returns the gains of the episode with the smallest cumulative
//! |error|, which is not necessarily the last one.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::mechanics::{Sigmoid, control};
use crate::systems::pid::{ErrorScaling, Gains};
use crate::systems::plant::{PlantParams, ThermalPlant};
use crate::systems::sdk::{CancelToken, Outcome, Progress};
use crate::refine_until;

/// Outdoor temperature during an episode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EpisodeAmbient {
    Constant { temperature: f64 },
    /// `reference − below_reference·K − amplitude·sin(2π·t/period)`, t in s.
    Drifting { below_reference: f64, amplitude: f64, period: f64 },
}

impl Default for EpisodeAmbient {
    fn default() -> Self {
        EpisodeAmbient::Drifting { below_reference: 0.25, amplitude: 1.0, period: 7200.0 }
    }
}

impl EpisodeAmbient {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match *self {
            EpisodeAmbient::Constant { temperature } if !temperature.is_finite() => {
                Err(ConfigError::invalid("tuner.ambient.temperature", temperature, "must be finite"))
            }
            EpisodeAmbient::Constant { .. } => Ok(()),
            EpisodeAmbient::Drifting { below_reference, amplitude, period } => {
                if !below_reference.is_finite() {
                    return Err(ConfigError::invalid("tuner.ambient.below_reference", below_reference, "must be finite"));
                }
                if !amplitude.is_finite() {
                    return Err(ConfigError::invalid("tuner.ambient.amplitude", amplitude, "must be finite"));
                }
                if !(period.is_finite() && period > 0.0) {
                    return Err(ConfigError::invalid("tuner.ambient.period", period, "must be > 0"));
                }
                Ok(())
            }
        }
    }

    pub fn at(&self, reference: f64, gain: f64, seconds: f64) -> f64 {
        match *self {
            EpisodeAmbient::Constant { temperature } => temperature,
            EpisodeAmbient::Drifting { below_reference, amplitude, period } => {
                let phase = 2.0 * std::f64::consts::PI * seconds / period;
                reference - below_reference * gain - amplitude * phase.sin()
            }
        }
    }
}

/// Per-step loss on the tracking error `e = reference − T`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorSignal {
    /// ρ = e²/2.
    #[default]
    Raw,
    /// ρ = √(1+e²) − 1, so ρ' = e/√(1+e²) stays within (−1, 1).
    Squashed,
}

impl ErrorSignal {
    /// (ρ'(e), ρ''(e)).
    #[inline]
    fn slopes(self, e: f64) -> (f64, f64) {
        match self {
            ErrorSignal::Raw => (e, 1.0),
            ErrorSignal::Squashed => {
                let q = 1.0 + e * e;
                (e / q.sqrt(), q.powf(-1.5))
            }
        }
    }
}

/// End-of-episode gain update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum UpdateRule {
    /// θ −= ∂L/∂θ / (∂²L/∂θ² + ε), per gain.
    Newton { epsilon: f64 },
    /// θ −= lr · ∂L/∂θ / steps, per gain.
    Gradient { learning_rates: Gains },
}

impl Default for UpdateRule {
    fn default() -> Self {
        UpdateRule::Newton { epsilon: 1e-10 }
    }
}

/// Absolute gain limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GainBounds {
    pub min: Gains,
    pub max: Gains,
}

impl Default for GainBounds {
    fn default() -> Self {
        Self { min: Gains::new(0.0, 0.0, 0.0), max: Gains::new(100.0, 10.0, 100.0) }
    }
}

impl GainBounds {
    pub fn contains(&self, g: &Gains) -> bool {
        let (lo, hi, x) = (self.min.to_array(), self.max.to_array(), g.to_array());
        (0..3).all(|k| lo[k] <= x[k] && x[k] <= hi[k])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Outer iterations (episodes).
    pub iterations: usize,
    pub initial_gains: Gains,
    pub reference: f64,
    /// Episode start temperature is `reference − start_below·K`.
    pub start_below: f64,
    pub ambient: EpisodeAmbient,
    /// Episode length in plant time constants.
    pub episode_time_constants: f64,
    /// Episode Δt in seconds.
    pub episode_step: f64,
    /// Plant steps between controller ticks.
    pub control_period: usize,
    pub scaling: ErrorScaling,
    /// Sigmoid steepness S.
    pub steepness: f64,
    /// Saturation bound B; the sigmoid is flat beyond ±B/S.
    pub bound: f64,
    pub signal: ErrorSignal,
    pub rule: UpdateRule,
    /// Largest per-iteration change of any gain. `0` (or `None`) disables
    /// the trust region; TOML cannot spell `None`, so files use `0`.
    pub trust_radius: Option<f64>,
    pub bounds: GainBounds,
    /// Stop early once every gain moves less than this; 0 never stops.
    pub min_step: f64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            initial_gains: Gains::new(1.0, 0.0, 0.0),
            reference: 20.0,
            start_below: 0.1,
            ambient: EpisodeAmbient::default(),
            episode_time_constants: 4.0,
            episode_step: 1.0,
            control_period: 1,
            scaling: ErrorScaling::PerTick,
            steepness: 100.0,
            bound: 10.0,
            signal: ErrorSignal::Raw,
            rule: UpdateRule::default(),
            trust_radius: Some(1.0),
            bounds: GainBounds::default(),
            min_step: 0.0,
        }
    }
}

impl TunerConfig {
    /// Gradient descent on the squashed error with per-gain learning rates,
    /// clipped to ±1 per iteration.
    pub fn gradient_preset() -> Self {
        Self {
            ambient: EpisodeAmbient::Constant { temperature: 10.0 },
            signal: ErrorSignal::Squashed,
            rule: UpdateRule::Gradient { learning_rates: Gains::new(1e-2, 1e-8, 1e-1) },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let positive = |field: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 { Ok(()) } else { Err(ConfigError::invalid(field, v, "must be > 0")) }
        };
        positive("tuner.episode_step", self.episode_step)?;
        positive("tuner.episode_time_constants", self.episode_time_constants)?;
        positive("tuner.steepness", self.steepness)?;
        positive("tuner.bound", self.bound)?;
        if self.control_period < 1 {
            return Err(ConfigError::invalid("tuner.control_period", self.control_period, "must be >= 1"));
        }
        if !self.reference.is_finite() {
            return Err(ConfigError::invalid("tuner.reference", self.reference, "must be finite"));
        }
        if !self.start_below.is_finite() {
            return Err(ConfigError::invalid("tuner.start_below", self.start_below, "must be finite"));
        }
        self.ambient.validate()?;
        match self.rule {
            UpdateRule::Newton { epsilon } => positive("tuner.rule.epsilon", epsilon)?,
            UpdateRule::Gradient { learning_rates } if !learning_rates.is_finite() => {
                return Err(ConfigError::invalid(
                    "tuner.rule.learning_rates",
                    format!("{learning_rates:?}"),
                    "must be finite",
                ));
            }
            UpdateRule::Gradient { .. } => {}
        }
        if let Some(r) = self.trust_radius {
            if r.is_nan() || r < 0.0 {
                return Err(ConfigError::invalid("tuner.trust_radius", r, "must be >= 0 (0 disables it)"));
            }
        }
        let (lo, hi) = (self.bounds.min, self.bounds.max);
        if !(lo.is_finite() && hi.is_finite()) || !(lo.p <= hi.p && lo.i <= hi.i && lo.d <= hi.d) {
            return Err(ConfigError::invalid("tuner.bounds", format!("{lo:?}..{hi:?}"), "need finite min <= max"));
        }
        if !self.initial_gains.is_finite() || !self.bounds.contains(&self.initial_gains) {
            return Err(ConfigError::invalid(
                "tuner.initial_gains",
                format!("{:?}", self.initial_gains),
                "must be finite and inside tuner.bounds",
            ));
        }
        Ok(())
    }
}

/// Forward-mode derivatives carried through one episode. Index k is the
/// gain (0 = P, 1 = I, 2 = D); `d1` is ∂/∂θ_k, `d2` is ∂²/∂θ_k².
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sensitivity {
    pub temp_d1: [f64; 3],
    pub temp_d2: [f64; 3],
    integral_d1: [f64; 3],
    integral_d2: [f64; 3],
    prev_err_d1: [f64; 3],
    prev_err_d2: [f64; 3],
    /// ∂g/∂θ_k and ∂²g/∂θ_k² as of the last tick; held between ticks.
    g_d1: [f64; 3],
    g_d2: [f64; 3],
}

impl Sensitivity {
    /// Differentiate one controller tick. `terms` is (err, integral,
    /// derivative) after the tick's update.
    fn tick(&mut self, gains: &Gains, terms: [f64; 3], scale: f64) {
        let theta = gains.to_array();
        for k in 0..3 {
            let e1 = -self.temp_d1[k];
            let e2 = -self.temp_d2[k];
            self.integral_d1[k] += e1 * scale;
            self.integral_d2[k] += e2 * scale;
            let der1 = (e1 - self.prev_err_d1[k]) / scale;
            let der2 = (e2 - self.prev_err_d2[k]) / scale;
            self.prev_err_d1[k] = e1;
            self.prev_err_d2[k] = e2;

            let d1 = [e1, self.integral_d1[k], der1];
            let d2 = [e2, self.integral_d2[k], der2];
            let weighted = |d: &[f64; 3]| theta[0] * d[0] + theta[1] * d[1] + theta[2] * d[2];

            self.g_d1[k] = terms[k] + weighted(&d1);
            self.g_d2[k] = 2.0 * d1[k] + weighted(&d2);
        }
    }

    /// Propagate through one plant step with the relaxed actuator at `g`.
    fn step(&mut self, plant: &ThermalPlant, sig: &Sigmoid, g: f64) {
        let (a, b) = (plant.decay(), plant.input_gain());
        let (s1, s2) = (sig.d1(g), sig.d2(g));
        for k in 0..3 {
            let dg = self.g_d1[k];
            self.temp_d1[k] = a * self.temp_d1[k] + b * s1 * dg;
            self.temp_d2[k] = a * self.temp_d2[k] + b * (s2 * dg * dg + s1 * self.g_d2[k]);
        }
    }
}

/// What one episode measured.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeStats {
    pub gains: Gains,
    /// Σ |reference − T| over the episode.
    pub tracking_error: f64,
    /// ∂L/∂θ_k.
    pub grad: [f64; 3],
    /// ∂²L/∂θ_k².
    pub hess: [f64; 3],
    pub steps: usize,
    pub sensitivity: Sensitivity,
}

/// Best gains seen so far and their episode error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestGains {
    pub gains: Gains,
    pub tracking_error: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TuneReport {
    /// `None` when no episode finished with a finite error.
    pub best: Option<BestGains>,
    /// Tracking error of every episode, in order.
    pub history: Vec<f64>,
    /// Gains the loop ended on.
    pub last: Gains,
}

pub struct GradientAutoTuner {
    cfg: TunerConfig,
    plant: ThermalPlant,
    sigmoid: Sigmoid,
}

impl GradientAutoTuner {
    /// `plant` supplies K and τ; the episode uses its own Δt.
    pub fn new(plant: PlantParams, cfg: TunerConfig) -> Result<Self> {
        cfg.validate()?;
        let plant = ThermalPlant::new(PlantParams { step_size: cfg.episode_step, ..plant })?;
        Ok(Self { cfg, plant, sigmoid: Sigmoid::new(cfg.steepness, cfg.bound) })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.cfg
    }

    pub fn episode_steps(&self) -> usize {
        let p = self.plant.params();
        ((self.cfg.episode_time_constants * p.time_constant / p.step_size).round() as usize).max(1)
    }

    /// Simulate one episode at `gains` with fresh state.
    pub fn run_episode(&self, gains: Gains) -> EpisodeStats {
        let cfg = &self.cfg;
        let p = *self.plant.params();
        let steps = self.episode_steps();
        let scale = cfg.scaling.factor(cfg.control_period);
        let reference = cfg.reference;

        let mut temp = reference - cfg.start_below * p.gain;
        let (mut integral, mut prev_err, mut g) = (0.0, 0.0, 0.0);
        let mut sens = Sensitivity::default();
        let mut tracking_error = 0.0;
        let (mut grad, mut hess) = ([0.0; 3], [0.0; 3]);

        for s in 0..steps {
            if s % cfg.control_period == 0 {
                let err = reference - temp;
                integral += err * scale;
                let derivative = (err - prev_err) / scale;
                g = gains.combine(err, integral, derivative);
                sens.tick(&gains, [err, integral, derivative], scale);
                prev_err = err;
            }

            let ambient = cfg.ambient.at(reference, p.gain, s as f64 * p.step_size);
            sens.step(&self.plant, &self.sigmoid, g);
            temp = self.plant.update(temp, self.sigmoid.value(g), ambient);

            let e = reference - temp;
            tracking_error += e.abs();
            let (r1, r2) = cfg.signal.slopes(e);
            for k in 0..3 {
                let y1 = sens.temp_d1[k];
                grad[k] -= r1 * y1;
                hess[k] += r2 * y1 * y1 - r1 * sens.temp_d2[k];
            }
        }

        EpisodeStats { gains, tracking_error, grad, hess, steps, sensitivity: sens }
    }

    /// Next gains from one episode's statistics.
    pub fn propose(&self, current: &Gains, stats: &EpisodeStats) -> Gains {
        let theta = current.to_array();
        let lo = self.cfg.bounds.min.to_array();
        let hi = self.cfg.bounds.max.to_array();
        let mut next = theta;
        for k in 0..3 {
            let proposed = match self.cfg.rule {
                UpdateRule::Newton { epsilon } => {
                    let mut denom = stats.hess[k] + epsilon;
                    if denom.abs() < epsilon {
                        denom = epsilon;
                    }
                    theta[k] - stats.grad[k] / denom
                }
                UpdateRule::Gradient { learning_rates } => {
                    theta[k] - learning_rates.to_array()[k] * stats.grad[k] / stats.steps.max(1) as f64
                }
            };
            if proposed.is_finite() {
                next[k] = control::bounded_step(theta[k], proposed, self.trust_radius(), lo[k], hi[k]);
            } else {
                tracing::warn!(gain = k, current = theta[k], "non-finite gain proposal rejected");
            }
        }
        Gains::from_array(next)
    }

    /// Trust radius in effect; a zero radius means none.
    fn trust_radius(&self) -> Option<f64> {
        self.cfg.trust_radius.filter(|r| *r > 0.0)
    }

    /// Run the outer loop. Cancellation is polled once per iteration; the
    /// best gains found so far are returned either way.
    pub fn tune(&self, cancel: &CancelToken, progress: &dyn Progress) -> Outcome<Gains, TuneReport> {
        let cfg = &self.cfg;
        let best: RefCell<Option<BestGains>> = RefCell::new(None);
        let history = RefCell::new(Vec::with_capacity(cfg.iterations.min(1024)));

        tracing::info!(
            iterations = cfg.iterations,
            episode_steps = self.episode_steps(),
            rule = ?cfg.rule,
            initial = ?cfg.initial_gains,
            "tuning started"
        );

        let refined = refine_until(
            cfg.initial_gains,
            |gains: &Gains| self.run_episode(*gains),
            |stats: &EpisodeStats| {
                let mut hist = history.borrow_mut();
                hist.push(stats.tracking_error);
                let mut b = best.borrow_mut();
                let improved = stats.tracking_error.is_finite()
                    && b.is_none_or(|cur| stats.tracking_error < cur.tracking_error);
                if improved {
                    *b = Some(BestGains { gains: stats.gains, tracking_error: stats.tracking_error });
                }
                tracing::debug!(
                    iteration = hist.len(),
                    tracking_error = stats.tracking_error,
                    improved,
                    gains = ?stats.gains,
                    "episode finished"
                );
                stats.clone()
            },
            |gains: &Gains, stats: &EpisodeStats| self.propose(gains, stats),
            |a: &Gains, b: &Gains| {
                cfg.min_step > 0.0
                    && a.to_array().iter().zip(b.to_array()).all(|(x, y)| (x - y).abs() < cfg.min_step)
            },
            cfg.iterations,
            cancel,
            progress,
        );

        let best = best.into_inner();
        let chosen = best.map_or(cfg.initial_gains, |b| b.gains);
        tracing::info!(
            iters = refined.iters,
            exit = ?refined.exit,
            best = ?chosen,
            best_error = best.map(|b| b.tracking_error),
            "tuning finished"
        );

        Outcome {
            theta: chosen,
            obs: TuneReport { best, history: history.into_inner(), last: refined.theta },
            iters: refined.iters,
            exit: refined.exit,
        }
    }
}

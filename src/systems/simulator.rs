// src/systems/simulator.rs
#![cfg(feature = "system-simulator")]

//! Closed-loop simulation over the ambient horizon.
//!
//! For each plant step `s` in `0..horizon`:
//! 1. `t = s / steps_per_hour` hours, ambient = profile at `t`
//! 2. plant advances with the heater state held from the last tick
//! 3. `s % measure_period == 0` → fused reading appended to the buffer
//! 4. `s % control_period == 0` → controller tick against the active reference
//! 5. `s % block == 0 && s != 0` → next reference (clamped at the last one)
//! 6. one [`TraceRow`] is recorded, then the cancel token is polled
//!
//! `horizon = steps_per_hour · (samples − 1) + 1` and
//! `block = ceil(horizon / references.len())`.

use serde::{Deserialize, Serialize};

use crate::Exit;
use crate::config::SimConfig;
use crate::error::{ConfigError, Result};
use crate::mechanics::fusion;
use crate::systems::ambient::AmbientSeries;
use crate::systems::pid::{Gains, Heater, PidController};
use crate::systems::plant::ThermalPlant;
use crate::systems::sdk::{CancelToken, Outcome, Progress, percent};
use crate::systems::sensors::SensorArray;

/// One simulated step, columns in export order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Elapsed time in hours.
    pub time: f64,
    pub room: f64,
    pub ambient: f64,
    pub reference: f64,
    pub measured: f64,
    pub heater: Heater,
}

/// Six aligned output columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trace {
    pub time: Vec<f64>,
    pub room: Vec<f64>,
    pub ambient: Vec<f64>,
    pub reference: Vec<f64>,
    pub measured: Vec<f64>,
    pub heater: Vec<Heater>,
}

/// Aggregate view of a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TraceSummary {
    pub steps: usize,
    /// Mean |reference − room| over all steps.
    pub mean_abs_error: f64,
    /// Fraction of steps with the heater on.
    pub duty_cycle: f64,
}

impl Trace {
    fn with_capacity(n: usize) -> Self {
        Self {
            time: Vec::with_capacity(n),
            room: Vec::with_capacity(n),
            ambient: Vec::with_capacity(n),
            reference: Vec::with_capacity(n),
            measured: Vec::with_capacity(n),
            heater: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn push(&mut self, row: TraceRow) {
        self.time.push(row.time);
        self.room.push(row.room);
        self.ambient.push(row.ambient);
        self.reference.push(row.reference);
        self.measured.push(row.measured);
        self.heater.push(row.heater);
    }

    /// Row view for tabular export.
    pub fn rows(&self) -> impl Iterator<Item = TraceRow> + '_ {
        (0..self.len()).map(move |i| TraceRow {
            time: self.time[i],
            room: self.room[i],
            ambient: self.ambient[i],
            reference: self.reference[i],
            measured: self.measured[i],
            heater: self.heater[i],
        })
    }

    pub fn from_rows(rows: impl IntoIterator<Item = TraceRow>) -> Self {
        let mut trace = Trace::default();
        for row in rows {
            trace.push(row);
        }
        trace
    }

    pub fn summary(&self) -> TraceSummary {
        let steps = self.len();
        if steps == 0 {
            return TraceSummary::default();
        }
        let errs: Vec<f64> = self.reference.iter().zip(&self.room).map(|(r, t)| (r - t).abs()).collect();
        let on = self.heater.iter().filter(|h| h.is_on()).count();
        TraceSummary {
            steps,
            mean_abs_error: fusion::mean(&errs),
            duty_cycle: on as f64 / steps as f64,
        }
    }
}

/// Longest horizon a simulation accepts, in plant steps.
pub const MAX_HORIZON: usize = 50_000_000;

/// Rows reserved up front; longer traces grow as they go.
const PREALLOC_ROWS: usize = 1 << 20;

/// Steps in a horizon covering `ambient`; `None` on overflow.
pub fn horizon_len(steps_per_hour: usize, ambient: &AmbientSeries) -> Option<usize> {
    steps_per_hour.checked_mul(ambient.len().saturating_sub(1))?.checked_add(1)
}

/// A validated, ready-to-run simulation. Each [`Simulation::run`] starts from
/// fresh plant, sensor and controller state.
#[derive(Clone, Debug)]
pub struct Simulation {
    cfg: SimConfig,
    plant: ThermalPlant,
    ambient: AmbientSeries,
    horizon: usize,
}

impl Simulation {
    /// Validates `cfg` and the horizon it implies; nothing runs if either
    /// is rejected.
    pub fn new(cfg: SimConfig, ambient: AmbientSeries) -> Result<Self> {
        cfg.validate()?;
        let plant = ThermalPlant::new(cfg.plant)?;
        let horizon = horizon_len(plant.steps_per_hour(), &ambient)
            .filter(|h| *h <= MAX_HORIZON)
            .ok_or_else(|| {
                ConfigError::invalid(
                    "plant.step_size",
                    cfg.plant.step_size,
                    "too small for the ambient span (horizon exceeds MAX_HORIZON steps)",
                )
            })?;
        Ok(Self { cfg, plant, ambient, horizon })
    }

    /// Build the ambient series from `cfg.ambient` (synthetic sources only).
    pub fn from_config(cfg: SimConfig) -> Result<Self> {
        cfg.validate()?;
        let ambient = cfg.ambient.resolve(None)?;
        Self::new(cfg, ambient)
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn ambient(&self) -> &AmbientSeries {
        &self.ambient
    }

    /// Same configuration, different gains. Non-finite gains are rejected.
    pub fn with_gains(mut self, gains: Gains) -> Result<Self> {
        if !gains.is_finite() {
            return Err(ConfigError::invalid("control.gains", format!("{gains:?}"), "must be finite").into());
        }
        self.cfg.control.gains = gains;
        Ok(self)
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Run the whole horizon. A raised `cancel` ends the run after the
    /// current row with [`Exit::Cancelled`] and the rows recorded so far.
    pub fn run(&self, cancel: &CancelToken, progress: &dyn Progress) -> Result<Outcome<Trace, TraceSummary>> {
        let ctl = &self.cfg.control;
        let steps_per_hour = self.plant.steps_per_hour();
        let horizon = self.horizon;
        let block = horizon.div_ceil(ctl.references.len());
        let last_ref = ctl.references.len() - 1;

        let mut sensors = SensorArray::new(self.cfg.sensors)?;
        let mut pid = PidController::new(ctl.gains, ctl.policy, ctl.control_period, self.cfg.initial_temperature);
        let mut temp = self.cfg.initial_temperature;
        let mut r_idx = 0usize;
        let mut trace = Trace::with_capacity(horizon.min(PREALLOC_ROWS));

        tracing::info!(
            horizon,
            steps_per_hour,
            references = ctl.references.len(),
            gains = ?ctl.gains,
            policy = ?ctl.policy,
            "simulation started"
        );

        let mut exit = Exit::Exhausted;
        for s in 0..horizon {
            let t = s as f64 / steps_per_hour as f64;
            let ambient = self.ambient.temperature_at(t)?;
            temp = self.plant.update(temp, pid.heater().actuation(), ambient);

            if s % ctl.measure_period == 0 {
                pid.record(sensors.measure(temp));
            }
            if s % ctl.control_period == 0 {
                pid.tick(ctl.references[r_idx]);
            }
            if s % block == 0 && s != 0 {
                r_idx = (r_idx + 1).min(last_ref);
            }

            trace.push(TraceRow {
                time: t,
                room: temp,
                ambient,
                reference: ctl.references[r_idx],
                measured: pid.measured(),
                heater: pid.heater(),
            });
            progress.report(percent(s + 1, horizon));

            if cancel.is_cancelled() {
                exit = Exit::Cancelled;
                break;
            }
        }

        let summary = trace.summary();
        tracing::info!(
            steps = trace.len(),
            cancelled = exit == Exit::Cancelled,
            mean_abs_error = summary.mean_abs_error,
            duty_cycle = summary.duty_cycle,
            "simulation finished"
        );
        Ok(Outcome { iters: trace.len(), theta: trace, obs: summary, exit })
    }
}

// src/scenarios/session.rs
#![cfg(feature = "scenario-session")]

//! Tune-then-simulate session.
//!
//! Coordinates the two systems:
//! - autotune  → gains for one set-point of the schedule
//! - simulator → full closed-loop run with those gains
//!
//! Pass `p` tunes against `references[min(p, last)]`, starting from the gains
//! the previous pass settled on, then simulates the whole schedule. With
//! `passes = 1` this is the plain "calibrate, then run" workflow.
//!
//! Progress is split evenly across passes, and within a pass evenly between
//! tuning and simulation, so one [`ProgressGauge`] can follow the session.
//!
//! [`ProgressGauge`]: crate::systems::sdk::ProgressGauge

use serde::{Deserialize, Serialize};

use crate::Exit;
use crate::config::SimConfig;
use crate::error::{ConfigError, Result};
use crate::scenarios::sdk::{ProgressSpan, Signals, run_with_outer_iters};
use crate::systems::ambient::AmbientSeries;
use crate::systems::autotune::{GradientAutoTuner, TuneReport, TunerConfig};
use crate::systems::pid::Gains;
use crate::systems::sdk::{CancelToken, Outcome, Progress};
use crate::systems::simulator::{Simulation, Trace, TraceSummary};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tune-then-simulate passes.
    pub passes: usize,
    /// Seed the first pass with `control.gains` instead of `tuner.initial_gains`.
    pub start_from_control_gains: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { passes: 1, start_from_control_gains: false }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(1..=100).contains(&self.passes) {
            return Err(ConfigError::invalid("session.passes", self.passes, "must be in 1..=100"));
        }
        Ok(())
    }
}

/// One tune + simulate pass.
#[derive(Clone, Debug)]
pub struct SessionPass {
    pub reference: f64,
    pub tuning: Outcome<Gains, TuneReport>,
    /// `None` when the session was cancelled during tuning.
    pub simulation: Option<Outcome<Trace, TraceSummary>>,
}

#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub passes: Vec<SessionPass>,
    /// Gains the last pass ended with.
    pub gains: Gains,
    pub exit: Exit,
}

impl SessionOutcome {
    /// Simulation of the last pass that got that far.
    pub fn last_simulation(&self) -> Option<&Outcome<Trace, TraceSummary>> {
        self.passes.iter().rev().find_map(|p| p.simulation.as_ref())
    }
}

/// Run the session described by `cfg.session`. The whole `cfg` is validated
/// before anything runs; a raised `cancel` stops after the system currently
/// running.
pub fn tune_and_simulate(
    cfg: &SimConfig,
    ambient: AmbientSeries,
    cancel: &CancelToken,
    progress: &dyn Progress,
) -> Result<SessionOutcome> {
    let sim = Simulation::new(cfg.clone(), ambient)?;
    let references = &cfg.control.references;
    let last_ref = references.len() - 1;
    let session = cfg.session;
    let passes = session.passes;
    let width = (100 / passes) as u8;
    let half = width / 2;

    let seed = Signals {
        gains: if session.start_from_control_gains { cfg.control.gains } else { cfg.tuner.initial_gains },
        reference: references[0],
    };

    tracing::info!(passes, references = references.len(), seed = ?seed.gains, "session started");

    let mut failure = None;
    let (signals, outs) = run_with_outer_iters(seed, passes, cancel, |pass, signals_in| {
        if failure.is_some() {
            return (signals_in, None);
        }
        let start = (pass * width as usize) as u8;
        let reference = references[pass.min(last_ref)];

        let tuner_cfg = TunerConfig { initial_gains: signals_in.gains, reference, ..cfg.tuner };
        let tuning = match GradientAutoTuner::new(cfg.plant, tuner_cfg) {
            Ok(tuner) => tuner.tune(cancel, &ProgressSpan { outer: progress, start, width: half }),
            Err(e) => {
                failure = Some(e);
                return (signals_in, None);
            }
        };
        let gains = tuning.theta;

        let simulation = if tuning.cancelled() {
            None
        } else {
            let span = ProgressSpan { outer: progress, start: start + half, width: width - half };
            match sim.clone().with_gains(gains).and_then(|sim| sim.run(cancel, &span)) {
                Ok(out) => Some(out),
                Err(e) => {
                    failure = Some(e);
                    return (signals_in, None);
                }
            }
        };

        tracing::info!(
            pass,
            reference,
            gains = ?gains,
            mean_abs_error = simulation.as_ref().map(|s| s.obs.mean_abs_error),
            "session pass finished"
        );
        (Signals { gains, reference }, Some(SessionPass { reference, tuning, simulation }))
    });

    if let Some(e) = failure {
        return Err(e);
    }

    let passes: Vec<SessionPass> = outs.into_iter().flatten().collect();
    let exit = if cancel.is_cancelled() {
        Exit::Cancelled
    } else {
        progress.report(100);
        Exit::Exhausted
    };
    tracing::info!(passes = passes.len(), exit = ?exit, gains = ?signals.gains, "session finished");
    Ok(SessionOutcome { passes, gains: signals.gains, exit })
}

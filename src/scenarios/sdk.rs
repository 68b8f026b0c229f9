// src/scenarios/sdk.rs

//! # Scenario SDK
//!
//! Glue for building **scenarios** out of several systems. A scenario runs
//! systems in sequence, passing a few shared quantities ([`Signals`]) from
//! one to the next, possibly over several outer passes.
//!
//! - [`run_with_outer_iters`] standardizes the multi-pass loop and stops
//!   early when a pass reports cancellation.
//! - [`ProgressSpan`] maps a sub-run's 0..=100 onto a slice of the caller's
//!   progress bar, so sequential systems share one monotonic gauge.

use crate::systems::pid::Gains;
use crate::systems::sdk::{CancelToken, Progress};

/// Quantities handed from one pass to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signals {
    /// Gains the next pass starts from.
    pub gains: Gains,
    /// Set-point the tuner aims at.
    pub reference: f64,
}

/// Run up to `outer_iters` passes, threading `Signals` through `step`.
/// Stops after the first pass during which `cancel` was raised.
pub fn run_with_outer_iters<F, T>(
    mut signals: Signals,
    outer_iters: usize,
    cancel: &CancelToken,
    mut step: F,
) -> (Signals, Vec<T>)
where
    F: FnMut(usize, Signals) -> (Signals, T),
{
    let mut outs = Vec::with_capacity(outer_iters);
    for pass in 0..outer_iters {
        let (next, out) = step(pass, signals);
        signals = next;
        outs.push(out);
        if cancel.is_cancelled() {
            break;
        }
    }
    (signals, outs)
}

/// Rescales reports into `[start, start + width]` of an outer sink.
pub struct ProgressSpan<'a> {
    pub outer: &'a dyn Progress,
    pub start: u8,
    pub width: u8,
}

impl Progress for ProgressSpan<'_> {
    fn report(&self, percent: u8) {
        let scaled = self.start as u16 + (percent.min(100) as u16 * self.width as u16) / 100;
        self.outer.report(scaled.min(100) as u8);
    }
}

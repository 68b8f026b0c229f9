// src/systems/sdk.rs

//! # Systems SDK
//!
//! Shared plumbing for the long-running **systems** (the simulator and the
//! auto-tuner). Both are tight sequential loops; a host that wants to stay
//! responsive runs them on its own worker thread and talks to them through
//! the two handles defined here.
//!
//! ## What this SDK gives you
//! - [`CancelToken`]: a cloneable flag the host raises and the loop polls
//!   once per step (simulator) or once per iteration (tuner). Cancellation is
//!   a normal exit; the loop returns whatever it has accumulated.
//! - [`Progress`]: one-way, monotonic percentage reports. Implemented for
//!   closures `Fn(u8)`, for [`Quiet`] (discard), and for [`ProgressGauge`], an
//!   atomic cell the host polls.
//! - [`Outcome`]: the standard `(θ, π, iters, exit)` return of a system.
//!
//! ## Ownership
//! Every entry point constructs fresh loop state. Only the token and the
//! gauge are shared, and both are atomics, so they are `Send + Sync`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::Exit;

/// Cooperative cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Lower the flag so the token can drive another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Sink for progress percentages (0..=100).
pub trait Progress {
    fn report(&self, percent: u8);
}

/// Discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct Quiet;

impl Progress for Quiet {
    fn report(&self, _percent: u8) {}
}

impl<F: Fn(u8)> Progress for F {
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Pollable progress cell. Reports never move it backwards.
#[derive(Clone, Debug, Default)]
pub struct ProgressGauge(Arc<AtomicU8>);

impl ProgressGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl Progress for ProgressGauge {
    fn report(&self, percent: u8) {
        self.0.fetch_max(percent.min(100), Ordering::Relaxed);
    }
}

/// `100 * done / total`, floored; 100 when `total` is 0.
#[inline]
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u128 * 100) / total as u128) as u8
}

/// Generic result.
#[derive(Clone, Debug)]
pub struct Outcome<TParams, Obs> {
    pub theta: TParams,
    pub obs: Obs,
    pub iters: usize,
    pub exit: Exit,
}

impl<TParams, Obs> Outcome<TParams, Obs> {
    pub fn cancelled(&self) -> bool {
        self.exit == Exit::Cancelled
    }
}

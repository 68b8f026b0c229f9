/*!
`thermo_loop` — closed-loop room temperature regulation and gain tuning.

What it does
- Simulates a room as a first-order thermal lag driven by an on/off heater
  and an outdoor (ambient) temperature profile.
- Measures the room through an array of noisy, optionally faulty sensors and
  fuses the readings into one estimate.
- Closes the loop with a discrete PID controller whose decision policy is an
  explicit [`systems::pid::ControlPolicy`].
- Tunes the PID gains with a gradient/Newton loop that propagates the
  sensitivity of the plant temperature through a sigmoid relaxation of the
  heater decision.

How the pieces compose
- Every long-running loop here is an instance of the same refinement shape
  `θ_{t+1} = update(θ_t, measure(simulate(θ_t)))`. [`refine_det`] is the pure
  form; [`refine_until`] adds cooperative cancellation and progress.
- Leaf math lives in [`mechanics`], stateful components in [`systems`],
  multi-system workflows in [`scenarios`].

What it does NOT do
- No I/O mid-run, no threads, no async. Hosts run the entry points on their
  own worker and poll the [`systems::sdk::ProgressGauge`].
*/

use systems::sdk::{CancelToken, Progress, Quiet};

pub mod config;
pub mod error;
pub mod mechanics;
pub mod scenarios;
pub mod systems;

pub use error::{ConfigError, LookupError, Result, ThermoError};

/// How a refinement loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// `max_iters` iterations ran.
    Exhausted,
    /// The convergence predicate held.
    Converged,
    /// The cancel token was raised; θ is whatever the loop had reached.
    Cancelled,
}

/// Result of [`refine_until`].
#[derive(Clone, Debug)]
pub struct Refined<P> {
    pub theta: P,
    pub iters: usize,
    pub exit: Exit,
}

/// Deterministic refinement: θ_{t+1} = update(θ_t, measure(simulate(θ_t))).
pub fn refine_det<P, D, M, Sim, Meas, Upd, Conv>(
    theta: P,
    simulate: Sim,
    measure: Meas,
    update: Upd,
    converged: Conv,
    max_iters: usize,
) -> P
where
    Sim: FnMut(&P) -> D,
    Meas: FnMut(&D) -> M,
    Upd: FnMut(&P, &M) -> P,
    Conv: Fn(&P, &P) -> bool,
{
    refine_until(
        theta,
        simulate,
        measure,
        update,
        converged,
        max_iters,
        &CancelToken::new(),
        &Quiet,
    )
    .theta
}

/// Refinement with cooperative cancellation, polled once per iteration after
/// the update, and progress reported as `100 * (iter + 1) / max_iters`.
#[allow(clippy::too_many_arguments)]
pub fn refine_until<P, D, M, Sim, Meas, Upd, Conv>(
    mut theta: P,
    mut simulate: Sim,
    mut measure: Meas,
    mut update: Upd,
    converged: Conv,
    max_iters: usize,
    cancel: &CancelToken,
    progress: &dyn Progress,
) -> Refined<P>
where
    Sim: FnMut(&P) -> D,
    Meas: FnMut(&D) -> M,
    Upd: FnMut(&P, &M) -> P,
    Conv: Fn(&P, &P) -> bool,
{
    for i in 0..max_iters {
        let data = simulate(&theta);
        let pi = measure(&data);
        let theta_next = update(&theta, &pi);
        progress.report(systems::sdk::percent(i + 1, max_iters));
        if converged(&theta, &theta_next) {
            return Refined { theta: theta_next, iters: i + 1, exit: Exit::Converged };
        }
        theta = theta_next;
        if cancel.is_cancelled() {
            return Refined { theta, iters: i + 1, exit: Exit::Cancelled };
        }
    }
    Refined { theta, iters: max_iters, exit: Exit::Exhausted }
}

// src/scenarios/mod.rs

// Workflows that coordinate several systems (tuner, simulator) in one call.
// Each scenario is feature-gated so hosts enable only what they use.

pub mod sdk;
pub use sdk::*;

#[cfg(feature = "scenario-session")]
pub mod session;

#[cfg(feature = "scenario-session")]
pub use session::*;

//! Thermal mechanics: explicit Euler integration of a first-order lag.

/// T' = T + dt * (-T + k * u + ambient) / tau.
#[inline]
pub fn euler_step(temp: f64, actuation: f64, ambient: f64, k: f64, tau: f64, dt: f64) -> f64 {
    temp + dt * (-temp + k * actuation + ambient) / tau
}

/// Per-step retention of the previous temperature: 1 - dt / tau.
#[inline]
pub fn decay(tau: f64, dt: f64) -> f64 {
    1.0 - dt / tau
}

/// Per-step weight of the actuator: k * dt / tau.
#[inline]
pub fn input_gain(k: f64, tau: f64, dt: f64) -> f64 {
    k * dt / tau
}

/// Fixed point of the lag for a held actuation: T* = k * u + ambient.
#[inline]
pub fn steady_state(actuation: f64, ambient: f64, k: f64) -> f64 {
    k * actuation + ambient
}

//! Stochastic mechanics: draws from a `WyRand` stream.
//! Callers own the generator, so a seeded run is reproducible end to end.

use bevy_prng::WyRand;
use rand_core::RngCore;

/// Uniform [0, 1) from the top 53 bits.
#[inline]
pub fn unit(rng: &mut WyRand) -> f64 {
    ((rng.next_u64() >> 11) as f64) / ((1u64 << 53) as f64)
}

/// Uniform [lo, hi).
#[inline]
pub fn uniform(rng: &mut WyRand, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * unit(rng)
}

/// Gaussian(0,1) via Box–Muller.
#[inline]
pub fn gaussian01(rng: &mut WyRand) -> f64 {
    // 1 - u keeps the log argument in (0, 1].
    let u1 = 1.0 - unit(rng);
    let u2 = unit(rng);
    let r = (-2.0 * u1.ln()).sqrt();
    let t = 2.0 * std::f64::consts::PI * u2;
    r * t.cos()
}

/// Gaussian(mean, sd).
#[inline]
pub fn normal(rng: &mut WyRand, mean: f64, sd: f64) -> f64 {
    mean + sd * gaussian01(rng)
}

/// Bernoulli(p).
#[inline]
pub fn bernoulli(rng: &mut WyRand, p: f64) -> bool {
    unit(rng) < p.clamp(0.0, 1.0)
}

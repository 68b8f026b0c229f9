//! Control mechanics: saturation and bounded parameter steps.

/// Actuator saturation: u = clamp(g, 0, 1).
#[inline]
pub fn saturate(g: f64) -> f64 {
    g.clamp(0.0, 1.0)
}

/// Trust-region step: x' = clamp(proposed, x - radius, x + radius).
#[inline]
pub fn trust_region(x: f64, proposed: f64, radius: f64) -> f64 {
    let r = radius.abs();
    proposed.clamp(x - r, x + r)
}

/// Bounded step: trust region (if any), then the absolute band [lo, hi].
#[inline]
pub fn bounded_step(x: f64, proposed: f64, radius: Option<f64>, lo: f64, hi: f64) -> f64 {
    let stepped = match radius {
        Some(r) => trust_region(x, proposed, r),
        None => proposed,
    };
    stepped.clamp(lo, hi)
}

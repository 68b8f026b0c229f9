//! Fusion mechanics: combine redundant readings into one estimate.

/// Smallest disagreement sum a weight is computed from. Keeps `w_i` finite
/// when a reading coincides with every other reading.
pub const MIN_DISAGREEMENT: f64 = 1e-9;

/// Arithmetic mean; NaN for an empty slice.
#[inline]
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Disagreement weights w_i = (Σ_{j≠i} |x_i - x_j|)^-2, normalized to sum 1.
pub fn disagreement_weights(xs: &[f64]) -> Vec<f64> {
    let raw: Vec<f64> = xs
        .iter()
        .enumerate()
        .map(|(i, xi)| {
            let spread: f64 = xs
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, xj)| (xi - xj).abs())
                .sum();
            spread.max(MIN_DISAGREEMENT).powi(-2)
        })
        .collect();
    let total: f64 = raw.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return vec![1.0 / xs.len() as f64; xs.len()];
    }
    raw.into_iter().map(|w| w / total).collect()
}

/// Weighted mean under [`disagreement_weights`]; outliers pull less.
pub fn weighted_mean(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return mean(xs);
    }
    disagreement_weights(xs)
        .iter()
        .zip(xs)
        .map(|(w, x)| w * x)
        .sum()
}

/// Relaxation mechanics: a steep logistic standing in for a hard threshold.
///
/// `σ(x) = 1 / (1 + e^{-S x})` with exact first and second derivatives.
/// Outside `±bound / S` the curve is treated as saturated: σ is exactly 0 or
/// 1 and both derivatives are 0, which keeps `e^{S x}` from overflowing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sigmoid {
    steepness: f64,
    limit: f64,
}

impl Default for Sigmoid {
    fn default() -> Self {
        Self::new(100.0, 10.0)
    }
}

impl Sigmoid {
    /// `steepness` is S, `bound` is B; saturation starts at |x| > B / S.
    pub fn new(steepness: f64, bound: f64) -> Self {
        let steepness = steepness.abs().max(f64::MIN_POSITIVE);
        Self { steepness, limit: bound.abs() / steepness }
    }

    pub fn steepness(&self) -> f64 {
        self.steepness
    }

    #[inline]
    pub fn value(&self, x: f64) -> f64 {
        if x > self.limit {
            1.0
        } else if x < -self.limit {
            0.0
        } else {
            1.0 / (1.0 + (-self.steepness * x).exp())
        }
    }

    /// σ'(x) = S e^{-Sx} / (1 + e^{-Sx})².
    #[inline]
    pub fn d1(&self, x: f64) -> f64 {
        if x.abs() > self.limit {
            return 0.0;
        }
        let ex = (-self.steepness * x).exp();
        self.steepness * ex / (1.0 + ex).powi(2)
    }

    /// σ''(x) = S² e^{Sx} (1 - e^{Sx}) / (1 + e^{Sx})³.
    #[inline]
    pub fn d2(&self, x: f64) -> f64 {
        if x.abs() > self.limit {
            return 0.0;
        }
        let ex = (self.steepness * x).exp();
        self.steepness.powi(2) * ex * (1.0 - ex) / (1.0 + ex).powi(3)
    }
}

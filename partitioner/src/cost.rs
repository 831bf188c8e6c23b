use crate::special::li;

/// Root of `li`, below it `li` is negative and the accumulated cost would shrink.
const SOLDNER: f64 = 1.451_369_234_883_381;

/// An analytic estimator of how expensive a numeric sub-range is to sieve.
///
/// Implementations must be monotonically non-decreasing in `b` for a fixed
/// `a`, the boundary search relies on it.
pub trait CostModel {
    /// Estimates the total modulus tests needed for the odd candidates in `[a, b]`.
    ///
    /// # Arguments
    /// * `a` - Inclusive lower end.
    /// * `b` - Inclusive upper end.
    ///
    /// # Returns
    /// A non-negative estimate, `0.0` when `b <= a`.
    fn cost(&self, a: u64, b: u64) -> f64;

    /// Estimates how many primes fall inside `[a, b]`.
    fn prime_count(&self, a: u64, b: u64) -> f64;
}

/// Cost model based on the logarithmic integral.
///
/// Testing `n` costs about `π(√n) ≈ li(√n)` divisions. Summed over the odd
/// numbers of `[a, b]` and substituting `n = t²`, the total becomes
/// `∫ t·li(t) dt` over `[√a, √b]`, whose antiderivative is
/// `F(t) = ½·(t²·li(t) − li(t³))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIntegral;

impl LogIntegral {
    fn accumulated(t: f64) -> f64 {
        let t = t.max(SOLDNER);
        0.5 * (t * t * li(t) - li(t * t * t))
    }
}

impl CostModel for LogIntegral {
    fn cost(&self, a: u64, b: u64) -> f64 {
        if b <= a {
            return 0.0;
        }

        let fa = Self::accumulated((a as f64).sqrt());
        let fb = Self::accumulated((b as f64).sqrt());
        (fb - fa).max(0.0)
    }

    fn prime_count(&self, a: u64, b: u64) -> f64 {
        if b <= a {
            return 0.0;
        }

        (li(b as f64) - li(a as f64)).max(0.0)
    }
}

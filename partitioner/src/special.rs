//! Special functions backing the analytic cost model.
//!
//! `li(x) = Ei(ln x)` approximates the prime-counting function. Only the
//! range needed by the partitioner (`x` up to roughly `1e30`) is tuned for.

/// Euler-Mascheroni constant.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Above this argument the asymptotic expansion of `Ei` is used.
const ASYMPTOTIC_FROM: f64 = 40.0;

const MAX_TERMS: usize = 500;

/// The exponential integral `Ei(x)`.
///
/// # Arguments
/// * `x` - Any finite real, `Ei(0)` is `-inf`.
///
/// # Returns
/// The principal value of `-∫_{-x}^{∞} e^{-t}/t dt`.
pub fn ei(x: f64) -> f64 {
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }

    if x > ASYMPTOTIC_FROM {
        return ei_asymptotic(x);
    }

    // Ei(x) = γ + ln|x| + Σ x^k / (k·k!)
    let mut sum = 0.0;
    let mut power = 1.0;

    for k in 1..MAX_TERMS {
        let k = k as f64;
        power *= x / k;
        let term = power / k;
        sum += term;

        if term.abs() <= f64::EPSILON * sum.abs() {
            break;
        }
    }

    EULER_GAMMA + x.abs().ln() + sum
}

fn ei_asymptotic(x: f64) -> f64 {
    // Ei(x) ~ e^x / x · Σ k! / x^k, truncated at the smallest term.
    let mut sum = 1.0;
    let mut term = 1.0;

    for k in 1..MAX_TERMS {
        let next = term * k as f64 / x;
        if next >= term || next < f64::EPSILON * sum {
            break;
        }
        term = next;
        sum += term;
    }

    x.exp() / x * sum
}

/// The logarithmic integral `li(x)`.
///
/// Returns `0.0` for `x <= 1`. Strictly increasing for `x > 1`.
pub fn li(x: f64) -> f64 {
    if x <= 1.0 {
        return 0.0;
    }

    ei(x.ln())
}

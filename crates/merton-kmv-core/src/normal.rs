//! Standard normal distribution helpers.

use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

/// Cumulative standard normal distribution, `N(x) = (1 + erf(x / sqrt(2))) / 2`.
///
/// Total over the reals: `-inf` maps to 0, `+inf` to 1, NaN stays NaN.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

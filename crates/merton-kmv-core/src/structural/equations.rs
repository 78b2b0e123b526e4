//! Structural equations linking equity to firm assets.
//!
//! Equity is a call on firm assets struck at the face value of debt:
//!
//! ```text
//! E       = A * N(d1) - D * exp(-rT) * N(d2)
//! sigma_E = (A / E) * N(d1) * sigma_A
//! ```
//!
//! For a candidate `(A, sigma_A)` the evaluator reports how far each
//! equation is from holding, plus the distance-to-default measures.

use serde::{Deserialize, Serialize};

use super::observables::StructuralParams;
use crate::normal::norm_cdf;

/// Equations evaluated at one `(A, sigma_A)` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub asset_value: f64,
    pub asset_vol: f64,
    /// Black-Scholes distance to default.
    pub d1: f64,
    /// d2 = d1 - sigma_A * sqrt(T).
    pub d2: f64,
    /// Linear proxy (A - D) / sigma_A.
    pub kmv_distance_to_default: f64,
    /// Pricing error of the equity equation, relative to A.
    pub equity_residual: f64,
    /// Implied minus observed equity volatility.
    pub volatility_residual: f64,
    /// |equity_residual| + |volatility_residual|
    pub tolerance: f64,
    /// Risk-neutral probability of default, N(-d2).
    pub default_probability: f64,
}

/// d1 = (ln(A/D) + (r + sigma_A^2/2) T) / (sigma_A sqrt(T)).
pub fn compute_d1(asset_value: f64, asset_vol: f64, params: &StructuralParams) -> f64 {
    ((asset_value / params.debt_face_value).ln()
        + (params.risk_free_rate + asset_vol * asset_vol / 2.0) * params.time_to_maturity)
        / (asset_vol * params.sqrt_t)
}

/// Evaluate both structural equations at `(asset_value, asset_vol)`.
///
/// No input checks: degenerate points yield non-finite fields.
pub fn evaluate(asset_value: f64, asset_vol: f64, params: &StructuralParams) -> Evaluation {
    let d1 = compute_d1(asset_value, asset_vol, params);
    let d2 = d1 - asset_vol * params.sqrt_t;
    let nd1 = norm_cdf(d1);
    let nd2 = norm_cdf(d2);

    let equity_model = asset_value * nd1 - params.debt_face_value * params.discount * nd2;
    let equity_residual = (equity_model - params.equity_value) / asset_value;
    let volatility_residual =
        asset_value / params.equity_value * nd1 * asset_vol - params.equity_vol;

    Evaluation {
        asset_value,
        asset_vol,
        d1,
        d2,
        kmv_distance_to_default: (asset_value - params.debt_face_value) / asset_vol,
        equity_residual,
        volatility_residual,
        tolerance: equity_residual.abs() + volatility_residual.abs(),
        default_probability: norm_cdf(-d2),
    }
}

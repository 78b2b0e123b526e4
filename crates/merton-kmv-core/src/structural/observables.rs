use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MertonKmvError;
use crate::types::{decimal_to_f64, Money, Rate, Years};
use crate::MertonKmvResult;

/// Observable market inputs for the structural model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketObservables {
    /// Market value of equity.
    pub equity_value: Money,
    /// Face value of debt (default barrier).
    pub debt_face_value: Money,
    /// Time to maturity in years.
    pub time_to_maturity: Years,
    /// Risk-free rate (annualized, decimal).
    pub risk_free_rate: Rate,
    /// Annualized equity volatility (decimal, e.g. 0.30 = 30%).
    pub equity_vol: Rate,
}

/// Observables converted to `f64`, with the grid-invariant terms precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructuralParams {
    pub equity_value: f64,
    pub debt_face_value: f64,
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub equity_vol: f64,
    /// sqrt(T)
    pub sqrt_t: f64,
    /// exp(-r * T)
    pub discount: f64,
}

impl StructuralParams {
    /// Build kernel parameters without validation.
    ///
    /// Non-positive inputs are allowed through and surface as non-finite
    /// residuals, which never win a strict `<` comparison.
    pub fn new(e: f64, d: f64, t: f64, r: f64, sigma_e: f64) -> Self {
        StructuralParams {
            equity_value: e,
            debt_face_value: d,
            time_to_maturity: t,
            risk_free_rate: r,
            equity_vol: sigma_e,
            sqrt_t: t.sqrt(),
            discount: (-r * t).exp(),
        }
    }
}

impl MarketObservables {
    /// Validate and convert to the solver's working representation.
    pub fn to_params(&self) -> MertonKmvResult<StructuralParams> {
        validate_observables(self)?;
        Ok(StructuralParams::new(
            decimal_to_f64(self.equity_value, "equity_value")?,
            decimal_to_f64(self.debt_face_value, "debt_face_value")?,
            decimal_to_f64(self.time_to_maturity, "time_to_maturity")?,
            decimal_to_f64(self.risk_free_rate, "risk_free_rate")?,
            decimal_to_f64(self.equity_vol, "equity_vol")?,
        ))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_observables(input: &MarketObservables) -> MertonKmvResult<()> {
    if input.equity_value <= Decimal::ZERO {
        return Err(MertonKmvError::invalid(
            "equity_value",
            "Equity value must be positive.",
        ));
    }
    if input.debt_face_value <= Decimal::ZERO {
        return Err(MertonKmvError::invalid(
            "debt_face_value",
            "Debt face value must be positive.",
        ));
    }
    if input.time_to_maturity <= Decimal::ZERO {
        return Err(MertonKmvError::invalid(
            "time_to_maturity",
            "Time to maturity must be positive.",
        ));
    }
    if input.equity_vol <= Decimal::ZERO {
        return Err(MertonKmvError::invalid(
            "equity_vol",
            "Equity volatility must be positive.",
        ));
    }
    Ok(())
}

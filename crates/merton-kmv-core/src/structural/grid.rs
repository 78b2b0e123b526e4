use serde::{Deserialize, Serialize};

use super::observables::StructuralParams;
use crate::error::MertonKmvError;
use crate::MertonKmvResult;

/// Lowest asset volatility on the grid; the sweep adds up to `1 - epsilon`.
pub const MIN_ASSET_VOL: f64 = 0.05;

/// How the grid index is turned into a sweep fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDivision {
    /// `i as f64 / steps as f64`: the sweep covers the full range.
    #[default]
    Real,
    /// `i / steps` in integer arithmetic: 0 for every `i < steps`, then 1.
    /// Collapses each sweep to two values.
    Truncating,
}

impl StepDivision {
    pub fn fraction(self, index: u32, steps: u32) -> f64 {
        match self {
            StepDivision::Real => f64::from(index) / f64::from(steps),
            StepDivision::Truncating => f64::from(index / steps),
        }
    }
}

/// Search-space parameters for the grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Points along the asset value axis.
    pub outer_steps: u32,
    /// Points along the asset volatility axis.
    pub inner_steps: u32,
    /// A candidate must beat this combined residual to be recorded at all.
    pub initial_tolerance: f64,
    /// Keeps the top of the volatility sweep just below 1.05.
    pub epsilon: f64,
    pub step_division: StepDivision,
    /// When set, a best tolerance above this is reported as not converged.
    pub convergence_threshold: Option<f64>,
    /// Scan rows on the rayon pool (requires the `parallel` feature).
    pub parallel: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            outer_steps: 10_000,
            inner_steps: 1_000,
            initial_tolerance: 10.0,
            epsilon: 1e-5,
            step_division: StepDivision::Real,
            convergence_threshold: None,
            parallel: false,
        }
    }
}

impl GridConfig {
    /// Total number of grid evaluations.
    pub fn evaluations(&self) -> u64 {
        u64::from(self.outer_steps) * u64::from(self.inner_steps)
    }

    /// Iteration counter reported for grid point `(i, j)`.
    pub fn iteration_index(&self, i: u32, j: u32) -> u64 {
        u64::from(i) * u64::from(self.inner_steps) + u64::from(j)
    }

    /// Candidate asset value on row `i`: `E + D/2 + f(i)·D`.
    pub fn asset_value_at(&self, i: u32, params: &StructuralParams) -> f64 {
        params.equity_value
            + params.debt_face_value / 2.0
            + self.step_division.fraction(i, self.outer_steps) * params.debt_face_value
    }

    /// Candidate asset volatility on column `j`: `0.05 + f(j)·(1 - epsilon)`.
    pub fn asset_vol_at(&self, j: u32) -> f64 {
        MIN_ASSET_VOL + self.step_division.fraction(j, self.inner_steps) * (1.0 - self.epsilon)
    }

    pub fn validate(&self) -> MertonKmvResult<()> {
        if self.outer_steps == 0 {
            return Err(MertonKmvError::invalid(
                "outer_steps",
                "Grid must have at least one asset value step.",
            ));
        }
        if self.inner_steps == 0 {
            return Err(MertonKmvError::invalid(
                "inner_steps",
                "Grid must have at least one volatility step.",
            ));
        }
        if !self.initial_tolerance.is_finite() || self.initial_tolerance <= 0.0 {
            return Err(MertonKmvError::invalid(
                "initial_tolerance",
                "Initial tolerance must be positive and finite.",
            ));
        }
        if !(0.0..1.0).contains(&self.epsilon) {
            return Err(MertonKmvError::invalid(
                "epsilon",
                "Epsilon must lie in [0, 1).",
            ));
        }
        if let Some(threshold) = self.convergence_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(MertonKmvError::invalid(
                    "convergence_threshold",
                    "Convergence threshold must be non-negative and finite.",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> StructuralParams {
        StructuralParams::new(3.0, 10.0, 1.0, 0.05, 0.3)
    }

    #[test]
    fn test_defaults() {
        let cfg = GridConfig::default();
        assert_eq!(cfg.outer_steps, 10_000);
        assert_eq!(cfg.inner_steps, 1_000);
        assert_eq!(cfg.initial_tolerance, 10.0);
        assert_eq!(cfg.epsilon, 1e-5);
        assert_eq!(cfg.evaluations(), 10_000_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_real_sweep_spans_the_debt() {
        let cfg = GridConfig::default();
        let p = params();
        assert_abs_diff_eq!(cfg.asset_value_at(1, &p), 3.0 + 5.0 + 0.001, epsilon = 1e-12);
        assert_abs_diff_eq!(cfg.asset_value_at(10_000, &p), 18.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cfg.asset_vol_at(1000), 0.05 + 0.99999, epsilon = 1e-12);
        // Asset values actually move along the row index
        let spread = cfg.asset_value_at(10_000, &p) - cfg.asset_value_at(1, &p);
        assert_abs_diff_eq!(spread, 10.0, epsilon = 0.01);
        assert!(cfg.asset_value_at(5_000, &p) > cfg.asset_value_at(1, &p) + 4.0);
    }

    #[test]
    fn test_truncating_sweep_collapses() {
        let cfg = GridConfig {
            step_division: StepDivision::Truncating,
            ..GridConfig::default()
        };
        let p = params();
        assert_eq!(cfg.asset_value_at(1, &p), 8.0);
        assert_eq!(cfg.asset_value_at(5_000, &p), 8.0);
        assert_eq!(cfg.asset_value_at(9_999, &p), 8.0);
        assert_eq!(cfg.asset_value_at(10_000, &p), 18.0);
        assert_eq!(cfg.asset_vol_at(999), MIN_ASSET_VOL);
    }

    #[test]
    fn test_iteration_index() {
        let cfg = GridConfig::default();
        assert_eq!(cfg.iteration_index(1, 1), 1_001);
        assert_eq!(cfg.iteration_index(10_000, 1_000), 10_001_000);
    }

    #[test]
    fn test_reject_bad_grids() {
        let bad = [
            GridConfig {
                outer_steps: 0,
                ..GridConfig::default()
            },
            GridConfig {
                inner_steps: 0,
                ..GridConfig::default()
            },
            GridConfig {
                initial_tolerance: 0.0,
                ..GridConfig::default()
            },
            GridConfig {
                initial_tolerance: f64::NAN,
                ..GridConfig::default()
            },
            GridConfig {
                epsilon: 1.0,
                ..GridConfig::default()
            },
            GridConfig {
                convergence_threshold: Some(-1.0),
                ..GridConfig::default()
            },
        ];
        for cfg in &bad {
            assert!(cfg.validate().is_err(), "{:?} should be rejected", cfg);
        }
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let cfg: GridConfig =
            serde_json::from_str(r#"{"outer_steps": 50, "step_division": "truncating"}"#).unwrap();
        assert_eq!(cfg.outer_steps, 50);
        assert_eq!(cfg.inner_steps, 1_000);
        assert_eq!(cfg.step_division, StepDivision::Truncating);
    }
}

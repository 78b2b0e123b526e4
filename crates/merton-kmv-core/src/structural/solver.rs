use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::equations::{evaluate, Evaluation};
use super::grid::{GridConfig, StepDivision, MIN_ASSET_VOL};
use super::grid_search::{
    grid_search, CandidateSolution, ImprovementEvent, SearchResult, SearchStatus,
};
use super::observables::{MarketObservables, StructuralParams};
use crate::error::MertonKmvError;
use crate::types::{with_metadata, ComputationOutput};
use crate::MertonKmvResult;

const METHODOLOGY: &str = "Merton/KMV structural model: equity as a call on firm assets, \
                           asset value and volatility by exhaustive grid search";

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Input for the Merton/KMV solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MertonKmvInput {
    #[serde(flatten)]
    pub observables: MarketObservables,
    #[serde(default)]
    pub grid: GridConfig,
}

/// Output of the Merton/KMV solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MertonKmvOutput {
    pub status: SearchStatus,
    /// Best grid point, absent when nothing beat the initial tolerance.
    pub best: Option<CandidateSolution>,
    pub improvements: Vec<ImprovementEvent>,
    pub evaluations: u64,
}

impl From<SearchResult> for MertonKmvOutput {
    fn from(r: SearchResult) -> Self {
        MertonKmvOutput {
            status: r.status,
            best: r.best,
            improvements: r.improvements,
            evaluations: r.evaluations,
        }
    }
}

/// Input for evaluating the structural equations at one point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateInput {
    #[serde(flatten)]
    pub observables: MarketObservables,
    pub asset_value: f64,
    pub asset_vol: f64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Solve for asset value and asset volatility, reporting improvements to
/// `on_improvement` as they are found.
pub fn calculate_merton_kmv_with<F>(
    input: &MertonKmvInput,
    on_improvement: F,
) -> MertonKmvResult<ComputationOutput<MertonKmvOutput>>
where
    F: FnMut(&ImprovementEvent),
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let params = input.observables.to_params()?;
    input.grid.validate()?;

    if input.grid.step_division == StepDivision::Truncating {
        warnings.push(
            "Truncating step division: asset value and volatility sweeps collapse to their \
             end points."
                .into(),
        );
    }

    let result = run_search(&params, &input.grid, on_improvement, &mut warnings);

    match result.status {
        SearchStatus::Converged => {}
        SearchStatus::NotConverged => warnings.push(format!(
            "Best tolerance exceeds the convergence threshold after {} evaluations.",
            result.evaluations
        )),
        SearchStatus::InvalidVolatility => warnings.push(
            "No grid point beat the initial tolerance; asset volatility could not be implied."
                .into(),
        ),
    }
    if let Some(best) = &result.best {
        warnings.extend(boundary_warnings(best, &params, &input.grid));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    tracing::info!(
        status = ?result.status,
        evaluations = result.evaluations,
        improvements = result.improvements.len(),
        elapsed_us = elapsed,
        "grid search finished"
    );

    Ok(with_metadata(
        METHODOLOGY,
        input,
        warnings,
        elapsed,
        MertonKmvOutput::from(result),
    ))
}

/// Solve for asset value and asset volatility.
pub fn calculate_merton_kmv(
    input: &MertonKmvInput,
) -> MertonKmvResult<ComputationOutput<MertonKmvOutput>> {
    calculate_merton_kmv_with(input, |_| {})
}

/// Evaluate the structural equations at a single `(A, sigma_A)` point.
pub fn evaluate_candidate(
    input: &EvaluateInput,
) -> MertonKmvResult<ComputationOutput<Evaluation>> {
    let start = Instant::now();
    let params = input.observables.to_params()?;

    if !input.asset_value.is_finite() || input.asset_value <= 0.0 {
        return Err(MertonKmvError::invalid(
            "asset_value",
            "Asset value must be positive and finite.",
        ));
    }
    if !input.asset_vol.is_finite() || input.asset_vol <= 0.0 {
        return Err(MertonKmvError::invalid(
            "asset_vol",
            "Asset volatility must be positive and finite.",
        ));
    }

    let evaluation = evaluate(input.asset_value, input.asset_vol, &params);
    let mut warnings = Vec::new();
    if input.asset_value < params.equity_value {
        warnings
            .push("Asset value below equity value; the firm would have negative debt.".into());
    }

    Ok(with_metadata(
        "Merton structural equations at a single point",
        input,
        warnings,
        start.elapsed().as_micros() as u64,
        evaluation,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

#[cfg(feature = "parallel")]
fn run_search<F>(
    params: &StructuralParams,
    config: &GridConfig,
    on_improvement: F,
    _warnings: &mut Vec<String>,
) -> SearchResult
where
    F: FnMut(&ImprovementEvent),
{
    if config.parallel {
        super::grid_search::grid_search_parallel(params, config, on_improvement)
    } else {
        grid_search(params, config, on_improvement)
    }
}

#[cfg(not(feature = "parallel"))]
fn run_search<F>(
    params: &StructuralParams,
    config: &GridConfig,
    on_improvement: F,
    warnings: &mut Vec<String>,
) -> SearchResult
where
    F: FnMut(&ImprovementEvent),
{
    if config.parallel {
        warnings.push(
            "Parallel scan requested but the `parallel` feature is disabled; ran sequentially."
                .into(),
        );
    }
    grid_search(params, config, on_improvement)
}

/// Flag optima sitting on the edge of the searched range.
fn boundary_warnings(
    best: &CandidateSolution,
    params: &StructuralParams,
    config: &GridConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let ev = &best.evaluation;
    if ev.asset_vol >= config.asset_vol_at(config.inner_steps) {
        warnings.push(format!(
            "Best asset volatility {:.6} is the top of the grid; the solution may lie above it.",
            ev.asset_vol
        ));
    } else if config.inner_steps > 1 && ev.asset_vol <= config.asset_vol_at(1) {
        warnings.push(format!(
            "Best asset volatility {:.6} is the bottom of the grid (floor {}).",
            ev.asset_vol, MIN_ASSET_VOL
        ));
    }
    if ev.asset_value >= config.asset_value_at(config.outer_steps, params) {
        warnings.push(format!(
            "Best asset value {:.6} is the top of the grid; the solution may lie above it.",
            ev.asset_value
        ));
    } else if config.outer_steps > 1 && ev.asset_value <= config.asset_value_at(1, params) {
        warnings.push(format!(
            "Best asset value {:.6} is the bottom of the grid; the solution may lie below it.",
            ev.asset_value
        ));
    }
    warnings
}

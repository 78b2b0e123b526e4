//! Two-dimensional grid search for asset value and asset volatility.
//!
//! Every `(i, j)` point of the grid is evaluated; the search never exits
//! early. The best point is kept in an explicit accumulator that only
//! accepts strictly smaller combined residuals, so the reported sequence of
//! improvements is strictly decreasing.

use serde::{Deserialize, Serialize};

use super::equations::{evaluate, Evaluation};
use super::grid::GridConfig;
use super::observables::StructuralParams;

/// Outcome classification of a completed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Converged,
    NotConverged,
    /// No grid point produced a usable residual.
    InvalidVolatility,
}

/// A grid point together with where it was found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateSolution {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    /// `i * inner_steps + j`
    pub iteration: u64,
}

/// Emitted once per strict improvement, in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImprovementEvent {
    pub asset_value: f64,
    pub asset_vol: f64,
    pub distance_to_default: f64,
    pub kmv_distance_to_default: f64,
    pub iterations_to_convergence: u64,
    pub tolerance: f64,
}

impl From<&CandidateSolution> for ImprovementEvent {
    fn from(c: &CandidateSolution) -> Self {
        ImprovementEvent {
            asset_value: c.evaluation.asset_value,
            asset_vol: c.evaluation.asset_vol,
            distance_to_default: c.evaluation.d1,
            kmv_distance_to_default: c.evaluation.kmv_distance_to_default,
            iterations_to_convergence: c.iteration,
            tolerance: c.evaluation.tolerance,
        }
    }
}

/// Final product of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub status: SearchStatus,
    pub best: Option<CandidateSolution>,
    pub improvements: Vec<ImprovementEvent>,
    pub evaluations: u64,
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Running best candidate.
#[derive(Debug, Clone)]
pub struct SearchState {
    best_tolerance: f64,
    best: Option<CandidateSolution>,
    improvements: Vec<ImprovementEvent>,
}

impl SearchState {
    pub fn new(initial_tolerance: f64) -> Self {
        SearchState {
            best_tolerance: initial_tolerance,
            best: None,
            improvements: Vec::new(),
        }
    }

    pub fn best_tolerance(&self) -> f64 {
        self.best_tolerance
    }

    /// Accept `candidate` if its tolerance is strictly below the current best.
    ///
    /// NaN never compares less, so non-finite points are skipped.
    pub fn offer(&mut self, candidate: CandidateSolution) -> Option<ImprovementEvent> {
        if candidate.evaluation.tolerance < self.best_tolerance {
            self.best_tolerance = candidate.evaluation.tolerance;
            self.best = Some(candidate);
            let event = ImprovementEvent::from(&candidate);
            self.improvements.push(event);
            Some(event)
        } else {
            None
        }
    }

    pub fn finish(self, config: &GridConfig) -> SearchResult {
        SearchResult {
            status: classify(self.best.as_ref(), config),
            best: self.best,
            improvements: self.improvements,
            evaluations: config.evaluations(),
        }
    }
}

/// Map the final best candidate to a status.
///
/// Without a convergence threshold any recorded improvement counts as
/// converged.
pub fn classify(best: Option<&CandidateSolution>, config: &GridConfig) -> SearchStatus {
    match (best, config.convergence_threshold) {
        (None, _) => SearchStatus::InvalidVolatility,
        (Some(_), None) => SearchStatus::Converged,
        (Some(c), Some(threshold)) if c.evaluation.tolerance <= threshold => {
            SearchStatus::Converged
        }
        (Some(_), Some(_)) => SearchStatus::NotConverged,
    }
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

/// Scan row `i` and return its prefix minima strictly below `threshold`.
///
/// The returned candidates have strictly decreasing tolerances in column
/// order, which is exactly what a sequential scan entering the row with a
/// best of `threshold` would record.
fn scan_row(
    params: &StructuralParams,
    config: &GridConfig,
    i: u32,
    threshold: f64,
) -> Vec<CandidateSolution> {
    let asset_value = config.asset_value_at(i, params);
    let mut floor = threshold;
    let mut minima = Vec::new();
    for j in 1..=config.inner_steps {
        let evaluation = evaluate(asset_value, config.asset_vol_at(j), params);
        if evaluation.tolerance < floor {
            floor = evaluation.tolerance;
            minima.push(CandidateSolution {
                evaluation,
                iteration: config.iteration_index(i, j),
            });
        }
    }
    minima
}

fn record<F>(state: &mut SearchState, candidate: CandidateSolution, on_improvement: &mut F)
where
    F: FnMut(&ImprovementEvent),
{
    if let Some(event) = state.offer(candidate) {
        tracing::debug!(
            asset_value = event.asset_value,
            asset_vol = event.asset_vol,
            distance_to_default = event.distance_to_default,
            kmv_distance_to_default = event.kmv_distance_to_default,
            iterations = event.iterations_to_convergence,
            tolerance = event.tolerance,
            "improved candidate"
        );
        on_improvement(&event);
    }
}

/// Sequential grid search over all `outer_steps × inner_steps` points.
///
/// `on_improvement` is called once per strict improvement, in order.
/// Inputs are not validated here; see [`super::solver::calculate_merton_kmv`].
pub fn grid_search<F>(
    params: &StructuralParams,
    config: &GridConfig,
    mut on_improvement: F,
) -> SearchResult
where
    F: FnMut(&ImprovementEvent),
{
    let mut state = SearchState::new(config.initial_tolerance);
    for i in 1..=config.outer_steps {
        for candidate in scan_row(params, config, i, state.best_tolerance()) {
            record(&mut state, candidate, &mut on_improvement);
        }
    }
    state.finish(config)
}

/// Data-parallel grid search.
///
/// Rows are scanned independently on the rayon pool against the initial
/// tolerance, then folded in row order through the same accumulator. The
/// events and result are identical to [`grid_search`].
#[cfg(feature = "parallel")]
pub fn grid_search_parallel<F>(
    params: &StructuralParams,
    config: &GridConfig,
    mut on_improvement: F,
) -> SearchResult
where
    F: FnMut(&ImprovementEvent),
{
    use rayon::prelude::*;

    let rows: Vec<Vec<CandidateSolution>> = (1..=config.outer_steps)
        .into_par_iter()
        .map(|i| scan_row(params, config, i, config.initial_tolerance))
        .collect();

    let mut state = SearchState::new(config.initial_tolerance);
    for candidate in rows.into_iter().flatten() {
        record(&mut state, candidate, &mut on_improvement);
    }
    state.finish(config)
}

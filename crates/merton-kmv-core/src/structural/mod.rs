//! Merton/KMV structural model.
//!
//! Implies a firm's asset value and asset volatility from observed equity
//! value and equity volatility, then reports the Black-Scholes distance to
//! default (d1) and the linear KMV proxy `(A - D) / sigma_A`.
//!
//! The two structural equations are solved by exhaustive grid search:
//! asset value sweeps `E + D/2 .. E + 3D/2`, asset volatility sweeps
//! `0.05 .. 1.05`, and the point with the smallest combined residual wins.

pub mod equations;
pub mod grid;
pub mod grid_search;
pub mod observables;
pub mod solver;

pub use equations::{evaluate, Evaluation};
pub use grid::{GridConfig, StepDivision};
pub use grid_search::{
    CandidateSolution, ImprovementEvent, SearchResult, SearchState, SearchStatus,
};
pub use observables::{MarketObservables, StructuralParams};
pub use solver::{
    calculate_merton_kmv, calculate_merton_kmv_with, evaluate_candidate, EvaluateInput,
    MertonKmvInput, MertonKmvOutput,
};

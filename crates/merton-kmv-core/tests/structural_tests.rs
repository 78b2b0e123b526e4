use approx::assert_abs_diff_eq;
use merton_kmv_core::structural::{
    calculate_merton_kmv, calculate_merton_kmv_with, evaluate, GridConfig, ImprovementEvent,
    MarketObservables, MertonKmvInput, MertonKmvOutput, SearchStatus, StepDivision,
};
use merton_kmv_core::{ComputationOutput, MertonKmvError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn coursework_firm() -> MarketObservables {
    // Typical coursework values: thin equity cushion over one-year debt
    MarketObservables {
        equity_value: dec!(3),
        debt_face_value: dec!(10),
        time_to_maturity: dec!(1),
        risk_free_rate: dec!(0.05),
        equity_vol: dec!(0.3),
    }
}

fn balanced_firm() -> MarketObservables {
    MarketObservables {
        equity_value: dec!(5),
        debt_face_value: dec!(5),
        time_to_maturity: dec!(0.5),
        risk_free_rate: dec!(0.02),
        equity_vol: dec!(0.4),
    }
}

fn medium_grid() -> GridConfig {
    GridConfig {
        outer_steps: 1_000,
        inner_steps: 200,
        ..GridConfig::default()
    }
}

fn solve(
    observables: MarketObservables,
    grid: GridConfig,
) -> (Vec<ImprovementEvent>, ComputationOutput<MertonKmvOutput>) {
    let mut events = Vec::new();
    let input = MertonKmvInput { observables, grid };
    let out = calculate_merton_kmv_with(&input, |e| events.push(*e)).unwrap();
    (events, out)
}

// ===========================================================================
// Convergence
// ===========================================================================

#[test]
fn test_coursework_firm_converges() {
    let (events, out) = solve(coursework_firm(), medium_grid());
    let result = &out.result;

    assert_eq!(result.status, SearchStatus::Converged);
    assert_eq!(result.evaluations, 200_000);

    let best = result.best.expect("converged search has a best candidate");
    let ev = best.evaluation;
    assert!(ev.tolerance <= 10.0);
    assert!(ev.tolerance < 0.05, "tolerance {} too coarse", ev.tolerance);

    // Asset value near E + D*exp(-rT), asset vol well below equity vol
    assert!(ev.asset_value > 12.0 && ev.asset_value < 13.0, "A = {}", ev.asset_value);
    assert!(ev.asset_vol > 0.06 && ev.asset_vol < 0.08, "sigma_A = {}", ev.asset_vol);
    assert!(ev.d1 > 3.0);
    assert!(ev.default_probability < 0.01);

    assert_eq!(events, result.improvements);
    assert!(out.warnings.is_empty(), "unexpected warnings: {:?}", out.warnings);
}

#[test]
fn test_improvements_strictly_decrease() {
    let (events, _) = solve(coursework_firm(), medium_grid());
    assert!(events.len() > 1);
    assert!(events[0].tolerance < 10.0);
    for pair in events.windows(2) {
        assert!(
            pair[1].tolerance < pair[0].tolerance,
            "{} reported after {}",
            pair[1].tolerance,
            pair[0].tolerance
        );
        assert!(pair[1].iterations_to_convergence > pair[0].iterations_to_convergence);
    }
}

#[test]
fn test_threshold_classification() {
    let loose = GridConfig {
        convergence_threshold: Some(0.05),
        ..medium_grid()
    };
    let (_, out) = solve(coursework_firm(), loose);
    assert_eq!(out.result.status, SearchStatus::Converged);

    let strict = GridConfig {
        convergence_threshold: Some(1e-9),
        ..medium_grid()
    };
    let (_, out) = solve(coursework_firm(), strict);
    assert_eq!(out.result.status, SearchStatus::NotConverged);
    assert!(out.result.best.is_some());
}

// ===========================================================================
// Determinism
// ===========================================================================

#[test]
fn test_repeated_runs_are_identical() {
    let (first_events, first) = solve(balanced_firm(), medium_grid());
    let (second_events, second) = solve(balanced_firm(), medium_grid());

    assert_eq!(first_events, second_events);
    assert_eq!(first.result.best, second.result.best);
    assert_eq!(first.result.status, second.result.status);
    assert_eq!(first.result.improvements, second.result.improvements);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_flag_reproduces_sequential_events() {
    let (seq_events, seq) = solve(balanced_firm(), medium_grid());
    let (par_events, par) = solve(
        balanced_firm(),
        GridConfig {
            parallel: true,
            ..medium_grid()
        },
    );
    assert_eq!(seq_events, par_events);
    assert_eq!(seq.result.best, par.result.best);
}

// ===========================================================================
// Reported quantities
// ===========================================================================

#[test]
fn test_kmv_distance_matches_recomputation() {
    let (events, out) = solve(balanced_firm(), medium_grid());
    let best = out.result.best.unwrap().evaluation;

    let expected_kmv = (best.asset_value - 5.0) / best.asset_vol;
    assert_abs_diff_eq!(best.kmv_distance_to_default, expected_kmv, epsilon = 1e-9);

    let params = balanced_firm().to_params().unwrap();
    let recomputed = evaluate(best.asset_value, best.asset_vol, &params);
    assert_abs_diff_eq!(
        best.kmv_distance_to_default,
        recomputed.kmv_distance_to_default,
        epsilon = 1e-9
    );
    assert_abs_diff_eq!(best.d1, recomputed.d1, epsilon = 1e-9);
    assert_abs_diff_eq!(best.tolerance, recomputed.tolerance, epsilon = 1e-9);

    let last = events.last().unwrap();
    assert_eq!(last.distance_to_default, best.d1);
    assert_eq!(last.kmv_distance_to_default, best.kmv_distance_to_default);
}

#[test]
fn test_output_serializes_to_json() {
    let (_, out) = solve(balanced_firm(), medium_grid());
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["result"]["status"], "converged");
    assert!(json["result"]["best"]["asset_value"].is_number());
    assert!(json["result"]["best"]["iteration"].is_u64());
    assert!(json["result"]["improvements"].as_array().unwrap().len() > 1);
    assert_eq!(json["metadata"]["precision"], "ieee754_f64");
}

// ===========================================================================
// Step division
// ===========================================================================

#[test]
fn test_real_division_sweeps_asset_value() {
    let (events, _) = solve(coursework_firm(), medium_grid());
    let mut distinct: Vec<f64> = Vec::new();
    for a in events.iter().map(|e| e.asset_value) {
        if !distinct.contains(&a) {
            distinct.push(a);
        }
    }
    assert!(distinct.len() > 2, "asset value never moved: {:?}", distinct);
}

#[test]
fn test_truncating_division_reproduces_collapsed_grid() {
    let grid = GridConfig {
        outer_steps: 200,
        inner_steps: 100,
        step_division: StepDivision::Truncating,
        ..GridConfig::default()
    };
    let (events, out) = solve(coursework_firm(), grid);
    assert_eq!(out.result.status, SearchStatus::Converged);
    for e in &events {
        assert!(e.asset_value == 8.0 || e.asset_value == 18.0, "A = {}", e.asset_value);
    }
    assert!(out.warnings.iter().any(|w| w.contains("Truncating")));
}

// ===========================================================================
// Validation
// ===========================================================================

#[test]
fn test_reject_invalid_observables() {
    let cases = [
        (
            "equity_value",
            MarketObservables {
                equity_value: Decimal::ZERO,
                ..coursework_firm()
            },
        ),
        (
            "debt_face_value",
            MarketObservables {
                debt_face_value: Decimal::ZERO,
                ..coursework_firm()
            },
        ),
        (
            "time_to_maturity",
            MarketObservables {
                time_to_maturity: dec!(-1),
                ..coursework_firm()
            },
        ),
        (
            "equity_vol",
            MarketObservables {
                equity_vol: dec!(-0.3),
                ..coursework_firm()
            },
        ),
    ];
    for (expected, observables) in cases {
        let input = MertonKmvInput {
            observables,
            grid: medium_grid(),
        };
        match calculate_merton_kmv(&input) {
            Err(MertonKmvError::InvalidInput { field, .. }) => assert_eq!(field, expected),
            other => panic!(
                "expected InvalidInput for {}, got {:?}",
                expected,
                other.map(|o| o.result.status)
            ),
        }
    }
}

// ===========================================================================
// Full default grid
// ===========================================================================

#[test]
#[ignore = "scans all 10,000,000 default grid points; run with --release -- --ignored"]
fn test_default_grid_coursework_firm() {
    let input = MertonKmvInput {
        observables: coursework_firm(),
        grid: GridConfig::default(),
    };
    let out = calculate_merton_kmv(&input).unwrap();
    assert_eq!(out.result.status, SearchStatus::Converged);
    assert_eq!(out.result.evaluations, 10_000_000);
    let best = out.result.best.unwrap().evaluation;
    assert!(best.tolerance < 0.01);
}

use clap::{Args, ValueEnum};
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::Value;

use merton_kmv_core::structural::solver::{self, EvaluateInput, MertonKmvInput};
use merton_kmv_core::structural::{
    GridConfig, ImprovementEvent, MarketObservables, SearchStatus, StepDivision,
};

use crate::input;

/// The five market observables, as flags.
#[derive(Args)]
pub struct ObservableArgs {
    /// JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
    /// Market value of equity
    #[arg(long)]
    pub equity_value: Option<Decimal>,
    /// Face value of debt
    #[arg(long)]
    pub debt_value: Option<Decimal>,
    /// Time to maturity in years
    #[arg(long)]
    pub maturity: Option<Decimal>,
    /// Risk-free rate as a decimal
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,
    /// Equity volatility as a decimal
    #[arg(long)]
    pub equity_vol: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StepDivisionArg {
    Real,
    Truncating,
}

impl From<StepDivisionArg> for StepDivision {
    fn from(arg: StepDivisionArg) -> Self {
        match arg {
            StepDivisionArg::Real => StepDivision::Real,
            StepDivisionArg::Truncating => StepDivision::Truncating,
        }
    }
}

/// Grid overrides. Unset flags keep the file value or the default.
#[derive(Args)]
pub struct GridArgs {
    /// Asset value grid points
    #[arg(long)]
    pub outer_steps: Option<u32>,
    /// Asset volatility grid points
    #[arg(long)]
    pub inner_steps: Option<u32>,
    /// Residual a candidate must beat to be recorded
    #[arg(long)]
    pub initial_tolerance: Option<f64>,
    /// Keeps the top of the volatility sweep just below 1.05
    #[arg(long)]
    pub epsilon: Option<f64>,
    /// How a grid index becomes a sweep fraction
    #[arg(long, value_enum)]
    pub step_division: Option<StepDivisionArg>,
    /// Report not-converged when the best residual exceeds this
    #[arg(long)]
    pub convergence_threshold: Option<f64>,
    /// Scan the grid on all cores (needs the `parallel` feature)
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Args)]
pub struct SolveArgs {
    #[command(flatten)]
    pub observables: ObservableArgs,
    #[command(flatten)]
    pub grid: GridArgs,
    /// Print every improved candidate to stderr as it is found
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub observables: ObservableArgs,
    /// Candidate asset value
    #[arg(long)]
    pub asset_value: Option<f64>,
    /// Candidate asset volatility
    #[arg(long)]
    pub asset_vol: Option<f64>,
}

impl ObservableArgs {
    /// Observables from flags; `None` when no flag was given.
    fn flag_observables(&self) -> Result<Option<MarketObservables>, Box<dyn std::error::Error>> {
        let flags = [
            self.equity_value,
            self.debt_value,
            self.maturity,
            self.risk_free_rate,
            self.equity_vol,
        ];
        if flags.iter().all(Option::is_none) {
            return Ok(None);
        }
        let require = |v: Option<Decimal>, name: &str| {
            v.ok_or_else(|| format!("--{} required when passing observables as flags", name))
        };
        Ok(Some(MarketObservables {
            equity_value: require(self.equity_value, "equity-value")?,
            debt_face_value: require(self.debt_value, "debt-value")?,
            time_to_maturity: require(self.maturity, "maturity")?,
            risk_free_rate: require(self.risk_free_rate, "risk-free-rate")?,
            equity_vol: require(self.equity_vol, "equity-vol")?,
        }))
    }
}

impl GridArgs {
    fn apply(&self, grid: &mut GridConfig) {
        if let Some(v) = self.outer_steps {
            grid.outer_steps = v;
        }
        if let Some(v) = self.inner_steps {
            grid.inner_steps = v;
        }
        if let Some(v) = self.initial_tolerance {
            grid.initial_tolerance = v;
        }
        if let Some(v) = self.epsilon {
            grid.epsilon = v;
        }
        if let Some(v) = self.step_division {
            grid.step_division = v.into();
        }
        if self.convergence_threshold.is_some() {
            grid.convergence_threshold = self.convergence_threshold;
        }
        if self.parallel {
            grid.parallel = true;
        }
    }
}

/// Pick the solver input: `--input` file, then flags, then piped stdin,
/// then interactive prompts. Later sources are only consulted when the
/// earlier ones are absent.
fn solve_input<S, P>(
    args: &ObservableArgs,
    read_stdin: S,
    prompt: P,
) -> Result<MertonKmvInput, Box<dyn std::error::Error>>
where
    S: FnOnce() -> Result<Option<Value>, Box<dyn std::error::Error>>,
    P: FnOnce() -> Result<MarketObservables, Box<dyn std::error::Error>>,
{
    if let Some(ref path) = args.input {
        return input::file::read_input(path);
    }
    if let Some(observables) = args.flag_observables()? {
        return Ok(MertonKmvInput {
            observables,
            grid: GridConfig::default(),
        });
    }
    if let Some(data) = read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    Ok(MertonKmvInput {
        observables: prompt()?,
        grid: GridConfig::default(),
    })
}

pub fn run_solve(args: SolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input_data = solve_input(
        &args.observables,
        input::stdin::read_stdin,
        input::prompt::prompt_observables,
    )?;
    args.grid.apply(&mut input_data.grid);

    let progress = args.progress;
    let result = solver::calculate_merton_kmv_with(&input_data, |event| {
        if progress {
            eprintln!("{}", render_event(event));
        }
    })?;

    let message = status_message(result.result.status, result.result.evaluations);
    match result.result.status {
        SearchStatus::Converged => eprintln!("{}", message.green()),
        _ => eprintln!("{}", message.yellow()),
    }
    Ok(serde_json::to_value(result)?)
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input_data: EvaluateInput = if let Some(ref path) = args.observables.input {
        input::file::read_input(path)?
    } else if let Some(observables) = args.observables.flag_observables()? {
        EvaluateInput {
            observables,
            asset_value: args.asset_value.ok_or("--asset-value required")?,
            asset_vol: args.asset_vol.ok_or("--asset-vol required")?,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file>, observable flags, or stdin required".into());
    };
    let result = solver::evaluate_candidate(&input_data)?;
    Ok(serde_json::to_value(result)?)
}

/// User-facing description of a search outcome.
pub fn status_message(status: SearchStatus, evaluations: u64) -> String {
    match status {
        SearchStatus::Converged => "Convergence achieved.".to_string(),
        SearchStatus::NotConverged => {
            format!("Convergence not achieved after {} iterations.", evaluations)
        }
        SearchStatus::InvalidVolatility => "Variance converges to a negative value.".to_string(),
    }
}

fn render_event(event: &ImprovementEvent) -> String {
    format!(
        "Firm Value: ${}\nVolatility of Firm Value: {}\nDistance to Default: {}\n\
         KMV Distance to Default: {}\nIterations to Convergence: {}\nTolerance: {}\n",
        event.asset_value,
        event.asset_vol,
        event.distance_to_default,
        event.kmv_distance_to_default,
        event.iterations_to_convergence,
        event.tolerance
    )
}

use anyhow::Result;
use serde_json::{Map, Value};
pub mod construct;
pub mod error;
pub mod local_search;
pub mod params;
pub mod perturb;
pub mod rng;
mod solver;
pub mod state;
pub mod stats;
pub mod tabu;
pub use error::SolveError;
pub use params::Params;
pub use solver::{SolveOutcome, Solver};
pub use stats::Statistics;
use mdp_challenges::diversity::*;

/// Runs the search with hyperparameters overlaid on the defaults and hands
/// the best subset to `save_solution`, which also receives every
/// intermediate improvement.
pub fn solve_challenge(
    challenge: &Challenge,
    bounds: &SizeBounds,
    save_solution: &dyn Fn(&Solution) -> Result<()>,
    hyperparameters: &Option<Map<String, Value>>,
) -> Result<SolveOutcome> {
    let params = Params::initialize(hyperparameters);
    let outcome = Solver::solve(challenge, *bounds, &params, Some(save_solution))?;
    save_solution(&outcome.solution)?;
    Ok(outcome)
}

pub fn solve(
    challenge: &Challenge,
    lower: usize,
    upper: usize,
    seed: u64,
    iterations_coef: u64,
    time_limit_secs: f64,
) -> Result<SolveOutcome, SolveError> {
    let params = Params {
        seed,
        iterations_coef,
        time_limit_secs,
        ..Params::default()
    };
    Solver::solve(challenge, SizeBounds::new(lower, upper), &params, None)
}

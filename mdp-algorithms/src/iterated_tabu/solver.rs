use super::construct::build_initial_solution;
use super::error::{check_value, SolveError};
use super::params::{Params, Schedule};
use super::perturb::{perturb, CandidateList};
use super::rng::{Lcg, Streams};
use super::state::State;
use super::stats::{Clock, Statistics};
use super::tabu::{tabu_search, TabuExit};
use mdp_challenges::diversity::{Challenge, SizeBounds, Solution};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Best subset of a run together with its diagnostics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub solution: Solution,
    pub value: f64,
    pub statistics: Statistics,
    pub total_time: Duration,
}

fn check_instance(challenge: &Challenge, bounds: &SizeBounds) -> Result<(), SolveError> {
    if challenge.num_items == 0 {
        return Err(SolveError::EmptyInstance);
    }
    if bounds.lower < 1 || bounds.lower > bounds.upper || bounds.upper > challenge.num_items {
        return Err(SolveError::InvalidBounds {
            lower: bounds.lower,
            upper: bounds.upper,
            size: challenge.num_items,
        });
    }
    Ok(())
}

/// Number of forced steps for the next perturbation: the schedule's count
/// when it is already small, otherwise uniform in `[min, count]`.
fn perturbation_length(schedule: &Schedule, rng: &mut Lcg) -> usize {
    let count = schedule.perturb_count;
    let min = schedule.min_perturb_count;
    if count <= min {
        count
    } else {
        min + rng.below(count - min + 1)
    }
}

pub struct Solver;

impl Solver {
    /// Construction, then tabu search restarted from perturbations of the
    /// current subset until the clock runs out (or `max_restarts` starts
    /// have been executed).
    pub fn solve(
        challenge: &Challenge,
        bounds: SizeBounds,
        params: &Params,
        save_solution: Option<&dyn Fn(&Solution) -> anyhow::Result<()>>,
    ) -> Result<SolveOutcome, SolveError> {
        check_instance(challenge, &bounds)?;

        let n = challenge.num_items;
        let schedule = params.schedule(n, &bounds);
        let clock = Clock::start(schedule.time_limit);
        let mut streams = Streams::new(params.seed);
        let mut stats = Statistics::default();

        let mut state = State::new(challenge, bounds)?;
        build_initial_solution(&mut state, schedule.random_start, &mut streams.construction)?;
        state.save_best();
        stats.time_to_best = clock.elapsed();
        tracing::debug!(
            "Initial solution {:.3} (size {}, {} construction)",
            state.value,
            state.size,
            if schedule.random_start { "random" } else { "greedy" }
        );
        if let Some(save_solution) = save_solution {
            if let Err(e) = save_solution(&state.best_solution()) {
                tracing::warn!("Failed to save solution: {}", e);
            }
        }

        let mut list = CandidateList::with_capacity(schedule.cand_list_size);
        let mut restart = 1;
        let mut exit = tabu_search(&mut state, &schedule, restart, &clock, &mut stats, save_solution);
        // an empty evaluation budget never reaches the clock poll inside tabu search
        while exit == TabuExit::BudgetExhausted
            && !clock.expired()
            && schedule.max_restarts.map_or(true, |max| restart < max)
        {
            restart += 1;
            let count = perturbation_length(&schedule, &mut streams.perturb_length);
            let steps = perturb(&mut state, count, &mut list, &mut streams.candidates);
            stats.perturbation_steps += steps as u64;
            tracing::trace!(
                "Start {}: perturbed {} of {} steps, value {:.3}",
                restart,
                steps,
                count,
                state.value
            );
            exit = tabu_search(&mut state, &schedule, restart, &clock, &mut stats, save_solution);
        }
        stats.restarts = restart;

        check_value(
            state.best_value,
            challenge.weights.membership_value(&state.best_selected),
        )?;

        let total_time = clock.elapsed();
        tracing::info!(
            "Finished {} starts with {} improvements: best {:.3} (size {}) after {:?}, total {:?}",
            stats.restarts,
            stats.improvements,
            state.best_value,
            state.best_selected.iter().filter(|&&s| s).count(),
            stats.time_to_best,
            total_time
        );
        Ok(SolveOutcome {
            solution: state.best_solution(),
            value: state.best_value,
            statistics: stats,
            total_time,
        })
    }
}

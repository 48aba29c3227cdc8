use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Counters of one run.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    /// Starts executed: the initial tabu search plus one per perturbation.
    pub restarts: usize,
    pub improvements: usize,
    /// Start during which the returned solution was found (1 = initial start).
    pub last_improvement_restart: usize,
    pub time_to_best: Duration,
    /// Candidate moves inspected by tabu and local search.
    pub evaluations: u64,
    /// Moves executed by tabu search.
    pub accepted_moves: u64,
    /// Improving moves executed by local search.
    pub local_search_moves: u64,
    /// Forced moves executed by perturbation, swaps counting twice.
    pub perturbation_steps: u64,
}

/// Wall clock of a run, polled once per tabu search iteration.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
    time_limit: Duration,
}

impl Clock {
    pub fn start(time_limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            time_limit,
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[inline(always)]
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.time_limit
    }
}

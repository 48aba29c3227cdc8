use super::error::{try_vec, SolveError};
use super::local_search::local_search;
use super::params::Schedule;
use super::state::{Move, State};
use super::stats::{Clock, Statistics};
use crate::{fixed_hasher, HashMap};
use anyhow::Result;
use mdp_challenges::{diversity::Solution, TOLERANCE};

/// Short-term memory of the tabu search.
///
/// Single-vertex countdowns are a dense vector. Forbidden swaps are few (at
/// most one is created per iteration and each lives `keep_tabu_time2`
/// iterations), so they are kept as a compact list of active pairs plus a
/// lookup from the unordered pair to its countdown.
pub struct TabuMemory {
    vertex: Vec<u32>,
    pair_lookup: HashMap<(usize, usize), u32>,
    active_pairs: Vec<(usize, usize)>,
}

#[inline(always)]
fn pair_key(k: usize, m: usize) -> (usize, usize) {
    if k < m {
        (k, m)
    } else {
        (m, k)
    }
}

impl TabuMemory {
    pub fn new(num_items: usize) -> Result<Self, SolveError> {
        Ok(Self {
            vertex: try_vec(num_items, 0, "tabu countdowns")?,
            pair_lookup: HashMap::with_hasher(fixed_hasher()),
            active_pairs: Vec::new(),
        })
    }

    pub fn clear(&mut self) {
        self.vertex.fill(0);
        self.pair_lookup.clear();
        self.active_pairs.clear();
    }

    #[inline(always)]
    pub fn is_vertex_tabu(&self, i: usize) -> bool {
        self.vertex[i] > 0
    }

    #[inline(always)]
    pub fn is_pair_tabu(&self, k: usize, m: usize) -> bool {
        self.pair_lookup.contains_key(&pair_key(k, m))
    }

    pub fn vertex_countdown(&self, i: usize) -> u32 {
        self.vertex[i]
    }

    pub fn pair_countdown(&self, k: usize, m: usize) -> u32 {
        self.pair_lookup.get(&pair_key(k, m)).copied().unwrap_or(0)
    }

    pub fn active_pair_count(&self) -> usize {
        self.active_pairs.len()
    }

    pub fn forbid_vertex(&mut self, i: usize, tenure: u32) {
        self.vertex[i] = tenure;
    }

    /// Forbids swapping `k` and `m` in either direction. Re-forbidding an
    /// active pair restarts its countdown.
    pub fn forbid_pair(&mut self, k: usize, m: usize, tenure: u32) {
        if tenure == 0 {
            return;
        }
        let key = pair_key(k, m);
        if self.pair_lookup.insert(key, tenure).is_none() {
            self.active_pairs.push(key);
        }
    }

    /// One iteration elapsed: every countdown drops by one and expired pairs
    /// leave the active list.
    pub fn tick(&mut self) {
        for t in self.vertex.iter_mut() {
            *t = t.saturating_sub(1);
        }
        let lookup = &mut self.pair_lookup;
        self.active_pairs.retain(|key| {
            let expired = match lookup.get_mut(key) {
                Some(countdown) => {
                    *countdown = countdown.saturating_sub(1);
                    *countdown == 0
                }
                None => true,
            };
            if expired {
                lookup.remove(key);
            }
            !expired
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabuExit {
    BudgetExhausted,
    TimeLimit,
}

struct Selection {
    chosen: Option<(Move, f64)>,
    aspiration: bool,
}

#[inline(always)]
fn keep_if_better(chosen: &mut Option<(Move, f64)>, mv: Move, delta: f64) {
    if chosen.map_or(true, |(_, best)| delta > best) {
        *chosen = Some((mv, delta));
    }
}

/// Picks the best non-tabu move, unless some move (tabu or not) leads past
/// the best-known value: the first such move found is taken at once.
/// Only non-tabu candidates count as evaluations.
fn select_move(state: &State, evaluations: &mut u64) -> Selection {
    let n = state.num_items();
    let bounds = state.bounds;
    let target = state.best_value + TOLERANCE;
    let mut chosen: Option<(Move, f64)> = None;

    if state.size < bounds.upper {
        for k in 0..n {
            if state.selected[k] {
                continue;
            }
            let delta = state.gain[k];
            let tabu = state.tabu.is_vertex_tabu(k);
            if !tabu {
                *evaluations += 1;
            }
            if state.value + delta > target {
                return Selection {
                    chosen: Some((Move::Add(k), delta)),
                    aspiration: true,
                };
            }
            if tabu {
                continue;
            }
            keep_if_better(&mut chosen, Move::Add(k), delta);
        }
    }

    if state.size > bounds.lower {
        for k in 0..n {
            if !state.selected[k] {
                continue;
            }
            let delta = -state.gain[k];
            let tabu = state.tabu.is_vertex_tabu(k);
            if !tabu {
                *evaluations += 1;
            }
            if state.value + delta > target {
                return Selection {
                    chosen: Some((Move::Remove(k), delta)),
                    aspiration: true,
                };
            }
            if tabu {
                continue;
            }
            keep_if_better(&mut chosen, Move::Remove(k), delta);
        }
    }

    if bounds.at_limit(state.size) {
        for k in 0..n {
            if !state.selected[k] {
                continue;
            }
            for m in 0..n {
                if state.selected[m] {
                    continue;
                }
                let mv = Move::Swap {
                    removed: k,
                    added: m,
                };
                let delta = state.swap_delta(k, m);
                let tabu = state.tabu.is_pair_tabu(k, m);
                if !tabu {
                    *evaluations += 1;
                }
                if state.value + delta > target {
                    return Selection {
                        chosen: Some((mv, delta)),
                        aspiration: true,
                    };
                }
                if tabu {
                    continue;
                }
                keep_if_better(&mut chosen, mv, delta);
            }
        }
    }

    Selection {
        chosen,
        aspiration: false,
    }
}

/// One tabu search run from the current subset.
///
/// Gains are rebuilt and the memory cleared on entry. The run ends after
/// `it_bound` move evaluations or once the clock expires; the clock is
/// polled after each complete iteration.
pub fn tabu_search(
    state: &mut State,
    schedule: &Schedule,
    restart: usize,
    clock: &Clock,
    stats: &mut Statistics,
    save_solution: Option<&dyn Fn(&Solution) -> Result<()>>,
) -> TabuExit {
    state.refresh_gains();
    state.tabu.clear();

    let mut it: u64 = 0;
    while it < schedule.it_bound {
        let before = it;
        let selection = select_move(state, &mut it);

        match selection.chosen {
            Some((mv, _)) => {
                state.apply(mv);
                stats.accepted_moves += 1;
            }
            // every candidate is tabu; let the iteration count anyway
            None => it += 1,
        }

        if selection.aspiration {
            let report = local_search(state);
            it += report.evaluations;
            stats.local_search_moves += report.moves;

            state.save_best();
            stats.improvements += 1;
            stats.last_improvement_restart = restart;
            stats.time_to_best = clock.elapsed();
            tracing::debug!(
                "New best {:.3} (size {}) at start {} after {:?}",
                state.best_value,
                state.size,
                restart,
                stats.time_to_best
            );
            if let Some(save_solution) = save_solution {
                if let Err(e) = save_solution(&state.best_solution()) {
                    tracing::warn!("Failed to save solution: {}", e);
                }
            }
        }
        stats.evaluations += it.saturating_sub(before);

        state.tabu.tick();
        match selection.chosen {
            Some((Move::Add(i), _)) | Some((Move::Remove(i), _)) => {
                state.tabu.forbid_vertex(i, schedule.keep_tabu_time1)
            }
            Some((Move::Swap { removed, added }, _)) => {
                state
                    .tabu
                    .forbid_pair(removed, added, schedule.keep_tabu_time2)
            }
            None => {}
        }

        if clock.expired() {
            return TabuExit::TimeLimit;
        }
    }
    TabuExit::BudgetExhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterated_tabu::params::Params;
    use crate::iterated_tabu::state::tests::{assert_consistent, four_vertex_challenge};
    use mdp_challenges::diversity::{Challenge, SizeBounds, WeightMatrix};
    use std::time::Duration;

    #[test]
    fn test_swap_tabu_expires_after_tenure() {
        let tenure = 20;
        let mut memory = TabuMemory::new(6).unwrap();
        memory.forbid_pair(4, 1, tenure);
        assert!(memory.is_pair_tabu(1, 4));
        assert!(memory.is_pair_tabu(4, 1));
        assert_eq!(memory.active_pair_count(), 1);

        for _ in 0..tenure - 1 {
            memory.tick();
        }
        assert!(memory.is_pair_tabu(4, 1));
        assert_eq!(memory.pair_countdown(4, 1), 1);

        memory.tick();
        assert!(!memory.is_pair_tabu(4, 1));
        assert_eq!(memory.pair_countdown(4, 1), 0);
        assert_eq!(memory.active_pair_count(), 0);
    }

    #[test]
    fn test_pair_countdowns_are_independent() {
        let mut memory = TabuMemory::new(6).unwrap();
        memory.forbid_pair(0, 1, 3);
        memory.tick();
        memory.forbid_pair(2, 3, 3);
        memory.tick();
        memory.tick();
        assert!(!memory.is_pair_tabu(0, 1));
        assert!(memory.is_pair_tabu(2, 3));
        assert_eq!(memory.active_pair_count(), 1);

        memory.forbid_pair(3, 2, 3);
        assert_eq!(memory.pair_countdown(2, 3), 3);
        assert_eq!(memory.active_pair_count(), 1);
    }

    #[test]
    fn test_vertex_tabu_and_clear() {
        let mut memory = TabuMemory::new(4).unwrap();
        memory.forbid_vertex(2, 2);
        memory.forbid_pair(0, 1, 5);
        memory.tick();
        assert!(memory.is_vertex_tabu(2));
        memory.tick();
        assert!(!memory.is_vertex_tabu(2));
        memory.forbid_vertex(3, 0);
        assert!(!memory.is_vertex_tabu(3));

        memory.clear();
        assert!(!memory.is_pair_tabu(0, 1));
        assert_eq!(memory.vertex_countdown(2), 0);
    }

    /// Only w23 is positive, so adding 3 to {2} is the one improving move.
    fn lone_positive_challenge() -> Challenge {
        let rows = vec![
            vec![0.0, -1.0, -2.0, -3.0],
            vec![-1.0, 0.0, -4.0, -5.0],
            vec![-2.0, -4.0, 0.0, 6.0],
            vec![-3.0, -5.0, 6.0, 0.0],
        ];
        Challenge::new(WeightMatrix::from_rows(&rows).unwrap())
    }

    #[test]
    fn test_aspiration_overrides_tabu() {
        let ch = lone_positive_challenge();
        let mut state = State::new(&ch, SizeBounds::new(1, 2)).unwrap();
        state.add(2);
        state.save_best();
        state.tabu.forbid_vertex(3, 5);

        let mut evaluations = 0;
        let selection = select_move(&state, &mut evaluations);
        assert!(selection.aspiration);
        assert_eq!(selection.chosen, Some((Move::Add(3), 6.0)));
        // adds 0 and 1 are inspected; the tabu 3 is not counted
        assert_eq!(evaluations, 2);
    }

    #[test]
    fn test_aspiration_move_counts_as_evaluation() {
        let ch = lone_positive_challenge();
        let mut state = State::new(&ch, SizeBounds::new(1, 2)).unwrap();
        state.add(2);
        state.save_best();

        let mut evaluations = 0;
        let selection = select_move(&state, &mut evaluations);
        assert!(selection.aspiration);
        assert_eq!(selection.chosen, Some((Move::Add(3), 6.0)));
        assert_eq!(evaluations, 3);
    }

    #[test]
    fn test_tabu_move_rejected_without_aspiration() {
        let ch = lone_positive_challenge();
        let mut state = State::new(&ch, SizeBounds::new(1, 2)).unwrap();
        state.add(2);
        state.best_value = 100.0;
        state.tabu.forbid_vertex(3, 5);

        let mut evaluations = 0;
        let selection = select_move(&state, &mut evaluations);
        assert!(!selection.aspiration);
        assert_eq!(
            selection.chosen,
            Some((
                Move::Swap {
                    removed: 2,
                    added: 0
                },
                0.0
            ))
        );
        // adds 0 and 1, then swaps 2->0, 2->1, 2->3
        assert_eq!(evaluations, 5);
    }

    #[test]
    fn test_tabu_search_finds_optimum_and_keeps_invariants() {
        let ch = four_vertex_challenge();
        let bounds = SizeBounds::exact(2);
        let mut state = State::new(&ch, bounds).unwrap();
        state.add(0);
        state.add(1);
        state.save_best();

        let params = Params {
            iterations_fixed_bound: 500,
            time_limit_secs: 60.0,
            ..Params::default()
        };
        let schedule = params.schedule(ch.num_items, &bounds);
        let clock = Clock::start(Duration::from_secs(60));
        let mut stats = Statistics::default();
        let exit = tabu_search(&mut state, &schedule, 1, &clock, &mut stats, None);

        assert_eq!(exit, TabuExit::BudgetExhausted);
        assert_eq!(state.best_value, 6.0);
        assert_eq!(state.best_solution().items, vec![2, 3]);
        assert!(stats.improvements >= 1);
        assert_eq!(stats.last_improvement_restart, 1);
        assert!(stats.evaluations >= 500);
        assert_eq!(state.size, 2);
        assert_consistent(&state);
    }

    #[test]
    fn test_tabu_search_stops_on_clock() {
        let ch = four_vertex_challenge();
        let bounds = SizeBounds::exact(2);
        let mut state = State::new(&ch, bounds).unwrap();
        state.add(0);
        state.add(1);
        state.save_best();

        let schedule = Params::default().schedule(ch.num_items, &bounds);
        let clock = Clock::start(Duration::ZERO);
        let mut stats = Statistics::default();
        let exit = tabu_search(&mut state, &schedule, 1, &clock, &mut stats, None);

        // the first iteration always completes
        assert_eq!(exit, TabuExit::TimeLimit);
        assert_eq!(stats.accepted_moves, 1);
    }

    #[test]
    fn test_every_iteration_keeps_value_exact() {
        let track = mdp_challenges::diversity::Track {
            num_items: 25,
            min_weight: -20.0,
            max_weight: 50.0,
        };
        let ch = Challenge::generate_instance(&[4u8; 32], &track).unwrap();
        let bounds = SizeBounds::new(4, 9);
        let mut state = State::new(&ch, bounds).unwrap();
        for i in 0..6 {
            state.add(i);
        }
        state.save_best();

        let params = Params::default();
        let clock = Clock::start(Duration::from_secs(60));
        let mut stats = Statistics::default();
        let mut accepted = 0;
        for step in 1..=60u64 {
            let schedule = Schedule {
                it_bound: 1,
                ..params.schedule(ch.num_items, &bounds)
            };
            tabu_search(&mut state, &schedule, 1, &clock, &mut stats, None);
            assert!(stats.accepted_moves >= accepted, "step {}", step);
            accepted = stats.accepted_moves;
            assert!(bounds.contains(state.size));
            assert!(
                (state.value - state.exact_value()).abs() <= TOLERANCE,
                "step {}: tracked {} exact {}",
                step,
                state.value,
                state.exact_value()
            );
            assert!(
                (state.best_value - ch.weights.membership_value(&state.best_selected)).abs()
                    <= TOLERANCE
            );
            // gains are checked before the next call rebuilds them
            assert_consistent(&state);
        }
    }
}

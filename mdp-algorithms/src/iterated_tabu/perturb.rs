use super::rng::Lcg;
use super::state::{Move, State};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub mv: Move,
    pub delta: f64,
}

/// Bounded buffer keeping the best `capacity` moves offered to it.
///
/// The position of the worst entry is cached so that a full list can tell in
/// O(1) whether a new move gets in; after an eviction the minimum is found
/// again by a scan of the (small) list.
pub struct CandidateList {
    capacity: usize,
    entries: Vec<Candidate>,
    worst: usize,
}

impl CandidateList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
            worst: 0,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.worst = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Candidate] {
        &self.entries
    }

    pub fn worst(&self) -> Option<&Candidate> {
        self.entries.get(self.worst)
    }

    pub fn offer(&mut self, mv: Move, delta: f64) {
        let candidate = Candidate { mv, delta };
        if self.entries.len() < self.capacity {
            self.entries.push(candidate);
            if self.entries.len() == 1 || delta < self.entries[self.worst].delta {
                self.worst = self.entries.len() - 1;
            }
        } else if self.capacity > 0 && delta > self.entries[self.worst].delta {
            self.entries[self.worst] = candidate;
            self.worst = 0;
            for (idx, c) in self.entries.iter().enumerate().skip(1) {
                if c.delta < self.entries[self.worst].delta {
                    self.worst = idx;
                }
            }
        }
    }

    /// Uniform pick, deliberately ignoring the ranking inside the list.
    pub fn pick(&self, rng: &mut Lcg) -> Option<Candidate> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries[rng.below(self.entries.len())])
    }
}

/// Forces `count` steps of moves away from the current subset, a swap
/// counting as two steps. Tabu status is ignored; instead a vertex moved
/// once is left alone for the rest of the perturbation. Every step offers all
/// feasible adds, removes and swaps to one shared candidate list and applies
/// a random member of it.
///
/// Returns the number of steps made, which falls short of `count` only when
/// no untouched vertex can move.
pub fn perturb(state: &mut State, count: usize, list: &mut CandidateList, rng: &mut Lcg) -> usize {
    let n = state.num_items();
    let bounds = state.bounds;
    state.touched.fill(false);

    let mut steps = 0;
    while steps < count {
        list.clear();
        if state.size < bounds.upper {
            for k in 0..n {
                if state.touched[k] || state.selected[k] {
                    continue;
                }
                list.offer(Move::Add(k), state.gain[k]);
            }
        }
        if state.size > bounds.lower {
            for k in 0..n {
                if state.touched[k] || !state.selected[k] {
                    continue;
                }
                list.offer(Move::Remove(k), -state.gain[k]);
            }
        }
        if bounds.at_limit(state.size) {
            for k in 0..n {
                if state.touched[k] || !state.selected[k] {
                    continue;
                }
                for m in 0..n {
                    if state.touched[m] || state.selected[m] {
                        continue;
                    }
                    list.offer(
                        Move::Swap {
                            removed: k,
                            added: m,
                        },
                        state.swap_delta(k, m),
                    );
                }
            }
        }

        let Some(candidate) = list.pick(rng) else {
            break;
        };
        state.apply(candidate.mv);
        match candidate.mv {
            Move::Add(i) | Move::Remove(i) => {
                state.touched[i] = true;
                steps += 1;
            }
            Move::Swap { removed, added } => {
                state.touched[removed] = true;
                state.touched[added] = true;
                steps += 2;
            }
        }
    }
    steps
}

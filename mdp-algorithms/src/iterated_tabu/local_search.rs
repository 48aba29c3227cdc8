use super::state::State;
use mdp_challenges::TOLERANCE;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalSearchReport {
    pub value_change: f64,
    pub evaluations: u64,
    pub moves: u64,
}

/// First-improvement descent over add, remove and swap moves.
///
/// Passes repeat until one full round applies nothing. Adds run while the
/// subset is below its upper bound, removes while above its lower bound, and
/// swaps only at either bound.
pub fn local_search(state: &mut State) -> LocalSearchReport {
    let n = state.num_items();
    let bounds = state.bounds;
    let mut report = LocalSearchReport::default();
    let mut repeat = true;

    while repeat {
        repeat = false;

        if state.size < bounds.upper {
            for k in 0..n {
                if state.selected[k] {
                    continue;
                }
                report.evaluations += 1;
                let delta = state.gain[k];
                if delta <= TOLERANCE {
                    continue;
                }
                repeat = true;
                report.moves += 1;
                report.value_change += delta;
                state.add(k);
                if state.size >= bounds.upper {
                    break;
                }
            }
        }

        if state.size > bounds.lower {
            for k in 0..n {
                if !state.selected[k] {
                    continue;
                }
                report.evaluations += 1;
                let delta = -state.gain[k];
                if delta <= TOLERANCE {
                    continue;
                }
                repeat = true;
                report.moves += 1;
                report.value_change += delta;
                state.remove(k);
                if state.size <= bounds.lower {
                    break;
                }
            }
        }

        if bounds.at_limit(state.size) {
            for k in 0..n {
                if !state.selected[k] {
                    continue;
                }
                // k leaves at most once per pass; the scan resumes at k + 1
                for m in 0..n {
                    if state.selected[m] {
                        continue;
                    }
                    report.evaluations += 1;
                    let delta = state.swap_delta(k, m);
                    if delta <= TOLERANCE {
                        continue;
                    }
                    repeat = true;
                    report.moves += 1;
                    report.value_change += delta;
                    state.swap(k, m);
                    break;
                }
            }
        }
    }
    report
}

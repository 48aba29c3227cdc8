use super::error::{check_value, try_vec, SolveError};
use super::rng::Lcg;
use super::state::State;

/// Builds the starting subset, sets its exact value and refreshes gains.
pub fn build_initial_solution(
    state: &mut State,
    random_start: bool,
    rng: &mut Lcg,
) -> Result<(), SolveError> {
    if random_start {
        random_subset(state, rng);
    } else {
        steepest_ascent(state, rng)?;
    }
    state.refresh_gains();
    Ok(())
}

/// Uniform size in `[lower, upper]`, then that many distinct vertices drawn
/// by a partial shuffle.
pub fn random_subset(state: &mut State, rng: &mut Lcg) {
    let n = state.num_items();
    let bounds = state.bounds;
    state.clear();

    let target = bounds.lower + rng.below(bounds.upper - bounds.lower + 1);
    let mut pool: Vec<usize> = (0..n).collect();
    for i in 0..target {
        let r = i + rng.below(n - i);
        state.selected[pool[r]] = true;
        pool[r] = pool[i];
    }
    state.size = target;
    state.value = state.exact_value();
}

#[derive(Clone, Copy, PartialEq)]
enum Decision {
    Open,
    Out,
    In,
}

/// Greedy build that fixes one vertex per step.
///
/// Open vertices are treated as selected with probability `q / n`, where `q`
/// is the middle of the size bounds. `f` tracks `n^2` times the expected
/// objective; each step commits the (vertex, in/out) decision that raises it
/// most, ties broken uniformly by reservoir sampling. Once the subset is full
/// (or can no longer shrink) the remaining vertices are forced out (or in).
/// After the last decision `f / n^2` is the exact objective, which is checked
/// against a pairwise recomputation.
pub fn steepest_ascent(state: &mut State, rng: &mut Lcg) -> Result<(), SolveError> {
    let n = state.num_items();
    let bounds = state.bounds;
    let ch = state.ch;
    let weights = &ch.weights;
    let q = if bounds.lower == bounds.upper {
        bounds.lower
    } else {
        (bounds.lower + bounds.upper) / 2
    };
    let (qf, nf) = (q as f64, n as f64);

    let mut decision = try_vec(n, Decision::Open, "construction decisions")?;
    // weight towards still-open vertices, and towards vertices decided in
    let mut open_weight = try_vec(n, 0.0f64, "construction open weights")?;
    let mut in_weight = try_vec(n, 0.0f64, "construction selected weights")?;

    let mut f = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let w = weights.get(i, j);
            f += w;
            open_weight[i] += w;
            open_weight[j] += w;
        }
    }
    f *= qf * qf;

    let score = |i: usize, open_weight: &[f64], in_weight: &[f64]| {
        qf * open_weight[i] + nf * in_weight[i]
    };

    let mut num_out = 0;
    let mut num_in = 0;
    let mut forced: Option<Decision> = None;
    for _ in 0..n {
        if num_in == bounds.upper {
            forced = Some(Decision::Out);
            break;
        }
        if n - num_out == bounds.lower {
            forced = Some(Decision::In);
            break;
        }

        let mut best: Option<(usize, Decision, f64)> = None;
        let mut ties = 0u32;
        for i in 0..n {
            if decision[i] != Decision::Open {
                continue;
            }
            let db = score(i, &open_weight, &in_weight);
            for (value, improvement) in [(Decision::Out, -qf * db), (Decision::In, (nf - qf) * db)] {
                match best {
                    Some((_, _, max)) if improvement < max => {}
                    Some((_, _, max)) if improvement == max => {
                        ties += 1;
                        if rng.next_f64() <= 1.0 / ties as f64 {
                            best = Some((i, value, max));
                        }
                    }
                    _ => {
                        best = Some((i, value, improvement));
                        ties = 1;
                    }
                }
            }
        }
        let Some((ind, value, improvement)) = best else {
            break;
        };

        f += improvement;
        decision[ind] = value;
        if value == Decision::In {
            num_in += 1;
        } else {
            num_out += 1;
        }
        for i in 0..n {
            if decision[i] != Decision::Open {
                continue;
            }
            let w = weights.get(i, ind);
            if w == 0.0 {
                continue;
            }
            if value == Decision::In {
                in_weight[i] += w;
            }
            open_weight[i] -= w;
        }
    }

    if let Some(value) = forced {
        for k in 0..n {
            if decision[k] != Decision::Open {
                continue;
            }
            let db = score(k, &open_weight, &in_weight);
            f += if value == Decision::In {
                (nf - qf) * db
            } else {
                -qf * db
            };
            decision[k] = value;
            for i in (k + 1)..n {
                if decision[i] != Decision::Open {
                    continue;
                }
                let w = weights.get(i, k);
                if w == 0.0 {
                    continue;
                }
                if value == Decision::In {
                    in_weight[i] += w;
                }
                open_weight[i] -= w;
            }
        }
    }
    let tracked = f / nf / nf;

    state.clear();
    for i in 0..n {
        if decision[i] == Decision::In {
            state.selected[i] = true;
            state.size += 1;
        }
    }
    let recomputed = state.exact_value();
    check_value(tracked, recomputed)?;
    state.value = recomputed;
    Ok(())
}

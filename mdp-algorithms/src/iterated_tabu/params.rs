use mdp_challenges::diversity::SizeBounds;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Seed shared by the three random streams (construction uses it as is,
    /// the candidate and perturbation-length streams use 2x and 3x)
    pub seed: u64,

    /// Upper cap on the single-vertex tabu tenure
    pub tabu_time1: u32,

    /// Single-vertex tenure never exceeds n / tabu_coef
    pub tabu_coef: usize,

    /// Tenure of a forbidden swap pair
    pub tabu_time2: u32,

    /// Minimum number of move evaluations per tabu search run
    pub iterations_fixed_bound: u64,

    /// Move evaluations per tabu search run, per vertex
    pub iterations_coef: u64,

    /// Perturbation length as a fraction of n (capped by the lower size bound)
    pub perturb_coef: f64,

    /// Shortest perturbation once the computed length exceeds it
    pub min_perturb_count: usize,

    /// Capacity of the perturbation candidate list
    pub cand_list_size: usize,

    /// Instances larger than this start from a random subset instead of
    /// the greedy build, which is O(n^2) per decision
    pub random_start_threshold: usize,

    /// Wall-clock budget of the whole run
    pub time_limit_secs: f64,

    /// Optional cap on the number of starts, independent of the clock
    pub max_restarts: Option<usize>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            seed: 1000,
            tabu_time1: 20,
            tabu_coef: 4,
            tabu_time2: 20,
            iterations_fixed_bound: 10_000,
            iterations_coef: 1000,
            perturb_coef: 0.1,
            min_perturb_count: 10,
            cand_list_size: 5,
            random_start_threshold: 200,
            time_limit_secs: 1.0,
            max_restarts: None,
        }
    }
}

impl Params {
    /// Start from the defaults and overlay every recognised user key.
    /// A hyperparameter map that does not deserialize leaves the defaults untouched.
    pub fn initialize(hyperparameters: &Option<Map<String, Value>>) -> Self {
        let base_params = Self::default();
        let mut merged_params = match serde_json::to_value(base_params) {
            Ok(v) => v,
            Err(_) => return base_params,
        };
        if let (Value::Object(ref mut obj), Some(map)) = (&mut merged_params, hyperparameters) {
            for (k, v) in map {
                if obj.contains_key(k) {
                    obj.insert(k.clone(), v.clone());
                }
            }
        }
        serde_json::from_value(merged_params).unwrap_or(base_params)
    }

    /// Resolves the per-instance quantities of one run.
    pub fn schedule(&self, num_items: usize, bounds: &SizeBounds) -> Schedule {
        let keep_tabu_time1 = if self.tabu_coef == 0 {
            self.tabu_time1
        } else {
            self.tabu_time1
                .min((num_items / self.tabu_coef).min(u32::MAX as usize) as u32)
        };
        let it_bound = self
            .iterations_fixed_bound
            .max((num_items as u64).saturating_mul(self.iterations_coef));
        let perturb_count = ((num_items as f64 * self.perturb_coef) as usize).min(bounds.lower);
        Schedule {
            keep_tabu_time1,
            keep_tabu_time2: self.tabu_time2,
            it_bound,
            perturb_count,
            min_perturb_count: self.min_perturb_count,
            cand_list_size: self.cand_list_size,
            random_start: num_items > self.random_start_threshold,
            time_limit: time_limit(self.time_limit_secs),
            max_restarts: self.max_restarts,
        }
    }
}

/// Non-positive and NaN budgets are empty; too large to represent (including
/// infinity) means unbounded.
fn time_limit(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Schedule {
    pub keep_tabu_time1: u32,
    pub keep_tabu_time2: u32,
    pub it_bound: u64,
    pub perturb_count: usize,
    pub min_perturb_count: usize,
    pub cand_list_size: usize,
    pub random_start: bool,
    pub time_limit: Duration,
    pub max_restarts: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_overlays_known_keys() {
        let hyperparameters = json!({
            "cand_list_size": 8,
            "time_limit_secs": 2.5,
            "max_restarts": 4,
            "not_a_param": true,
        });
        let params = Params::initialize(&hyperparameters.as_object().cloned());
        assert_eq!(params.cand_list_size, 8);
        assert_eq!(params.time_limit_secs, 2.5);
        assert_eq!(params.max_restarts, Some(4));
        assert_eq!(params.tabu_time2, 20);
    }

    #[test]
    fn test_initialize_falls_back_on_bad_values() {
        let hyperparameters = json!({ "cand_list_size": "many" });
        let params = Params::initialize(&hyperparameters.as_object().cloned());
        assert_eq!(params, Params::default());
        assert_eq!(Params::initialize(&None), Params::default());
    }

    #[test]
    fn test_schedule_time_limits() {
        let bounds = SizeBounds::new(1, 2);
        let with_limit = |secs: f64| {
            Params {
                time_limit_secs: secs,
                ..Params::default()
            }
            .schedule(4, &bounds)
            .time_limit
        };
        assert_eq!(with_limit(f64::INFINITY), Duration::MAX);
        assert_eq!(with_limit(1e300), Duration::MAX);
        assert!(with_limit(86_400.0 * 365.0) > Duration::from_secs(3600));
        assert_eq!(with_limit(0.25), Duration::from_millis(250));
        assert_eq!(with_limit(0.0), Duration::ZERO);
        assert_eq!(with_limit(-1.0), Duration::ZERO);
        assert_eq!(with_limit(f64::NAN), Duration::ZERO);
        assert_eq!(with_limit(f64::NEG_INFINITY), Duration::ZERO);
    }

    #[test]
    fn test_schedule_small_instance() {
        let schedule = Params::default().schedule(40, &SizeBounds::new(5, 8));
        assert_eq!(schedule.keep_tabu_time1, 10);
        assert_eq!(schedule.keep_tabu_time2, 20);
        assert_eq!(schedule.it_bound, 40_000);
        assert_eq!(schedule.perturb_count, 4);
        assert!(!schedule.random_start);
        assert_eq!(schedule.time_limit, Duration::from_secs(1));
    }

    #[test]
    fn test_schedule_large_instance() {
        let params = Params {
            iterations_coef: 1,
            ..Params::default()
        };
        let schedule = params.schedule(500, &SizeBounds::new(100, 200));
        assert_eq!(schedule.keep_tabu_time1, 20);
        assert_eq!(schedule.it_bound, 10_000);
        assert_eq!(schedule.perturb_count, 50);
        assert!(schedule.random_start);
    }

    #[test]
    fn test_schedule_negative_time_limit() {
        let params = Params {
            time_limit_secs: -1.0,
            ..Params::default()
        };
        let schedule = params.schedule(10, &SizeBounds::exact(2));
        assert_eq!(schedule.time_limit, Duration::ZERO);
    }
}

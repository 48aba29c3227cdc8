mod loader;
mod matrix;
pub use matrix::WeightMatrix;

use anyhow::{anyhow, Result};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub num_items: usize,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            num_items: 100,
            min_weight: 0.0,
            max_weight: 1000.0,
        }
    }
}

/// Admissible subset sizes `lower <= |S| <= upper`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub lower: usize,
    pub upper: usize,
}

impl SizeBounds {
    pub fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }

    pub fn exact(size: usize) -> Self {
        Self::new(size, size)
    }

    #[inline(always)]
    pub fn contains(&self, size: usize) -> bool {
        self.lower <= size && size <= self.upper
    }

    /// Either bound is attained, which is where swaps are evaluated.
    #[inline(always)]
    pub fn at_limit(&self, size: usize) -> bool {
        size == self.lower || size == self.upper
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Solution {
    pub items: Vec<usize>,
}

impl Solution {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_membership(selected: &[bool]) -> Self {
        Self {
            items: (0..selected.len()).filter(|&i| selected[i]).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Challenge {
    pub seed: [u8; 32],
    pub num_items: usize,
    pub weights: WeightMatrix,
}

impl Challenge {
    pub fn new(weights: WeightMatrix) -> Self {
        Self {
            seed: [0u8; 32],
            num_items: weights.size(),
            weights,
        }
    }

    pub fn generate_instance(seed: &[u8; 32], track: &Track) -> Result<Self> {
        if track.num_items == 0 {
            return Err(anyhow!("Number of items must be at least 1"));
        }
        if !(track.min_weight <= track.max_weight) {
            return Err(anyhow!(
                "Invalid weight range [{}, {}]",
                track.min_weight,
                track.max_weight
            ));
        }
        let mut rng = SmallRng::from_seed(seed.clone());
        let n = track.num_items;

        // Weights are kept at two decimals, like the published benchmark sets
        let mut weights = WeightMatrix::zeros(n)?;
        for i in 0..n {
            for j in (i + 1)..n {
                let w: f64 = rng.gen_range(track.min_weight..=track.max_weight);
                weights.set(i, j, (w * 100.0).round() / 100.0);
            }
        }

        Ok(Challenge {
            seed: seed.clone(),
            num_items: n,
            weights,
        })
    }

    pub fn evaluate_total_value(&self, solution: &Solution) -> Result<f64> {
        let selected_items: HashSet<usize> = solution.items.iter().cloned().collect();
        if selected_items.len() != solution.items.len() {
            return Err(anyhow!("Duplicate items selected."));
        }
        if let Some(&item) = solution.items.iter().find(|&&i| i >= self.num_items) {
            return Err(anyhow!("Item ({}) is out of bounds", item));
        }
        let mut indices: Vec<usize> = selected_items.into_iter().collect();
        indices.sort();
        Ok(self.weights.subset_value(&indices))
    }

    pub fn verify_solution(&self, solution: &Solution, bounds: &SizeBounds) -> Result<f64> {
        let value = self.evaluate_total_value(solution)?;
        if !bounds.contains(solution.items.len()) {
            return Err(anyhow!(
                "Subset size ({}) is outside [{}, {}]",
                solution.items.len(),
                bounds.lower,
                bounds.upper
            ));
        }
        Ok(value)
    }
}

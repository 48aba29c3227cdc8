use super::error::{try_vec, SolveError};
use super::tabu::TabuMemory;
use mdp_challenges::diversity::{Challenge, SizeBounds, Solution};
use ndarray::Array1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Move {
    Add(usize),
    Remove(usize),
    Swap { removed: usize, added: usize },
}

/// Everything needed for incremental move evaluation.
///
/// `gain[i]` is the sum of `w[i][j]` over the selected `j`, kept for every
/// vertex: the value won by adding an unselected `i`, or lost by removing a
/// selected one.
pub struct State<'a> {
    pub ch: &'a Challenge,
    pub bounds: SizeBounds,
    pub selected: Vec<bool>,
    pub gain: Array1<f64>,
    pub size: usize,
    pub value: f64,
    pub tabu: TabuMemory,
    /// Vertices already moved by the current perturbation.
    pub touched: Vec<bool>,
    pub best_selected: Vec<bool>,
    pub best_value: f64,
}

impl<'a> State<'a> {
    pub fn new(ch: &'a Challenge, bounds: SizeBounds) -> Result<Self, SolveError> {
        let n = ch.num_items;
        Ok(Self {
            ch,
            bounds,
            selected: try_vec(n, false, "membership vector")?,
            gain: Array1::from_vec(try_vec(n, 0.0, "gain vector")?),
            size: 0,
            value: 0.0,
            tabu: TabuMemory::new(n)?,
            touched: try_vec(n, false, "perturbation marks")?,
            best_selected: try_vec(n, false, "best membership vector")?,
            best_value: f64::NEG_INFINITY,
        })
    }

    #[inline(always)]
    pub fn num_items(&self) -> usize {
        self.ch.num_items
    }

    /// Empties the subset. Gains are left stale until [`refresh_gains`](Self::refresh_gains).
    pub fn clear(&mut self) {
        self.selected.fill(false);
        self.size = 0;
        self.value = 0.0;
    }

    /// Recomputes every gain from the membership vector.
    pub fn refresh_gains(&mut self) {
        let x: Array1<f64> = self
            .selected
            .iter()
            .map(|&s| if s { 1.0 } else { 0.0 })
            .collect();
        self.gain = self.ch.weights.as_array().dot(&x);
    }

    /// Objective of the membership vector, summed pair by pair.
    pub fn exact_value(&self) -> f64 {
        self.ch.weights.membership_value(&self.selected)
    }

    #[inline(always)]
    pub fn swap_delta(&self, removed: usize, added: usize) -> f64 {
        self.gain[added] - self.gain[removed] - self.ch.weights.get(removed, added)
    }

    #[inline(always)]
    pub fn delta(&self, mv: Move) -> f64 {
        match mv {
            Move::Add(i) => self.gain[i],
            Move::Remove(i) => -self.gain[i],
            Move::Swap { removed, added } => self.swap_delta(removed, added),
        }
    }

    #[inline(always)]
    pub fn add(&mut self, i: usize) {
        debug_assert!(!self.selected[i]);
        self.value += self.gain[i];
        self.gain.scaled_add(1.0, &self.ch.weights.row(i));
        self.selected[i] = true;
        self.size += 1;
    }

    #[inline(always)]
    pub fn remove(&mut self, i: usize) {
        debug_assert!(self.selected[i]);
        self.value -= self.gain[i];
        self.gain.scaled_add(-1.0, &self.ch.weights.row(i));
        self.selected[i] = false;
        self.size -= 1;
    }

    #[inline(always)]
    pub fn swap(&mut self, removed: usize, added: usize) {
        self.remove(removed);
        self.add(added);
    }

    pub fn apply(&mut self, mv: Move) {
        match mv {
            Move::Add(i) => self.add(i),
            Move::Remove(i) => self.remove(i),
            Move::Swap { removed, added } => self.swap(removed, added),
        }
    }

    pub fn save_best(&mut self) {
        self.best_selected.copy_from_slice(&self.selected);
        self.best_value = self.value;
    }

    pub fn best_solution(&self) -> Solution {
        Solution::from_membership(&self.best_selected)
    }

    pub fn current_solution(&self) -> Solution {
        Solution::from_membership(&self.selected)
    }
}

//! Park-Miller minimal standard generator.
//!
//! Every stream is the recurrence `seed' = 16807 * seed mod (2^31 - 1)` with
//! output `seed' / 2^31`, reproducible from a plain integer seed.

pub const MODULUS: u64 = 2_147_483_647;
const MULTIPLIER: u64 = 16_807;

/// Advances `seed` once, returning the uniform value in `[0, 1)` and the new seed.
#[inline(always)]
pub fn next(seed: u64) -> (f64, u64) {
    let seed = ((MULTIPLIER as u128 * seed as u128) % MODULUS as u128) as u64;
    (seed as f64 / (MODULUS + 1) as f64, seed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lcg {
    seed: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline(always)]
    pub fn next_f64(&mut self) -> f64 {
        let (value, seed) = next(self.seed);
        self.seed = seed;
        value
    }

    /// Index in `0..bound` obtained by truncating `value * bound`.
    #[inline(always)]
    pub fn below(&mut self, bound: usize) -> usize {
        let index = (self.next_f64() * bound as f64) as usize;
        index.min(bound.saturating_sub(1))
    }
}

/// The three independent streams of one run.
#[derive(Debug, Clone)]
pub struct Streams {
    /// Randomized start and tie-breaking in the greedy build.
    pub construction: Lcg,
    /// Choice among perturbation candidates.
    pub candidates: Lcg,
    /// Number of forced moves per perturbation.
    pub perturb_length: Lcg,
}

impl Streams {
    pub fn new(seed: u64) -> Self {
        // only the residue matters to the recurrence
        let seed = seed % MODULUS;
        Self {
            construction: Lcg::new(seed),
            candidates: Lcg::new(2 * seed),
            perturb_length: Lcg::new(3 * seed),
        }
    }
}

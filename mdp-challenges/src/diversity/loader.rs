use super::{Challenge, WeightMatrix};
use anyhow::{anyhow, Context, Result};
use std::{
    fs,
    io::{Read, Write},
    path::Path,
    str::FromStr,
};

fn next_token<'a, T: FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    what: &str,
    record: usize,
) -> Result<T> {
    let token = tokens
        .next()
        .ok_or_else(|| anyhow!("Unexpected end of input reading {} of record {}", what, record))?;
    token
        .parse::<T>()
        .map_err(|_| anyhow!("Invalid {} '{}' in record {}", what, token, record))
}

/// Position of the unordered pair `i < j` in row-major upper-triangle order.
#[inline(always)]
fn pair_index(n: usize, i: usize, j: usize) -> usize {
    i * (2 * n - i - 1) / 2 + (j - i - 1)
}

impl Challenge {
    /// Parses an instance: the order `n` followed by `n(n-1)/2` records
    /// `i j w`, one per unordered pair, 0-indexed.
    pub fn from_text(input: &str) -> Result<Self> {
        let mut tokens = input.split_whitespace();
        let n: usize = tokens
            .next()
            .ok_or_else(|| anyhow!("Empty instance"))?
            .parse()
            .map_err(|_| anyhow!("Invalid instance size"))?;
        if n == 0 {
            return Err(anyhow!("Instance size must be at least 1"));
        }

        let num_pairs = n
            .checked_mul(n - 1)
            .map(|p| p / 2)
            .ok_or_else(|| anyhow!("Instance size {} is too large", n))?;
        let mut seen: Vec<bool> = Vec::new();
        seen.try_reserve_exact(num_pairs)
            .map_err(|e| anyhow!("Failed to allocate pair table: {}", e))?;
        seen.resize(num_pairs, false);

        let mut weights = WeightMatrix::zeros(n)?;
        for record in 1..=num_pairs {
            let i: usize = next_token(&mut tokens, "first vertex", record)?;
            let j: usize = next_token(&mut tokens, "second vertex", record)?;
            let w: f64 = next_token(&mut tokens, "weight", record)?;
            if i >= n || j >= n {
                return Err(anyhow!(
                    "Vertex out of range in record {}: ({}, {}) with n = {}",
                    record,
                    i,
                    j,
                    n
                ));
            }
            if !w.is_finite() {
                return Err(anyhow!("Non-finite weight {} in record {}", w, record));
            }
            if i == j {
                return Err(anyhow!("Self-pair ({}, {}) in record {}", i, j, record));
            }
            let (a, b) = if i < j { (i, j) } else { (j, i) };
            let idx = pair_index(n, a, b);
            if seen[idx] {
                return Err(anyhow!("Duplicate pair ({}, {}) in record {}", a, b, record));
            }
            seen[idx] = true;
            weights.set(a, b, w);
        }

        Ok(Challenge::new(weights))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        Self::from_text(&input)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let input = fs::read_to_string(path)
            .with_context(|| format!("Failed to read instance {}", path.display()))?;
        Self::from_text(&input).with_context(|| format!("Failed to parse instance {}", path.display()))
    }

    /// Writes the instance in the format read by [`Challenge::from_text`],
    /// zero weights included.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", self.num_items)?;
        for i in 0..self.num_items {
            for j in (i + 1)..self.num_items {
                writeln!(writer, "{} {} {}", i, j, self.weights.get(i, j))?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

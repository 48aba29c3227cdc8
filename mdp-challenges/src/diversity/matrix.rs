use anyhow::{anyhow, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Dense symmetric pairwise weights. The diagonal is kept at zero so that a
/// full row can be folded into the gain vector without special-casing it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    values: Array2<f64>,
}

impl WeightMatrix {
    pub fn zeros(size: usize) -> Result<Self> {
        let len = size
            .checked_mul(size)
            .ok_or_else(|| anyhow!("Weight matrix of order {} is too large", size))?;
        let mut buffer: Vec<f64> = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|e| anyhow!("Failed to allocate weight matrix of order {}: {}", size, e))?;
        buffer.resize(len, 0.0);
        let values = Array2::from_shape_vec((size, size), buffer)?;
        Ok(Self { values })
    }

    /// Builds a matrix from explicit rows. Rows must form a square, symmetric
    /// matrix; diagonal entries are ignored.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        let mut matrix = Self::zeros(size)?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(anyhow!(
                    "Row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    size
                ));
            }
            for j in (i + 1)..size {
                if row[j] != rows[j][i] {
                    return Err(anyhow!(
                        "Weights are not symmetric at ({}, {}): {} vs {}",
                        i,
                        j,
                        row[j],
                        rows[j][i]
                    ));
                }
                matrix.set(i, j, row[j]);
            }
        }
        Ok(matrix)
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.values.nrows()
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    /// Sets both `w[i][j]` and `w[j][i]`.
    pub fn set(&mut self, i: usize, j: usize, weight: f64) {
        debug_assert_ne!(i, j, "diagonal entries are unused");
        self.values[[i, j]] = weight;
        self.values[[j, i]] = weight;
    }

    #[inline(always)]
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    /// Sum of the weights of every unordered pair inside `items`.
    pub fn subset_value(&self, items: &[usize]) -> f64 {
        let mut total = 0.0;
        for (a, &i) in items.iter().enumerate() {
            for &j in &items[a + 1..] {
                total += self.get(i, j);
            }
        }
        total
    }

    /// Same as [`subset_value`](Self::subset_value) for a membership vector.
    pub fn membership_value(&self, selected: &[bool]) -> f64 {
        let items: Vec<usize> = (0..selected.len()).filter(|&i| selected[i]).collect();
        self.subset_value(&items)
    }
}

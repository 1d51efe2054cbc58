use rand::Rng;
use serde::Serialize;

use super::{Dimension, MatrixError};

/// Exclusive upper bound of freshly generated cells; the range is `[0, 100)`.
pub const CELL_UPPER_BOUND: i64 = 100;

/// Dense square matrix stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    n: usize,
    cells: Vec<i64>,
}

impl Matrix {
    /// Builds a matrix from explicit rows. Every row must be as long as the row
    /// count, and there must be at least one row.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, MatrixError> {
        let n = rows.len();
        if n == 0 {
            return Err(MatrixError::ShapeMismatch { expected: 1, found: 0 });
        }

        let mut cells = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(MatrixError::ShapeMismatch { expected: n, found: row.len() });
            }
            cells.extend(row);
        }
        Ok(Self { n, cells })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.cells[row * self.n + col]
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[i64] {
        &self.cells[i * self.n..(i + 1) * self.n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i64]> {
        self.cells.chunks_exact(self.n)
    }

    /// Row-major view of all cells.
    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    pub fn first(&self) -> i64 {
        self.cells[0]
    }

    pub fn last(&self) -> i64 {
        self.cells[self.cells.len() - 1]
    }

    fn transpose(&self) -> Matrix {
        let n = self.n;
        let mut cells = vec![0i64; n * n];
        for i in 0..n {
            for j in 0..n {
                cells[j * n + i] = self.cells[i * n + j];
            }
        }
        Matrix { n, cells }
    }
}

/// Fills an `n×n` matrix with independent uniform draws from `[0, 100)`.
///
/// The dimension is trusted; it has already been through [`super::validate`].
pub fn generate<R: Rng + ?Sized>(dimension: Dimension, rng: &mut R) -> Matrix {
    let n = dimension.get();
    let cells = (0..n * n)
        .map(|_| rng.gen_range(0..CELL_UPPER_BOUND))
        .collect();
    Matrix { n, cells }
}

/// `C = A × B` with `C[i][j] = Σ_k A[i][k]·B[k][j]`.
///
/// Bᵀ is materialized first so the inner loop walks two contiguous rows.
/// Accumulation wraps on i64 overflow; with cells below 100 that cannot
/// happen for any dimension that fits in memory.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix, MatrixError> {
    if a.n != b.n {
        return Err(MatrixError::ShapeMismatch { expected: a.n, found: b.n });
    }

    let n = a.n;
    let bt = b.transpose();
    let mut cells = vec![0i64; n * n];

    for (i, out_row) in cells.chunks_exact_mut(n).enumerate() {
        let row = a.row(i);
        for (j, out) in out_row.iter_mut().enumerate() {
            let col = bt.row(j);
            *out = row
                .iter()
                .zip(col)
                .fold(0i64, |acc, (&x, &y)| acc.wrapping_add(x.wrapping_mul(y)));
        }
    }

    Ok(Matrix { n, cells })
}

/// Corner view of a product matrix, the only part a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub dimension: usize,
    pub first_element: i64,
    pub last_element: i64,
}

impl Summary {
    pub fn of(product: &Matrix) -> Self {
        Self {
            dimension: product.dimension(),
            first_element: product.first(),
            last_element: product.last(),
        }
    }
}

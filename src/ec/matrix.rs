//! Dense GF(2^8) Matrices
//!
//! Row-major matrices over owned contiguous buffers. The stride is always the
//! column count, which is the layout the multiply-accumulate kernel expects.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Row-major matrix of GF(2^8) elements
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Matrix {
    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0u8; rows * cols],
        }
    }

    /// Create an identity matrix of the given size
    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m[(i, i)] = 1;
        }
        m
    }

    /// Build a matrix from equally sized rows.
    ///
    /// Returns `None` when the rows disagree on length.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Option<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n = rows.len();
        Some(Self {
            rows: n,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (also the row stride)
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True for square matrices
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Borrow one row
    pub fn row(&self, r: usize) -> &[u8] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks_exact(0) panics, and a zero-column matrix has no row data
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Gather the entries of row `r` at the given column positions
    pub fn gather(&self, r: usize, cols: &[usize]) -> Vec<u8> {
        let row = self.row(r);
        cols.iter().map(|&c| row[c]).collect()
    }

    /// Swap two rows in place
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let cols = self.cols;
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.data.split_at_mut(hi * cols);
        head[lo * cols..(lo + 1) * cols].swap_with_slice(&mut tail[..cols]);
    }

    /// Flat row-major view
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Rows as nested vectors, mostly for display and serialization
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.iter_rows().map(<[u8]>::to_vec).collect()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = u8;

    fn index(&self, (r, c): (usize, usize)) -> &u8 {
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut u8 {
        &mut self.data[r * self.cols + c]
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{}", self.rows, self.cols)?;
        for row in self.iter_rows() {
            let line: Vec<String> = row.iter().map(|v| format!("{:3}", v)).collect();
            writeln!(f, "  [{}]", line.join(" "))?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

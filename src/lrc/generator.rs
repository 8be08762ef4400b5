//! Generator Matrix Builder
//!
//! The n x k systematic encoding matrix of an Azure-style LRC:
//!
//! - rows `[0, k)`: identity
//! - rows `[k, k+l)`: local parity `i` covers data columns `[i*b, (i+1)*b)`
//! - rows `[k+l, n)`: Cauchy rows, `entry(row, col) = 1 / (row ^ col)`

use crate::ec::galois::divide;
use crate::ec::matrix::Matrix;
use crate::error::{Error, Result};

/// Largest stripe width whose Cauchy rows fit in GF(2^8)
pub const MAX_STRIPE_WIDTH: usize = 256;

/// Build the generator matrix for `(k, l, g)`.
///
/// Pure function of its arguments: every call returns a fresh, bit-identical
/// matrix.
pub fn generator_matrix(k: usize, l: usize, g: usize) -> Result<Matrix> {
    validate_code_shape(k, l, g)?;

    let n = k + l + g;
    let b = k / l;
    let mut m = Matrix::zeros(n, k);

    for i in 0..k {
        m[(i, i)] = 1;
    }

    for i in 0..l {
        for j in 0..b {
            m[(k + i, i * b + j)] = 1;
        }
    }

    for row in (k + l)..n {
        for col in 0..k {
            // row >= k+l > col, so row ^ col is never zero
            m[(row, col)] = divide(1, (row ^ col) as u8)?;
        }
    }

    Ok(m)
}

/// Check the `(k, l, g)` shape shared by every scheme
pub fn validate_code_shape(k: usize, l: usize, g: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::Config("k must be greater than 0".to_string()));
    }
    if l == 0 {
        return Err(Error::Config("l must be greater than 0".to_string()));
    }
    if k % l != 0 {
        return Err(Error::Config(format!(
            "k={} is not divisible by l={}",
            k, l
        )));
    }
    let n = k + l + g;
    if n > MAX_STRIPE_WIDTH {
        return Err(Error::Config(format!(
            "stripe width n={} exceeds {}",
            n, MAX_STRIPE_WIDTH
        )));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::galois::mul;

    #[test]
    fn test_identity_rows() {
        let m = generator_matrix(6, 2, 2).unwrap();
        for r in 0..6 {
            for c in 0..6 {
                assert_eq!(m[(r, c)], u8::from(r == c));
            }
        }
    }

    #[test]
    fn test_local_parity_rows() {
        let m = generator_matrix(9, 3, 3).unwrap();
        assert_eq!(m.row(9), &[1, 1, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(m.row(10), &[0, 0, 0, 1, 1, 1, 0, 0, 0]);
        assert_eq!(m.row(11), &[0, 0, 0, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_cauchy_rows() {
        let m = generator_matrix(9, 3, 3).unwrap();
        assert_eq!(m.rows(), 15);
        for row in 12..15 {
            for col in 0..9 {
                assert_eq!(mul(m[(row, col)], (row ^ col) as u8), 1);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let a = generator_matrix(10, 2, 2).unwrap();
        let b = generator_matrix(10, 2, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_shape() {
        assert!(matches!(generator_matrix(10, 3, 2), Err(Error::Config(_))));
        assert!(matches!(generator_matrix(0, 1, 2), Err(Error::Config(_))));
        assert!(matches!(generator_matrix(4, 0, 2), Err(Error::Config(_))));
        assert!(matches!(generator_matrix(250, 5, 2), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_global_parities() {
        let m = generator_matrix(4, 2, 0).unwrap();
        assert_eq!(m.rows(), 6);
    }
}

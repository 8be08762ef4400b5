//! GF(2^8) Primitives
//!
//! Scalar and matrix arithmetic over GF(2^8) with the 0x11d reduction
//! polynomial. Scalar products come from the `reed-solomon-erasure` field
//! tables; everything else is built on top of them.

use reed_solomon_erasure::galois_8;

use crate::ec::matrix::Matrix;
use crate::error::{Error, Result};

/// Field multiplication
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    galois_8::mul(a, b)
}

/// Field division `a / b`
pub fn divide(a: u8, b: u8) -> Result<u8> {
    if b == 0 {
        return Err(Error::DivisionByZero);
    }
    Ok(galois_8::div(a, b))
}

/// Invert a square matrix with Gauss-Jordan elimination.
///
/// The input is left untouched; a singular matrix yields
/// [`Error::SingularMatrix`].
pub fn invert_matrix(m: &Matrix) -> Result<Matrix> {
    if !m.is_square() {
        return Err(Error::SingularMatrix { size: m.rows() });
    }

    let size = m.rows();
    let mut work = m.clone();
    let mut inv = Matrix::identity(size);

    for col in 0..size {
        let pivot_row = (col..size)
            .find(|&r| work[(r, col)] != 0)
            .ok_or(Error::SingularMatrix { size })?;
        work.swap_rows(col, pivot_row);
        inv.swap_rows(col, pivot_row);

        let scale = divide(1, work[(col, col)])?;
        if scale != 1 {
            for c in 0..size {
                work[(col, c)] = mul(work[(col, c)], scale);
                inv[(col, c)] = mul(inv[(col, c)], scale);
            }
        }

        for r in 0..size {
            let factor = work[(r, col)];
            if r == col || factor == 0 {
                continue;
            }
            for c in 0..size {
                work[(r, c)] ^= mul(factor, work[(col, c)]);
                inv[(r, c)] ^= mul(factor, inv[(col, c)]);
            }
        }
    }

    Ok(inv)
}

/// Batched multiply-accumulate over byte buffers.
///
/// Computes `outputs[r] = Σ coefficients[r][c] · inputs[c]` for every row of
/// `coefficients`. Outputs are overwritten. All buffers must share one length.
pub fn multiply_accumulate(
    outputs: &mut [Vec<u8>],
    inputs: &[&[u8]],
    coefficients: &Matrix,
) -> Result<()> {
    if outputs.len() != coefficients.rows() {
        return Err(Error::BufferSizeMismatch {
            expected: coefficients.rows(),
            actual: outputs.len(),
        });
    }
    if inputs.len() != coefficients.cols() {
        return Err(Error::BufferSizeMismatch {
            expected: coefficients.cols(),
            actual: inputs.len(),
        });
    }

    let block_size = inputs.first().map(|b| b.len()).unwrap_or(0);
    if let Some(bad) = inputs.iter().find(|b| b.len() != block_size) {
        return Err(Error::BufferSizeMismatch {
            expected: block_size,
            actual: bad.len(),
        });
    }

    for (r, out) in outputs.iter_mut().enumerate() {
        out.clear();
        out.resize(block_size, 0);
        for (input, &coef) in inputs.iter().zip(coefficients.row(r)) {
            match coef {
                0 => {}
                1 => {
                    for (o, &i) in out.iter_mut().zip(input.iter()) {
                        *o ^= i;
                    }
                }
                _ => {
                    for (o, &i) in out.iter_mut().zip(input.iter()) {
                        *o ^= mul(i, coef);
                    }
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

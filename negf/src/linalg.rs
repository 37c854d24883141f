//! Small dense helpers shared by the recursion and the assembly routines.

use crate::error::NegfError;
use nalgebra::DMatrix;
use num_complex::Complex;

pub type C64 = Complex<f64>;
pub type ComplexMatrix = DMatrix<C64>;

/// Entrywise max-modulus ("M") norm. Returns NaN if any entry is not finite.
pub fn max_abs_norm(m: &ComplexMatrix) -> f64 {
    let mut norm = 0.0_f64;
    for z in m.iter() {
        let modulus = z.norm();
        if !modulus.is_finite() {
            return f64::NAN;
        }
        norm = norm.max(modulus);
    }
    norm
}

/// `omega * s - h`, optionally transposed.
pub fn shifted_block(
    omega: C64,
    s: &DMatrix<f64>,
    h: &DMatrix<f64>,
    transpose: bool,
) -> ComplexMatrix {
    let block = s.zip_map(h, |s_ij, h_ij| omega * s_ij - h_ij);
    if transpose {
        block.transpose()
    } else {
        block
    }
}

/// Writes `omega * s - h` (or its transpose) into `dst` without reallocating.
pub(crate) fn fill_shifted_block(
    dst: &mut ComplexMatrix,
    omega: C64,
    s: &DMatrix<f64>,
    h: &DMatrix<f64>,
    transpose: bool,
) {
    let (rows, cols) = dst.shape();
    for j in 0..cols {
        for i in 0..rows {
            let (p, q) = if transpose { (j, i) } else { (i, j) };
            dst[(i, j)] = omega * s[(p, q)] - h[(p, q)];
        }
    }
}

/// Inverts `m` in place. False when the matrix is singular or the inverse
/// overflowed.
pub fn invert_in_place(m: &mut ComplexMatrix) -> bool {
    m.try_inverse_mut() && m.iter().all(|z| z.re.is_finite() && z.im.is_finite())
}

pub(crate) fn ensure_shape(
    what: &'static str,
    m: &DMatrix<f64>,
    expected: (usize, usize),
) -> Result<(), NegfError> {
    if m.shape() != expected {
        return Err(NegfError::DimensionMismatch {
            what,
            expected,
            found: m.shape(),
        });
    }
    Ok(())
}

pub(crate) fn ensure_complex_shape(
    what: &'static str,
    m: &ComplexMatrix,
    expected: (usize, usize),
) -> Result<(), NegfError> {
    if m.shape() != expected {
        return Err(NegfError::DimensionMismatch {
            what,
            expected,
            found: m.shape(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_abs_norm_uses_modulus() {
        let m = ComplexMatrix::from_row_slice(
            2,
            2,
            &[
                C64::new(0.3, 0.4),
                C64::new(-0.1, 0.0),
                C64::new(0.0, -0.2),
                C64::new(0.0, 0.0),
            ],
        );
        assert!((max_abs_norm(&m) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn max_abs_norm_flags_nan() {
        let mut m = ComplexMatrix::zeros(2, 2);
        m[(1, 0)] = C64::new(f64::NAN, 0.0);
        assert!(max_abs_norm(&m).is_nan());
    }

    #[test]
    fn shifted_block_transpose() {
        let s = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
        let h = DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 2.0, 0.0]);
        let omega = C64::new(0.5, 0.01);

        let direct = shifted_block(omega, &s, &h, false);
        let transposed = shifted_block(omega, &s, &h, true);
        assert_eq!(direct.transpose(), transposed);

        let mut filled = ComplexMatrix::zeros(2, 2);
        fill_shifted_block(&mut filled, omega, &s, &h, true);
        assert_eq!(filled, transposed);
        assert_eq!(direct[(0, 1)], omega * 0.5 + 1.0);
    }

    #[test]
    fn singular_matrix_is_not_inverted() {
        let mut zero = ComplexMatrix::zeros(3, 3);
        assert!(!invert_in_place(&mut zero));

        let mut diag = ComplexMatrix::from_diagonal_element(3, 3, C64::new(0.0, 2.0));
        assert!(invert_in_place(&mut diag));
        assert!((diag[(1, 1)] - C64::new(0.0, -0.5)).norm() < 1e-15);
    }
}

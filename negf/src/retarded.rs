//! Retarded Green's function of a finite scattering region.

use crate::error::NegfError;
use crate::linalg::{
    ensure_complex_shape, ensure_shape, fill_shifted_block, invert_in_place, ComplexMatrix, C64,
};
use nalgebra::DMatrix;
use std::f64::consts::PI;

/// Running sum of contact self-energies for one energy point.
///
/// The number of contacts is fixed up front so that assembling the Green's
/// function before every contact has been added is caught as a user error.
#[derive(Debug, Clone)]
pub struct SelfEnergySum {
    total: ComplexMatrix,
    summed: usize,
    expected: usize,
}

impl SelfEnergySum {
    pub fn new(dim: usize, expected: usize) -> Self {
        SelfEnergySum {
            total: ComplexMatrix::zeros(dim, dim),
            summed: 0,
            expected,
        }
    }

    pub fn add(&mut self, sigma: &ComplexMatrix) -> Result<(), NegfError> {
        ensure_complex_shape("contact self-energy", sigma, self.total.shape())?;
        self.total += sigma;
        self.summed += 1;
        Ok(())
    }

    pub fn summed(&self) -> usize {
        self.summed
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.summed >= self.expected
    }

    pub fn total(&self) -> &ComplexMatrix {
        &self.total
    }

    /// Zeroes the sum for the next energy point, keeping the allocation.
    pub fn clear(&mut self) {
        self.total.fill(C64::new(0.0, 0.0));
        self.summed = 0;
    }
}

/// `G = [ω S - H - V_H - Σ]⁻¹` for the scattering region.
///
/// `v_hartree` is an optional additive potential correction. An incomplete
/// self-energy sum is reported before any shape check or inversion.
pub fn retarded_green_function(
    omega: C64,
    h_s: &DMatrix<f64>,
    s_s: &DMatrix<f64>,
    v_hartree: Option<&DMatrix<f64>>,
    sigma: &SelfEnergySum,
) -> Result<ComplexMatrix, NegfError> {
    if !sigma.is_complete() {
        return Err(NegfError::IncompleteSelfEnergy {
            summed: sigma.summed,
            expected: sigma.expected,
        });
    }

    let n = h_s.nrows();
    ensure_shape("scattering Hamiltonian", h_s, (n, n))?;
    ensure_shape("scattering overlap", s_s, (n, n))?;
    if let Some(v) = v_hartree {
        ensure_shape("Hartree potential", v, (n, n))?;
    }
    ensure_complex_shape("self-energy sum", &sigma.total, (n, n))?;

    let mut g = ComplexMatrix::zeros(n, n);
    fill_shifted_block(&mut g, omega, s_s, h_s, false);
    if let Some(v) = v_hartree {
        g.zip_apply(v, |z, v_ij| *z -= v_ij);
    }
    g -= &sigma.total;

    if !invert_in_place(&mut g) {
        return Err(NegfError::SingularRetarded);
    }
    Ok(g)
}

/// Density of states `-Im tr(G S) / π`.
pub fn density_of_states(g: &ComplexMatrix, s: &DMatrix<f64>) -> Result<f64, NegfError> {
    let n = g.nrows();
    ensure_complex_shape("Green's function", g, (n, n))?;
    ensure_shape("overlap", s, (n, n))?;
    let mut trace = 0.0;
    for i in 0..g.nrows() {
        for k in 0..g.ncols() {
            trace += g[(i, k)].im * s[(k, i)];
        }
    }
    Ok(-trace / PI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::max_abs_norm;

    #[test]
    fn incomplete_sum_is_a_user_error() {
        let mut sum = SelfEnergySum::new(2, 2);
        sum.add(&ComplexMatrix::zeros(2, 2)).unwrap();
        assert!(!sum.is_complete());

        // singular as well, but the missing contact is reported first
        let zeros = DMatrix::zeros(2, 2);
        let err = retarded_green_function(C64::new(0.0, 0.0), &zeros, &zeros, None, &sum)
            .unwrap_err();
        assert_eq!(
            err,
            NegfError::IncompleteSelfEnergy {
                summed: 1,
                expected: 2
            }
        );
        assert!(!err.is_singular());
    }

    #[test]
    fn singular_region_is_reported() {
        let sum = SelfEnergySum::new(2, 0);
        let zeros = DMatrix::zeros(2, 2);
        let err = retarded_green_function(C64::new(0.5, 0.0), &zeros, &zeros, None, &sum)
            .unwrap_err();
        assert_eq!(err, NegfError::SingularRetarded);
        assert!(err.is_singular());
    }

    #[test]
    fn scalar_region_with_self_energy() {
        let omega = C64::new(0.5, 0.1);
        let h = DMatrix::from_element(1, 1, 0.2);
        let s = DMatrix::from_element(1, 1, 1.0);
        let mut sum = SelfEnergySum::new(1, 1);
        sum.add(&ComplexMatrix::from_element(1, 1, C64::new(0.0, -0.1)))
            .unwrap();

        let g = retarded_green_function(omega, &h, &s, None, &sum).unwrap();
        let expected = C64::new(1.0, 0.0) / C64::new(0.3, 0.2);
        assert!((g[(0, 0)] - expected).norm() < 1e-14);
        assert!(density_of_states(&g, &s).unwrap() > 0.0);
    }

    #[test]
    fn density_of_states_checks_shapes() {
        let g = ComplexMatrix::from_diagonal_element(2, 2, C64::new(0.0, -1.0));
        let dos = density_of_states(&g, &DMatrix::identity(2, 2)).unwrap();
        assert!((dos - 2.0 / PI).abs() < 1e-15);

        assert!(matches!(
            density_of_states(&g, &DMatrix::identity(1, 1)),
            Err(NegfError::DimensionMismatch { what: "overlap", .. })
        ));
        assert!(matches!(
            density_of_states(&ComplexMatrix::zeros(2, 3), &DMatrix::identity(2, 2)),
            Err(NegfError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn hartree_potential_adds_to_hamiltonian() {
        let omega = C64::new(-0.3, 0.05);
        let h = DMatrix::from_row_slice(2, 2, &[0.1, -1.0, -1.0, 0.4]);
        let s = DMatrix::from_row_slice(2, 2, &[1.0, 0.2, 0.2, 1.0]);
        let v = DMatrix::from_row_slice(2, 2, &[0.05, 0.0, 0.0, -0.05]);
        let mut sum = SelfEnergySum::new(2, 1);
        sum.add(&ComplexMatrix::from_diagonal_element(2, 2, C64::new(0.0, -0.2)))
            .unwrap();

        let with_potential = retarded_green_function(omega, &h, &s, Some(&v), &sum).unwrap();
        let folded = retarded_green_function(omega, &(&h + &v), &s, None, &sum).unwrap();
        assert!(max_abs_norm(&(with_potential - folded)) < 1e-12);
    }

    #[test]
    fn clear_resets_the_sum() {
        let mut sum = SelfEnergySum::new(2, 1);
        sum.add(&ComplexMatrix::from_element(2, 2, C64::new(1.0, -1.0)))
            .unwrap();
        assert!(sum.is_complete());

        sum.clear();
        assert_eq!(sum.summed(), 0);
        assert_eq!(sum.expected(), 1);
        assert!(max_abs_norm(sum.total()) == 0.0);

        let err = sum.add(&ComplexMatrix::zeros(3, 3)).unwrap_err();
        assert!(matches!(err, NegfError::DimensionMismatch { .. }));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let sum = SelfEnergySum::new(3, 0);
        let h = DMatrix::zeros(2, 2);
        let s = DMatrix::identity(2, 2);
        let err = retarded_green_function(C64::new(0.1, 0.1), &h, &s, None, &sum).unwrap_err();
        assert!(matches!(err, NegfError::DimensionMismatch { .. }));
    }
}

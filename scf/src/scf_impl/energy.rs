//! Energy bookkeeping.

use nalgebra::DMatrix;
use std::fmt;

/// `tr(A·B)` without forming the product.
pub fn trace_product(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    a.dot(&b.transpose())
}

/// Electronic energy split by operator contribution.
///
/// `kinetic` is part of `core` and is reported for information only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyComponents {
    pub kinetic: f64,
    pub core: f64,
    pub coulomb: f64,
    pub exchange: f64,
    pub exchange_correlation: f64,
    pub confinement: f64,
    pub spin: f64,
}

impl EnergyComponents {
    pub fn total(&self) -> f64 {
        self.core
            + self.coulomb
            + self.exchange
            + self.exchange_correlation
            + self.confinement
            + self.spin
    }
}

impl fmt::Display for EnergyComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Kinetic:               {:>18.10}", self.kinetic)?;
        writeln!(f, "  Core:                  {:>18.10}", self.core)?;
        writeln!(f, "  Coulomb:               {:>18.10}", self.coulomb)?;
        writeln!(f, "  Exchange:              {:>18.10}", self.exchange)?;
        writeln!(f, "  Exchange-correlation:  {:>18.10}", self.exchange_correlation)?;
        writeln!(f, "  Confinement:           {:>18.10}", self.confinement)?;
        writeln!(f, "  Spin correction:       {:>18.10}", self.spin)?;
        write!(f, "  Total:                 {:>18.10}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_product_matches_explicit_trace() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = DMatrix::from_row_slice(2, 2, &[0.5, -1.0, 0.25, 2.0]);
        let explicit = (&a * &b).trace();
        assert!((trace_product(&a, &b) - explicit).abs() < 1e-14);
    }

    #[test]
    fn total_skips_kinetic() {
        let energy = EnergyComponents {
            kinetic: 5.0,
            core: -3.0,
            coulomb: 1.0,
            exchange: -0.5,
            ..Default::default()
        };
        assert_eq!(energy.total(), -2.5);
        assert!(energy.to_string().contains("Total"));
    }
}

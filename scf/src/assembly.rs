//! Operator-assembly interface consumed by the SCF driver.

use crate::error::ScfError;
use crate::method::{CoulombMethod, ExchangeMethod, XcFunctional};
use nalgebra::DMatrix;

/// Exchange-correlation energy and potential for every spin channel.
#[derive(Debug, Clone)]
pub struct XcContribution {
    pub energy: f64,
    /// One potential per spin channel, in channel order.
    pub potentials: Vec<DMatrix<f64>>,
}

impl XcContribution {
    pub fn zero(dim: usize, channels: usize) -> Self {
        XcContribution {
            energy: 0.0,
            potentials: vec![DMatrix::zeros(dim, dim); channels],
        }
    }
}

/// Builds the operator contributions of one electronic system.
///
/// The driver asks the `supports_*` methods once during setup and only calls
/// the builders with selectors that passed, so implementations may treat any
/// other selector as unreachable and return [`ScfError::UnsupportedMethod`].
///
/// Density arguments are in the basis of [`OperatorAssembly::overlap`]:
/// `coulomb` receives the total density, `exchange` the density it should be
/// contracted with, and `exchange_correlation`/`spin_potential` one density
/// per spin channel.
pub trait OperatorAssembly {
    fn dimension(&self) -> usize;

    fn overlap(&self) -> &DMatrix<f64>;

    /// One-electron operator `T + V_ext`.
    fn core_hamiltonian(&self) -> &DMatrix<f64>;

    /// Kinetic part of the core Hamiltonian, reported separately when known.
    fn kinetic(&self) -> Option<&DMatrix<f64>> {
        None
    }

    fn supports_coulomb(&self, method: CoulombMethod) -> bool;

    fn supports_exchange(&self, method: ExchangeMethod) -> bool;

    fn supports_functional(&self, functional: XcFunctional) -> bool;

    fn coulomb(
        &self,
        method: CoulombMethod,
        density: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, ScfError>;

    /// Exchange integral contraction `K[P]`, returned with a positive sign.
    fn exchange(
        &self,
        method: ExchangeMethod,
        density: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, ScfError>;

    fn exchange_correlation(
        &self,
        functional: XcFunctional,
        densities: &[DMatrix<f64>],
    ) -> Result<XcContribution, ScfError> {
        match functional {
            XcFunctional::None => Ok(XcContribution::zero(self.dimension(), densities.len())),
            other => Err(ScfError::UnsupportedMethod(format!(
                "exchange-correlation functional {:?}",
                other
            ))),
        }
    }

    /// Density-independent confinement potential, if any.
    fn confinement(&self) -> Option<&DMatrix<f64>> {
        None
    }

    /// Spin-dependent potential, one matrix per channel. Only requested for
    /// unrestricted runs.
    fn spin_potential(
        &self,
        _densities: &[DMatrix<f64>],
    ) -> Result<Option<Vec<DMatrix<f64>>>, ScfError> {
        Ok(None)
    }
}

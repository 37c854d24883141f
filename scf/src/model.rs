//! Zero-differential-overlap lattice model (Hubbard / Pariser-Parr-Pople).
//!
//! Two-electron integrals reduce to a site-site interaction matrix `gamma`:
//! `(ij|kl) = δ_ij δ_kl γ_ik`. With that the Coulomb operator is diagonal,
//! `J_ii = Σ_k γ_ik P_kk`, and the exchange contraction is the elementwise
//! product `K_ij = γ_ij P_ij`.

use crate::assembly::OperatorAssembly;
use crate::error::{ensure_shape, ScfError};
use crate::method::{CoulombMethod, ExchangeMethod, XcFunctional};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct ModelSystem {
    core: DMatrix<f64>,
    overlap: DMatrix<f64>,
    gamma: DMatrix<f64>,
    kinetic: Option<DMatrix<f64>>,
    confinement: Option<DMatrix<f64>>,
}

impl ModelSystem {
    /// Non-interacting model in an orthonormal site basis.
    pub fn new(core_hamiltonian: DMatrix<f64>) -> Self {
        let n = core_hamiltonian.nrows();
        ModelSystem {
            core: core_hamiltonian,
            overlap: DMatrix::identity(n, n),
            gamma: DMatrix::zeros(n, n),
            kinetic: None,
            confinement: None,
        }
    }

    pub fn with_overlap(mut self, overlap: DMatrix<f64>) -> Self {
        self.overlap = overlap;
        self
    }

    /// Full site-site interaction matrix (PPP).
    pub fn with_interaction(mut self, gamma: DMatrix<f64>) -> Self {
        self.gamma = gamma;
        self
    }

    /// On-site repulsion `U` only (Hubbard).
    pub fn with_hubbard(mut self, u: f64) -> Self {
        let n = self.core.nrows();
        self.gamma = DMatrix::from_diagonal_element(n, n, u);
        self
    }

    pub fn with_kinetic(mut self, kinetic: DMatrix<f64>) -> Self {
        self.kinetic = Some(kinetic);
        self
    }

    pub fn with_confinement(mut self, confinement: DMatrix<f64>) -> Self {
        self.confinement = Some(confinement);
        self
    }

    pub fn interaction(&self) -> &DMatrix<f64> {
        &self.gamma
    }
}

impl OperatorAssembly for ModelSystem {
    fn dimension(&self) -> usize {
        self.core.nrows()
    }

    fn overlap(&self) -> &DMatrix<f64> {
        &self.overlap
    }

    fn core_hamiltonian(&self) -> &DMatrix<f64> {
        &self.core
    }

    fn kinetic(&self) -> Option<&DMatrix<f64>> {
        self.kinetic.as_ref()
    }

    fn confinement(&self) -> Option<&DMatrix<f64>> {
        self.confinement.as_ref()
    }

    fn supports_coulomb(&self, method: CoulombMethod) -> bool {
        method == CoulombMethod::Analytic
    }

    fn supports_exchange(&self, method: ExchangeMethod) -> bool {
        matches!(method, ExchangeMethod::None | ExchangeMethod::Analytic)
    }

    fn supports_functional(&self, functional: XcFunctional) -> bool {
        functional == XcFunctional::None
    }

    fn coulomb(
        &self,
        method: CoulombMethod,
        density: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, ScfError> {
        if method != CoulombMethod::Analytic {
            return Err(ScfError::UnsupportedMethod(format!(
                "Coulomb method {:?} for a lattice model",
                method
            )));
        }
        let n = self.dimension();
        ensure_shape("interaction matrix", &self.gamma, (n, n))?;
        ensure_shape("density matrix", density, (n, n))?;
        let hartree: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| (0..n).map(|k| self.gamma[(i, k)] * density[(k, k)]).sum::<f64>())
            .collect();
        Ok(DMatrix::from_diagonal(&DVector::from_vec(hartree)))
    }

    fn exchange(
        &self,
        method: ExchangeMethod,
        density: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, ScfError> {
        let n = self.dimension();
        match method {
            ExchangeMethod::Analytic => {
                ensure_shape("interaction matrix", &self.gamma, (n, n))?;
                ensure_shape("density matrix", density, (n, n))?;
                Ok(self.gamma.component_mul(density))
            }
            ExchangeMethod::None => Ok(DMatrix::zeros(n, n)),
            other => Err(ScfError::UnsupportedMethod(format!(
                "exchange method {:?} for a lattice model",
                other
            ))),
        }
    }
}

//! Contact self-energies and broadening matrices.

use crate::error::NegfError;
use crate::linalg::{ensure_complex_shape, ensure_shape, shifted_block, ComplexMatrix, C64};
use crate::sancho::{Lead, SanchoParams, SanchoWorkspace};
use nalgebra::DMatrix;
use tracing::trace;

/// Self-energy of one contact at `omega`.
///
/// Computes `Σ = τ g τ†` with `τ = ω S_SC0 - H_SC0`, the coupling between the
/// scattering region (rows) and the contact surface layer (columns). When
/// `transp` is set the blocks are given in the contact-to-scattering
/// orientation and are transposed first.
///
/// `g_surf` must already be evaluated at the shifted energy `ω - v_C`; only
/// the coupling blocks see the unshifted `omega`.
pub fn contact_self_energy(
    omega: C64,
    g_surf: &ComplexMatrix,
    h_sc0: &DMatrix<f64>,
    s_sc0: &DMatrix<f64>,
    transp: bool,
) -> Result<ComplexMatrix, NegfError> {
    ensure_shape("coupling overlap", s_sc0, h_sc0.shape())?;
    let tau = shifted_block(omega, s_sc0, h_sc0, transp);
    let n_contact = tau.ncols();
    ensure_complex_shape("surface Green's function", g_surf, (n_contact, n_contact))?;

    Ok(&tau * g_surf * tau.adjoint())
}

/// Broadening matrix `Γ = i(Σ - Σ†)`.
///
/// Built element by element from `Σ_ij - conj(Σ_ji)`, so `Γ` is Hermitian to
/// the last bit whatever `Σ` is. Identifying the advanced self-energy with
/// `Σ†` is only valid for real (Γ-point) Hamiltonians; k-point sampled
/// blocks need the advanced self-energy computed separately.
pub fn broadening_matrix(sigma: &ComplexMatrix) -> Result<ComplexMatrix, NegfError> {
    let n = sigma.nrows();
    ensure_complex_shape("self-energy", sigma, (n, n))?;

    Ok(ComplexMatrix::from_fn(n, n, |i, j| {
        let d = sigma[(i, j)] - sigma[(j, i)].conj();
        C64::new(-d.im, d.re)
    }))
}

/// A semi-infinite lead attached to the scattering region.
#[derive(Debug, Clone)]
pub struct Contact {
    pub lead: Lead,
    /// Scattering-to-contact coupling `H_SC0` (`n_s x n_c`, or `n_c x n_s`
    /// when `transp_coupling` is set).
    pub coupling_h: DMatrix<f64>,
    pub coupling_s: DMatrix<f64>,
    pub transp_coupling: bool,
    /// Use the reverse lead coupling direction in the surface recursion.
    pub transp_lead: bool,
    /// Local electrostatic potential `v_C` of the contact.
    pub potential: f64,
}

impl Contact {
    pub fn new(
        lead: Lead,
        coupling_h: DMatrix<f64>,
        coupling_s: DMatrix<f64>,
        transp_coupling: bool,
    ) -> Result<Self, NegfError> {
        ensure_shape("coupling overlap", &coupling_s, coupling_h.shape())?;
        let n_contact = if transp_coupling {
            coupling_h.nrows()
        } else {
            coupling_h.ncols()
        };
        if n_contact != lead.dim() {
            return Err(NegfError::DimensionMismatch {
                what: "contact coupling",
                expected: (lead.dim(), lead.dim()),
                found: (n_contact, n_contact),
            });
        }
        Ok(Contact {
            lead,
            coupling_h,
            coupling_s,
            transp_coupling,
            transp_lead: false,
            potential: 0.0,
        })
    }

    pub fn with_potential(mut self, potential: f64) -> Self {
        self.potential = potential;
        self
    }

    pub fn with_reversed_lead(mut self, transp_lead: bool) -> Self {
        self.transp_lead = transp_lead;
        self
    }

    /// Size of the scattering region this contact couples to.
    pub fn scattering_dim(&self) -> usize {
        if self.transp_coupling {
            self.coupling_h.ncols()
        } else {
            self.coupling_h.nrows()
        }
    }

    /// Self-energy at `omega`, evaluating the lead at `omega - v_C`.
    pub fn self_energy(
        &self,
        omega: C64,
        workspace: &mut SanchoWorkspace,
        params: &SanchoParams,
    ) -> Result<ComplexMatrix, NegfError> {
        let shifted = omega - self.potential;
        let surface =
            workspace.surface_green_function(shifted, &self.lead, self.transp_lead, params)?;
        trace!(
            iterations = surface.iterations,
            potential = self.potential,
            "contact surface Green's function"
        );
        contact_self_energy(
            omega,
            &surface.g_surf,
            &self.coupling_h,
            &self.coupling_s,
            self.transp_coupling,
        )
    }
}

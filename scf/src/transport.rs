//! Spectral scans of a converged scattering region attached to leads.
//!
//! For every energy `E` the contacts' self-energies are evaluated at
//! `ω = E + iη`, summed and folded into the retarded Green's function of the
//! region, from which the density of states follows.

use crate::error::{ensure_shape, ScfError};
use nalgebra::DMatrix;
use negf::{
    broadening_matrix, density_of_states, retarded_green_function, Contact, SanchoParams,
    SanchoWorkspace, SelfEnergySum, C64,
};
use rayon::prelude::*;
use tracing::{debug, info};

/// Observables at one real energy.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralPoint {
    pub energy: f64,
    pub density_of_states: f64,
    /// `tr Γ` of each contact, in contact order.
    pub broadening: Vec<f64>,
}

/// Scans `energies` for the region `(hamiltonian, overlap)`.
///
/// Energy points run in parallel; each rayon worker keeps one recursion
/// workspace per contact. The first failing point aborts the scan.
pub fn spectral_scan(
    hamiltonian: &DMatrix<f64>,
    overlap: &DMatrix<f64>,
    contacts: &[Contact],
    energies: &[f64],
    eta: f64,
    params: &SanchoParams,
) -> Result<Vec<SpectralPoint>, ScfError> {
    let n = hamiltonian.nrows();
    ensure_shape("scattering Hamiltonian", hamiltonian, (n, n))?;
    ensure_shape("scattering overlap", overlap, (n, n))?;
    if !(eta.is_finite() && eta > 0.0) {
        return Err(ScfError::InvalidConfig(format!(
            "broadening eta must be positive, got {}",
            eta
        )));
    }
    if let Some(contact) = contacts.iter().find(|c| c.scattering_dim() != n) {
        return Err(ScfError::DimensionMismatch {
            what: "contact coupling",
            expected: (n, contact.lead.dim()),
            found: (contact.scattering_dim(), contact.lead.dim()),
        });
    }

    info!(
        "Scanning {} energy points with {} contacts (eta = {:.1e})",
        energies.len(),
        contacts.len(),
        eta
    );

    energies
        .par_iter()
        .map_init(
            || {
                contacts
                    .iter()
                    .map(|c| SanchoWorkspace::new(c.lead.dim()))
                    .collect::<Vec<_>>()
            },
            |workspaces, &energy| {
                spectral_point(hamiltonian, overlap, contacts, workspaces, energy, eta, params)
            },
        )
        .collect()
}

fn spectral_point(
    hamiltonian: &DMatrix<f64>,
    overlap: &DMatrix<f64>,
    contacts: &[Contact],
    workspaces: &mut [SanchoWorkspace],
    energy: f64,
    eta: f64,
    params: &SanchoParams,
) -> Result<SpectralPoint, ScfError> {
    let omega = C64::new(energy, eta);
    let mut sigma = SelfEnergySum::new(hamiltonian.nrows(), contacts.len());
    let mut broadening = Vec::with_capacity(contacts.len());

    for (contact, workspace) in contacts.iter().zip(workspaces.iter_mut()) {
        let self_energy = contact.self_energy(omega, workspace, params)?;
        broadening.push(broadening_matrix(&self_energy)?.trace().re);
        sigma.add(&self_energy)?;
    }

    let g = retarded_green_function(omega, hamiltonian, overlap, None, &sigma)?;
    let dos = density_of_states(&g, overlap)?;
    debug!(energy, dos, "spectral point");

    Ok(SpectralPoint {
        energy,
        density_of_states: dos,
        broadening,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use negf::Lead;
    use std::f64::consts::PI;

    fn chain_contact() -> Contact {
        let lead =
            Lead::orthogonal(DMatrix::zeros(1, 1), DMatrix::from_element(1, 1, -1.0)).unwrap();
        Contact::new(
            lead,
            DMatrix::from_element(1, 1, -1.0),
            DMatrix::zeros(1, 1),
            false,
        )
        .unwrap()
    }

    #[test]
    fn site_between_chains_has_bulk_dos() {
        let h = DMatrix::zeros(1, 1);
        let s = DMatrix::identity(1, 1);
        let contacts = vec![chain_contact(), chain_contact()];
        let energies = [-1.0, 0.0, 0.5];
        let params = SanchoParams::new(1e-12);

        let points = spectral_scan(&h, &s, &contacts, &energies, 1e-6, &params).unwrap();
        assert_eq!(points.len(), 3);
        for point in &points {
            let e = point.energy;
            let bulk = 1.0 / (PI * (4.0 - e * e).sqrt());
            assert!((point.density_of_states - bulk).abs() < 1e-4);
            // Γ = √(4 - E²) for a unit-hopping chain
            for &gamma in &point.broadening {
                assert!((gamma - (4.0 - e * e).sqrt()).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn contact_size_must_match_region() {
        let h = DMatrix::zeros(2, 2);
        let s = DMatrix::identity(2, 2);
        let params = SanchoParams::new(1e-10);
        let err = spectral_scan(&h, &s, &[chain_contact()], &[0.0], 1e-5, &params).unwrap_err();
        assert!(matches!(err, ScfError::DimensionMismatch { .. }));
    }

    #[test]
    fn eta_must_be_positive() {
        let h = DMatrix::zeros(1, 1);
        let s = DMatrix::identity(1, 1);
        let params = SanchoParams::new(1e-10);
        for eta in [0.0, -1e-3, f64::NAN] {
            assert!(matches!(
                spectral_scan(&h, &s, &[], &[0.0], eta, &params),
                Err(ScfError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn isolated_region_gives_lorentzian() {
        let h = DMatrix::zeros(1, 1);
        let s = DMatrix::identity(1, 1);
        let params = SanchoParams::new(1e-10);
        let points = spectral_scan(&h, &s, &[], &[0.5], 1e-3, &params).unwrap();
        let lorentzian = 1e-3 / (PI * (0.25 + 1e-6));
        assert!((points[0].density_of_states - lorentzian).abs() < 1e-12);
        assert!(points[0].broadening.is_empty());
    }
}

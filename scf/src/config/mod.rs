//! Configuration management for SCF runs
//!
//! YAML input is deserialised into the structures below. Optional fields are
//! filled by `with_defaults()`; conversion helpers turn the raw rows into
//! matrices, driver settings and transport contacts.

mod args;

pub use args::Args;

use crate::error::{ensure_shape, ScfError};
use crate::method::{CoulombMethod, ExchangeMethod, MethodSelection, SpinPolarization, XcFunctional};
use crate::model::ModelSystem;
use crate::scf_impl::{Occupation, ScfSettings};
use nalgebra::DMatrix;
use negf::{Contact, Lead, SanchoParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub scf_params: ScfParams,
    pub transport: Option<TransportConfig>,
}

/// Lattice-model description of the system
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    pub core_hamiltonian: Vec<Vec<f64>>,
    pub overlap: Option<Vec<Vec<f64>>>,
    /// Full site-site interaction matrix; exclusive with `hubbard_u`.
    pub interaction: Option<Vec<Vec<f64>>>,
    pub hubbard_u: Option<f64>,
    pub electrons: usize,
    pub multiplicity: Option<usize>,
}

/// SCF-specific parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScfParams {
    pub max_cycle: Option<usize>,
    pub convergence_threshold: Option<f64>,
    pub diis_subspace_size: Option<usize>,
    pub diis_threshold: Option<f64>,
    pub damping: Option<f64>,
    pub spin_polarized: Option<bool>,
    pub coulomb: Option<CoulombMethod>,
    pub exchange: Option<ExchangeMethod>,
    pub xc: Option<XcFunctional>,
    /// Wall-clock budget in seconds.
    pub max_wall_time: Option<f64>,
    pub do_guess: Option<bool>,
}

impl Default for ScfParams {
    fn default() -> Self {
        let methods = MethodSelection::default();
        ScfParams {
            max_cycle: Some(100),
            convergence_threshold: Some(1e-6),
            diis_subspace_size: Some(8),
            diis_threshold: Some(0.1),
            damping: Some(0.0),
            spin_polarized: Some(false),
            coulomb: Some(methods.coulomb),
            exchange: Some(methods.exchange),
            xc: Some(methods.xc),
            max_wall_time: None,
            do_guess: Some(true),
        }
    }
}

impl ScfParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(self) -> Self {
        let defaults = Self::default();
        ScfParams {
            max_cycle: self.max_cycle.or(defaults.max_cycle),
            convergence_threshold: self
                .convergence_threshold
                .or(defaults.convergence_threshold),
            diis_subspace_size: self.diis_subspace_size.or(defaults.diis_subspace_size),
            diis_threshold: self.diis_threshold.or(defaults.diis_threshold),
            damping: self.damping.or(defaults.damping),
            spin_polarized: self.spin_polarized.or(defaults.spin_polarized),
            coulomb: self.coulomb.or(defaults.coulomb),
            exchange: self.exchange.or(defaults.exchange),
            xc: self.xc.or(defaults.xc),
            max_wall_time: self.max_wall_time,
            do_guess: self.do_guess.or(defaults.do_guess),
        }
    }
}

/// Energy scan of the converged scattering region
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    pub contacts: Vec<ContactConfig>,
    pub energies: EnergyGrid,
    /// Imaginary part added to every energy point.
    pub eta: Option<f64>,
    /// Convergence tolerance of the surface recursion.
    pub conv: f64,
    pub max_iterations: Option<usize>,
}

/// Evenly spaced real energies, `stop` included
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnergyGrid {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContactConfig {
    pub name: String,
    pub lead: LeadConfig,
    /// Scattering-to-contact Hamiltonian coupling, `n_s x n_c`.
    pub coupling: Vec<Vec<f64>>,
    pub coupling_overlap: Option<Vec<Vec<f64>>>,
    /// Coupling rows given contact-first (`n_c x n_s`).
    #[serde(default)]
    pub transposed: bool,
    #[serde(default)]
    pub reversed_lead: bool,
    pub potential: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeadConfig {
    pub h0: Vec<Vec<f64>>,
    pub s0: Option<Vec<Vec<f64>>>,
    pub h1: Vec<Vec<f64>>,
    pub s1: Option<Vec<Vec<f64>>>,
}

impl TransportConfig {
    pub fn with_defaults(mut self) -> Self {
        if self.eta.is_none() {
            self.eta = Some(1e-5);
        }
        if self.max_iterations.is_none() {
            self.max_iterations = Some(negf::sancho::DEFAULT_MAX_ITERATIONS);
        }
        self
    }

    pub fn eta(&self) -> f64 {
        self.eta.unwrap_or(1e-5)
    }

    pub fn sancho_params(&self) -> SanchoParams {
        let params = SanchoParams::new(self.conv);
        match self.max_iterations {
            Some(max_iterations) => params.with_max_iterations(max_iterations),
            None => params,
        }
    }

    pub fn energies(&self) -> Result<Vec<f64>, ScfError> {
        let grid = &self.energies;
        match grid.points {
            0 => Err(ScfError::InvalidConfig(
                "energy grid needs at least one point".to_string(),
            )),
            1 => Ok(vec![grid.start]),
            n => {
                let step = (grid.stop - grid.start) / (n - 1) as f64;
                Ok((0..n).map(|i| grid.start + step * i as f64).collect())
            }
        }
    }

    pub fn contacts(&self) -> Result<Vec<Contact>, ScfError> {
        self.contacts.iter().map(ContactConfig::to_contact).collect()
    }

    pub fn contact_names(&self) -> Vec<&str> {
        self.contacts.iter().map(|c| c.name.as_str()).collect()
    }
}

impl ContactConfig {
    pub fn to_contact(&self) -> Result<Contact, ScfError> {
        let h0 = matrix_from_rows("lead h0", &self.lead.h0)?;
        let n = h0.nrows();
        let h1 = matrix_from_rows("lead h1", &self.lead.h1)?;
        let s0 = optional_matrix("lead s0", self.lead.s0.as_deref(), || {
            DMatrix::identity(n, n)
        })?;
        let s1 = optional_matrix("lead s1", self.lead.s1.as_deref(), || DMatrix::zeros(n, n))?;
        let lead = Lead::new(h0, s0, h1, s1)?;

        let coupling = matrix_from_rows("contact coupling", &self.coupling)?;
        let (rows, cols) = coupling.shape();
        let coupling_s = optional_matrix(
            "contact coupling overlap",
            self.coupling_overlap.as_deref(),
            || DMatrix::zeros(rows, cols),
        )?;

        Ok(Contact::new(lead, coupling, coupling_s, self.transposed)?
            .with_reversed_lead(self.reversed_lead)
            .with_potential(self.potential.unwrap_or(0.0)))
    }
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.scf_params = self.scf_params.with_defaults();
        if let Some(transport) = self.transport.take() {
            self.transport = Some(transport.with_defaults());
        }
        self
    }

    pub fn multiplicity(&self) -> usize {
        self.system.multiplicity.unwrap_or(1)
    }

    pub fn spin(&self) -> SpinPolarization {
        if self.scf_params.spin_polarized.unwrap_or(false) || self.multiplicity() > 1 {
            SpinPolarization::Unrestricted
        } else {
            SpinPolarization::Restricted
        }
    }

    /// Model system described by the `system` section.
    pub fn to_model(&self) -> Result<ModelSystem, ScfError> {
        let system = &self.system;
        let core = matrix_from_rows("core Hamiltonian", &system.core_hamiltonian)?;
        let n = core.nrows();
        ensure_shape("core Hamiltonian", &core, (n, n))?;
        let mut model = ModelSystem::new(core);

        if let Some(rows) = &system.overlap {
            let overlap = matrix_from_rows("overlap", rows)?;
            ensure_shape("overlap", &overlap, (n, n))?;
            model = model.with_overlap(overlap);
        }
        match (&system.interaction, system.hubbard_u) {
            (Some(_), Some(_)) => {
                return Err(ScfError::InvalidConfig(
                    "give either `interaction` or `hubbard_u`, not both".to_string(),
                ))
            }
            (Some(rows), None) => {
                let gamma = matrix_from_rows("interaction", rows)?;
                ensure_shape("interaction", &gamma, (n, n))?;
                model = model.with_interaction(gamma);
            }
            (None, Some(u)) => model = model.with_hubbard(u),
            (None, None) => {}
        }
        Ok(model)
    }

    /// Driver settings from the (defaulted) `scf_params` section.
    pub fn scf_settings(&self) -> Result<ScfSettings, ScfError> {
        let params = &self.scf_params;
        let mut settings = ScfSettings::new(Occupation::Aufbau {
            electrons: self.system.electrons,
            multiplicity: self.multiplicity(),
        });

        settings.spin = self.spin();
        if let Some(max_cycle) = params.max_cycle {
            settings.max_cycle = max_cycle;
        }
        if let Some(threshold) = params.convergence_threshold {
            settings.convergence_threshold = threshold;
        }
        if let Some(size) = params.diis_subspace_size {
            settings.diis_subspace_size = size;
        }
        if let Some(threshold) = params.diis_threshold {
            settings.diis_threshold = threshold;
        }
        if let Some(damping) = params.damping {
            settings.damping = damping;
        }
        if let Some(do_guess) = params.do_guess {
            settings.do_guess = do_guess;
        }
        settings.methods = MethodSelection {
            coulomb: params.coulomb.unwrap_or(settings.methods.coulomb),
            exchange: params.exchange.unwrap_or(settings.methods.exchange),
            xc: params.xc.unwrap_or(settings.methods.xc),
        };
        if let Some(seconds) = params.max_wall_time {
            let budget = Duration::try_from_secs_f64(seconds).map_err(|_| {
                ScfError::InvalidConfig(format!("invalid wall-time budget: {} s", seconds))
            })?;
            settings.max_wall_time = Some(budget);
        }
        Ok(settings)
    }
}

/// Dense matrix from row-major YAML rows; rows must be non-empty and equally long.
pub fn matrix_from_rows(what: &str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>, ScfError> {
    let ncols = rows.first().map_or(0, Vec::len);
    if ncols == 0 {
        return Err(ScfError::InvalidConfig(format!("{} is empty", what)));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != ncols) {
        return Err(ScfError::InvalidConfig(format!(
            "{}: row {} has {} entries, expected {}",
            what,
            bad,
            rows[bad].len(),
            ncols
        )));
    }
    Ok(DMatrix::from_row_iterator(
        rows.len(),
        ncols,
        rows.iter().flatten().copied(),
    ))
}

fn optional_matrix(
    what: &str,
    rows: Option<&[Vec<f64>]>,
    default: impl FnOnce() -> DMatrix<f64>,
) -> Result<DMatrix<f64>, ScfError> {
    match rows {
        Some(rows) => matrix_from_rows(what, rows),
        None => Ok(default()),
    }
}

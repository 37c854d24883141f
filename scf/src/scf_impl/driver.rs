//! The SCF driver loop.
//!
//! Restricted and unrestricted runs share one loop; they differ only in the
//! number of spin channels and in how the exchange operator is contracted.

use super::diis::History;
use super::energy::{trace_product, EnergyComponents};
use super::occupation::{Occupation, OrbitalSet};
use super::{diagonalize, error_matrix, orthogonalizer};
use crate::assembly::OperatorAssembly;
use crate::error::{ensure_shape, ScfError};
use crate::method::{ExchangeMethod, MethodSelection, SpinPolarization, XcFunctional};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Run parameters, validated once by [`ScfDriver::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScfSettings {
    /// Start from the core-Hamiltonian eigenvectors. When false the caller
    /// must provide densities through [`ScfDriver::with_initial_density`].
    pub do_guess: bool,
    pub max_cycle: usize,
    /// Converged once the commutator residual drops below this.
    pub convergence_threshold: f64,
    pub spin: SpinPolarization,
    pub occupation: Occupation,
    pub methods: MethodSelection,
    /// Snapshots kept per spin channel; 0 disables extrapolation.
    pub diis_subspace_size: usize,
    /// Above this residual the history damps instead of extrapolating.
    pub diis_threshold: f64,
    /// Weight of the previous operator in damping mode; 0 disables damping.
    pub damping: f64,
    pub max_wall_time: Option<Duration>,
}

impl ScfSettings {
    pub fn new(occupation: Occupation) -> Self {
        ScfSettings {
            do_guess: true,
            max_cycle: 100,
            convergence_threshold: 1e-6,
            spin: SpinPolarization::Restricted,
            occupation,
            methods: MethodSelection::default(),
            diis_subspace_size: 8,
            diis_threshold: 0.1,
            damping: 0.0,
            max_wall_time: None,
        }
    }

    fn validate(&self) -> Result<(), ScfError> {
        if self.max_cycle == 0 {
            return Err(ScfError::InvalidConfig(
                "max_cycle must be at least 1".to_string(),
            ));
        }
        if !(self.convergence_threshold.is_finite() && self.convergence_threshold > 0.0) {
            return Err(ScfError::InvalidConfig(format!(
                "convergence threshold must be positive, got {}",
                self.convergence_threshold
            )));
        }
        if self.diis_threshold.is_nan() || self.diis_threshold < 0.0 {
            return Err(ScfError::InvalidConfig(format!(
                "DIIS threshold must be non-negative, got {}",
                self.diis_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.damping) {
            return Err(ScfError::InvalidConfig(format!(
                "damping must lie in [0, 1), got {}",
                self.damping
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScfStatus {
    Converged,
    /// `max_cycle` iterations ran without reaching the threshold.
    NotConverged,
    /// The wall-clock budget ran out between two iterations.
    TimeBudgetExceeded,
}

/// Final state of an SCF run. Densities and operators are the last
/// self-consistency pair that was tested, one per spin channel.
#[derive(Debug, Clone)]
pub struct ScfOutcome {
    pub status: ScfStatus,
    pub iterations: usize,
    pub residual: f64,
    pub energy: EnergyComponents,
    pub densities: Vec<DMatrix<f64>>,
    pub operators: Vec<DMatrix<f64>>,
    /// Orbitals the final densities were built from; `None` when the run
    /// started from a supplied density and stopped in its first iteration.
    pub orbitals: Option<Vec<OrbitalSet>>,
}

impl ScfOutcome {
    pub fn converged(&self) -> bool {
        self.status == ScfStatus::Converged
    }

    pub fn total_density(&self) -> DMatrix<f64> {
        total_density(&self.densities)
    }
}

fn total_density(densities: &[DMatrix<f64>]) -> DMatrix<f64> {
    let mut total = densities[0].clone();
    for d in &densities[1..] {
        total += d;
    }
    total
}

/// SCF solver bound to one operator assembly.
pub struct ScfDriver<'a, A: OperatorAssembly + ?Sized> {
    assembly: &'a A,
    settings: ScfSettings,
    orthogonalizer: DMatrix<f64>,
    occupations: Vec<DVector<f64>>,
    initial_density: Option<Vec<DMatrix<f64>>>,
}

impl<'a, A: OperatorAssembly + ?Sized> ScfDriver<'a, A> {
    /// Validates settings, method support and matrix shapes. Nothing is
    /// iterated here, so every configuration error surfaces before the loop.
    pub fn new(assembly: &'a A, settings: ScfSettings) -> Result<Self, ScfError> {
        settings.validate()?;
        let methods = settings.methods;
        methods.validate()?;

        if !assembly.supports_coulomb(methods.coulomb) {
            return Err(ScfError::UnsupportedMethod(format!(
                "Coulomb method {:?}",
                methods.coulomb
            )));
        }
        if methods.exchange != ExchangeMethod::None && !assembly.supports_exchange(methods.exchange)
        {
            return Err(ScfError::UnsupportedMethod(format!(
                "exchange method {:?}",
                methods.exchange
            )));
        }
        if methods.xc != XcFunctional::None && !assembly.supports_functional(methods.xc) {
            return Err(ScfError::UnsupportedMethod(format!(
                "exchange-correlation functional {:?}",
                methods.xc
            )));
        }

        let n = assembly.dimension();
        ensure_shape("overlap", assembly.overlap(), (n, n))?;
        ensure_shape("core Hamiltonian", assembly.core_hamiltonian(), (n, n))?;
        if let Some(kinetic) = assembly.kinetic() {
            ensure_shape("kinetic operator", kinetic, (n, n))?;
        }
        if let Some(confinement) = assembly.confinement() {
            ensure_shape("confinement potential", confinement, (n, n))?;
        }

        let orthogonalizer = orthogonalizer(assembly.overlap())?;
        let occupations = settings
            .occupation
            .channel_occupations(settings.spin, orthogonalizer.ncols())?;

        Ok(ScfDriver {
            assembly,
            settings,
            orthogonalizer,
            occupations,
            initial_density: None,
        })
    }

    /// Starting densities, one per spin channel. Only used when
    /// `do_guess` is false.
    pub fn with_initial_density(mut self, densities: Vec<DMatrix<f64>>) -> Result<Self, ScfError> {
        let channels = self.settings.spin.channels();
        if densities.len() != channels {
            return Err(ScfError::InvalidConfig(format!(
                "{} initial densities given for {} spin channels",
                densities.len(),
                channels
            )));
        }
        let n = self.assembly.dimension();
        for density in &densities {
            ensure_shape("initial density", density, (n, n))?;
        }
        self.initial_density = Some(densities);
        Ok(self)
    }

    pub fn settings(&self) -> &ScfSettings {
        &self.settings
    }

    pub fn run(&self) -> Result<ScfOutcome, ScfError> {
        self.iterate(&mut |_, _, _| {})
    }

    /// Like [`ScfDriver::run`], calling `reporter(iteration, residual, energy)`
    /// once per iteration.
    pub fn run_with_reporter(
        &self,
        reporter: &mut dyn FnMut(usize, f64, f64),
    ) -> Result<ScfOutcome, ScfError> {
        self.iterate(reporter)
    }

    fn iterate(&self, reporter: &mut dyn FnMut(usize, f64, f64)) -> Result<ScfOutcome, ScfError> {
        let start = Instant::now();
        let settings = &self.settings;
        let channels = settings.spin.channels();
        let overlap = self.assembly.overlap();
        let core = self.assembly.core_hamiltonian();

        let (mut densities, mut orbitals) = if settings.do_guess {
            let guess = self.solve(&vec![core.clone(); channels]);
            let densities: Vec<DMatrix<f64>> = guess.iter().map(OrbitalSet::density).collect();
            (densities, Some(guess))
        } else {
            match &self.initial_density {
                Some(densities) => (densities.clone(), None),
                None => return Err(ScfError::MissingInitialDensity),
            }
        };

        let mut histories: Vec<History> = if settings.diis_subspace_size > 0 {
            (0..channels)
                .map(|_| {
                    History::new(settings.diis_subspace_size, core.clone())
                        .with_mixing(settings.diis_threshold, settings.damping)
                })
                .collect()
        } else {
            Vec::new()
        };

        info!(
            "Starting SCF: {:?}, {} basis functions, {}",
            settings.spin,
            self.assembly.dimension(),
            settings.methods
        );

        let mut iteration = 0;
        loop {
            iteration += 1;
            let (operators, energy) = self.assemble(&densities)?;
            let errors: Vec<DMatrix<f64>> = operators
                .iter()
                .zip(&densities)
                .map(|(f, d)| error_matrix(f, d, overlap))
                .collect();
            let channel_residuals: Vec<f64> = errors.iter().map(|e| e.amax()).collect();
            let residual = channel_residuals.iter().copied().fold(0.0, f64::max);
            let total_energy = energy.total();

            reporter(iteration, residual, total_energy);
            info!(
                "Cycle {}: E = {:.12} au, residual = {:.3e}",
                iteration, total_energy, residual
            );

            let status = if residual < settings.convergence_threshold {
                Some(ScfStatus::Converged)
            } else if iteration >= settings.max_cycle {
                Some(ScfStatus::NotConverged)
            } else if settings
                .max_wall_time
                .is_some_and(|limit| start.elapsed() >= limit)
            {
                Some(ScfStatus::TimeBudgetExceeded)
            } else {
                None
            };

            if let Some(status) = status {
                match status {
                    ScfStatus::Converged => {
                        info!("SCF converged in {} cycles.", iteration);
                        info!("Final energy: {:.12} au", total_energy);
                    }
                    ScfStatus::NotConverged => warn!(
                        "SCF not converged after {} cycles (residual {:.3e})",
                        iteration, residual
                    ),
                    ScfStatus::TimeBudgetExceeded => warn!(
                        "SCF stopped after {} cycles: wall-time budget exhausted",
                        iteration
                    ),
                }
                return Ok(ScfOutcome {
                    status,
                    iterations: iteration,
                    residual,
                    energy,
                    densities,
                    operators,
                    orbitals,
                });
            }

            let mut next_operators = Vec::with_capacity(channels);
            for (channel, (operator, error)) in operators.iter().zip(errors).enumerate() {
                match histories.get_mut(channel) {
                    Some(history) => {
                        history.update(
                            densities[channel].clone(),
                            operator.clone(),
                            error,
                            total_energy,
                            channel_residuals[channel],
                        );
                        next_operators.push(history.extrapolate(operator));
                    }
                    None => next_operators.push(operator.clone()),
                }
            }

            let next_orbitals = self.solve(&next_operators);
            densities = next_orbitals.iter().map(OrbitalSet::density).collect();
            orbitals = Some(next_orbitals);
        }
    }

    /// Diagonalises each channel's operator and attaches its occupations.
    fn solve(&self, operators: &[DMatrix<f64>]) -> Vec<OrbitalSet> {
        let x = &self.orthogonalizer;
        operators
            .par_iter()
            .zip(self.occupations.par_iter())
            .map(|(operator, occupations)| {
                let (energies, coefficients) = diagonalize(operator, x);
                OrbitalSet {
                    energies,
                    coefficients,
                    occupations: occupations.clone(),
                }
            })
            .collect()
    }

    /// Builds the effective operator of every channel and the energy of
    /// `densities`.
    fn assemble(
        &self,
        densities: &[DMatrix<f64>],
    ) -> Result<(Vec<DMatrix<f64>>, EnergyComponents), ScfError> {
        let assembly = self.assembly;
        let methods = self.settings.methods;
        let spin = self.settings.spin;
        let channels = spin.channels();
        let n = assembly.dimension();
        let total = total_density(densities);

        let mut energy = EnergyComponents::default();
        let core = assembly.core_hamiltonian();
        energy.core = trace_product(core, &total);
        if let Some(kinetic) = assembly.kinetic() {
            energy.kinetic = trace_product(kinetic, &total);
        }

        let coulomb = assembly.coulomb(methods.coulomb, &total)?;
        ensure_shape("Coulomb operator", &coulomb, (n, n))?;
        energy.coulomb = 0.5 * trace_product(&coulomb, &total);

        let mut shared = core + &coulomb;
        if let Some(confinement) = assembly.confinement() {
            energy.confinement = trace_product(confinement, &total);
            shared += confinement;
        }

        let alpha = methods.exchange_fraction();
        let exchange: Option<Vec<DMatrix<f64>>> = match (methods.exchange, spin) {
            (ExchangeMethod::None, _) => None,
            (method, SpinPolarization::Restricted) => {
                let k = assembly.exchange(method, &total)?;
                Some(vec![k * (-0.5 * alpha)])
            }
            (method, SpinPolarization::Unrestricted) => Some(
                densities
                    .iter()
                    .map(|d| assembly.exchange(method, d).map(|k| k * -alpha))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        if let Some(exchange) = &exchange {
            for x in exchange {
                ensure_shape("exchange operator", x, (n, n))?;
            }
            energy.exchange = 0.5
                * exchange
                    .iter()
                    .zip(densities)
                    .map(|(x, d)| trace_product(x, d))
                    .sum::<f64>();
        }

        let xc = assembly.exchange_correlation(methods.xc, densities)?;
        if xc.potentials.len() != channels {
            return Err(ScfError::Assembly(format!(
                "exchange-correlation returned {} potentials for {} spin channels",
                xc.potentials.len(),
                channels
            )));
        }
        for v in &xc.potentials {
            ensure_shape("exchange-correlation potential", v, (n, n))?;
        }
        energy.exchange_correlation = xc.energy;

        let spin_potential = match spin {
            SpinPolarization::Restricted => None,
            SpinPolarization::Unrestricted => assembly.spin_potential(densities)?,
        };
        if let Some(potentials) = &spin_potential {
            if potentials.len() != channels {
                return Err(ScfError::Assembly(format!(
                    "spin potential returned {} matrices for {} spin channels",
                    potentials.len(),
                    channels
                )));
            }
            for v in potentials {
                ensure_shape("spin potential", v, (n, n))?;
            }
            energy.spin = potentials
                .iter()
                .zip(densities)
                .map(|(v, d)| trace_product(v, d))
                .sum();
        }

        let operators = (0..channels)
            .map(|channel| {
                let mut operator = &shared + &xc.potentials[channel];
                if let Some(exchange) = &exchange {
                    operator += &exchange[channel];
                }
                if let Some(potentials) = &spin_potential {
                    operator += &potentials[channel];
                }
                operator
            })
            .collect();

        debug!(?energy, "assembled operators");
        Ok((operators, energy))
    }
}

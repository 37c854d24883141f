//! Self-consistent field solver with DIIS extrapolation.
//!
//! The driver in [`scf_impl`] iterates any [`OperatorAssembly`] to
//! self-consistency. [`ModelSystem`] is the built-in lattice assembly, and
//! [`transport`] attaches leads to a converged operator through the `negf`
//! crate.

pub mod assembly;
pub mod config;
pub mod error;
pub mod method;
pub mod model;
pub mod scf_impl;
pub mod session;
pub mod transport;

pub use assembly::{OperatorAssembly, XcContribution};
pub use error::ScfError;
pub use method::{CoulombMethod, ExchangeMethod, MethodSelection, SpinPolarization, XcFunctional};
pub use model::ModelSystem;
pub use scf_impl::{
    EnergyComponents, History, Occupation, OrbitalSet, ScfDriver, ScfOutcome, ScfSettings,
    ScfStatus,
};
pub use session::Session;
pub use transport::{spectral_scan, SpectralPoint};

//! Green's-function building blocks for open-boundary (NEGF) calculations.
//!
//! The crate covers the numerical core that sits between a converged
//! Hamiltonian and any transport post-processing:
//!
//! - [`sancho`]: Lopez-Sancho decimation for the retarded surface Green's
//!   function of a semi-infinite periodic lead
//! - [`contact`]: contact self-energies and broadening matrices built from a
//!   converged surface Green's function
//! - [`retarded`]: the retarded Green's function of a finite scattering region
//!
//! All blocks are real (`DMatrix<f64>`), energies and Green's functions are
//! complex (`DMatrix<Complex<f64>>`).

pub mod contact;
pub mod error;
pub mod linalg;
pub mod retarded;
pub mod sancho;

pub use contact::{broadening_matrix, contact_self_energy, Contact};
pub use error::NegfError;
pub use linalg::{ComplexMatrix, C64};
pub use retarded::{density_of_states, retarded_green_function, SelfEnergySum};
pub use sancho::{scan, Lead, SanchoParams, SanchoWorkspace, SurfaceGreenFunction};

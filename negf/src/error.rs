//! Typed errors for the Green's-function routines.

use thiserror::Error;

/// Failure modes of the surface recursion and the Green's-function assembly.
///
/// Singular-matrix variants point at the input (energy point or blocks),
/// [`NegfError::NotConverged`] points at the iteration budget.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NegfError {
    #[error("convergence tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),

    #[error("{what}: expected a {expected:?} matrix, got {found:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// The on-site block `a` could not be inverted inside the decimation loop.
    #[error("singular on-site block during decimation step {iteration}")]
    SingularRecursion { iteration: usize },

    #[error(
        "surface Green's function not converged after {iterations} iterations \
         (coupling norm {residual:.3e})"
    )]
    NotConverged { iterations: usize, residual: f64 },

    /// The renormalised surface block `a0` is singular, so `g_surf` does not exist.
    #[error("renormalised surface block is singular")]
    SingularSurface,

    #[error("only {summed} of {expected} contact self-energies have been summed")]
    IncompleteSelfEnergy { summed: usize, expected: usize },

    #[error("inverse retarded Green's function of the scattering region is singular")]
    SingularRetarded,
}

impl NegfError {
    /// True for the variants caused by a singular matrix.
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            NegfError::SingularRecursion { .. }
                | NegfError::SingularSurface
                | NegfError::SingularRetarded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_variants_are_flagged() {
        assert!(NegfError::SingularSurface.is_singular());
        assert!(NegfError::SingularRecursion { iteration: 3 }.is_singular());
        assert!(NegfError::SingularRetarded.is_singular());
        assert!(!NegfError::NotConverged {
            iterations: 10,
            residual: 1.0
        }
        .is_singular());
        assert!(!NegfError::IncompleteSelfEnergy {
            summed: 1,
            expected: 2
        }
        .is_singular());
    }

    #[test]
    fn display_not_converged() {
        let err = NegfError::NotConverged {
            iterations: 5,
            residual: 0.5,
        };
        assert_eq!(
            err.to_string(),
            "surface Green's function not converged after 5 iterations (coupling norm 5.000e-1)"
        );
    }
}

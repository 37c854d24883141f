//! Error type shared by the SCF driver, the operator assembly and the
//! configuration layer.

use thiserror::Error;

/// Setup and assembly failures.
///
/// Everything here is raised before the iteration starts, except
/// [`ScfError::Assembly`] which an operator callback may return mid-loop.
/// Non-convergence is not an error; see [`crate::ScfStatus`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScfError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unrecognised {kind} selector {value}")]
    InvalidSelector { kind: &'static str, value: i32 },

    #[error("unsupported method combination: {0}")]
    UnsupportedCombination(String),

    #[error("operator assembly does not provide {0}")]
    UnsupportedMethod(String),

    #[error("{what}: expected a {expected:?} matrix, got {found:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("initial guess disabled but no starting density was supplied")]
    MissingInitialDensity,

    #[error("operator assembly failed: {0}")]
    Assembly(String),

    #[error(transparent)]
    Transport(#[from] negf::NegfError),
}

pub(crate) fn ensure_shape(
    what: &'static str,
    m: &nalgebra::DMatrix<f64>,
    expected: (usize, usize),
) -> Result<(), ScfError> {
    if m.shape() != expected {
        return Err(ScfError::DimensionMismatch {
            what,
            expected,
            found: m.shape(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ScfError::InvalidSelector {
            kind: "coulomb",
            value: 7,
        };
        assert_eq!(err.to_string(), "unrecognised coulomb selector 7");

        let err = ScfError::DimensionMismatch {
            what: "overlap",
            expected: (2, 2),
            found: (3, 3),
        };
        assert_eq!(err.to_string(), "overlap: expected a (2, 2) matrix, got (3, 3)");
    }

    #[test]
    fn transport_errors_convert() {
        let err: ScfError = negf::NegfError::SingularSurface.into();
        assert_eq!(err.to_string(), "renormalised surface block is singular");
    }
}

//! Method selectors for the operator assembly.
//!
//! Each selector is a closed enum. Integer enumerators from legacy input decks
//! are converted with `TryFrom<i32>`; YAML uses the snake_case names.

use crate::error::ScfError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the Coulomb (Hartree) operator is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoulombMethod {
    /// Contraction with analytic two-electron integrals.
    Analytic,
    /// Numeric potential on a radial grid, analytic matrix elements.
    SemiAnalytic,
    /// Potential and matrix elements on a full numeric grid.
    NumericGrid,
}

impl TryFrom<i32> for CoulombMethod {
    type Error = ScfError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CoulombMethod::Analytic),
            2 => Ok(CoulombMethod::SemiAnalytic),
            3 => Ok(CoulombMethod::NumericGrid),
            _ => Err(ScfError::InvalidSelector {
                kind: "coulomb",
                value,
            }),
        }
    }
}

/// How the exact-exchange operator is built, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeMethod {
    None,
    Analytic,
    SemiAnalytic,
    NumericGrid,
}

impl TryFrom<i32> for ExchangeMethod {
    type Error = ScfError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ExchangeMethod::None),
            1 => Ok(ExchangeMethod::Analytic),
            2 => Ok(ExchangeMethod::SemiAnalytic),
            3 => Ok(ExchangeMethod::NumericGrid),
            _ => Err(ScfError::InvalidSelector {
                kind: "exchange",
                value,
            }),
        }
    }
}

/// Exchange-correlation functional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XcFunctional {
    None,
    Lda,
    Pbe,
    /// PBE hybrid with 25% exact exchange.
    Pbe0,
}

impl XcFunctional {
    /// Weight of the exact-exchange operator when this functional is active.
    pub fn exact_exchange_fraction(&self) -> f64 {
        match self {
            XcFunctional::None => 1.0,
            XcFunctional::Lda | XcFunctional::Pbe => 0.0,
            XcFunctional::Pbe0 => 0.25,
        }
    }

    pub fn is_hybrid(&self) -> bool {
        matches!(self, XcFunctional::Pbe0)
    }
}

impl TryFrom<i32> for XcFunctional {
    type Error = ScfError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(XcFunctional::None),
            1 => Ok(XcFunctional::Lda),
            2 => Ok(XcFunctional::Pbe),
            3 => Ok(XcFunctional::Pbe0),
            _ => Err(ScfError::InvalidSelector { kind: "xc", value }),
        }
    }
}

/// Number of independent spin channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinPolarization {
    Restricted,
    Unrestricted,
}

impl SpinPolarization {
    pub fn channels(&self) -> usize {
        match self {
            SpinPolarization::Restricted => 1,
            SpinPolarization::Unrestricted => 2,
        }
    }
}

impl TryFrom<i32> for SpinPolarization {
    type Error = ScfError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SpinPolarization::Restricted),
            2 => Ok(SpinPolarization::Unrestricted),
            _ => Err(ScfError::InvalidSelector { kind: "spin", value }),
        }
    }
}

/// The full method choice for one SCF run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSelection {
    pub coulomb: CoulombMethod,
    pub exchange: ExchangeMethod,
    pub xc: XcFunctional,
}

impl Default for MethodSelection {
    /// Hartree-Fock with analytic integrals.
    fn default() -> Self {
        MethodSelection {
            coulomb: CoulombMethod::Analytic,
            exchange: ExchangeMethod::Analytic,
            xc: XcFunctional::None,
        }
    }
}

impl MethodSelection {
    /// Rejects combinations that cannot describe a single energy expression.
    pub fn validate(&self) -> Result<(), ScfError> {
        match (self.exchange, self.xc) {
            (ExchangeMethod::None, XcFunctional::Pbe0) => Err(ScfError::UnsupportedCombination(
                "hybrid functional PBE0 requires an exact-exchange method".to_string(),
            )),
            (ExchangeMethod::None, _) => Ok(()),
            (exchange, xc @ (XcFunctional::Lda | XcFunctional::Pbe)) => {
                Err(ScfError::UnsupportedCombination(format!(
                    "exact exchange ({:?}) cannot be combined with the pure functional {:?}",
                    exchange, xc
                )))
            }
            (_, XcFunctional::None | XcFunctional::Pbe0) => Ok(()),
        }
    }

    /// Prefactor α of the exact-exchange operator.
    pub fn exchange_fraction(&self) -> f64 {
        match self.exchange {
            ExchangeMethod::None => 0.0,
            _ => self.xc.exact_exchange_fraction(),
        }
    }
}

impl fmt::Display for MethodSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "coulomb={:?}, exchange={:?}, xc={:?}",
            self.coulomb, self.exchange, self.xc
        )
    }
}

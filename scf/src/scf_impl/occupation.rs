//! Orbital occupations and density-matrix construction.

use crate::error::ScfError;
use crate::method::SpinPolarization;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// How electrons are distributed over the orbitals of each spin channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupation {
    /// Lowest orbitals first. Restricted runs place two electrons per orbital
    /// (the last one may be singly occupied); unrestricted runs split the
    /// electrons by multiplicity, `n_α = (N + 2S) / 2`, `n_β = (N - 2S) / 2`.
    Aufbau { electrons: usize, multiplicity: usize },
    /// Explicit occupation numbers per channel, lowest orbital first.
    Fixed(Vec<Vec<f64>>),
}

impl Occupation {
    /// Occupation vector of length `orbitals` for every spin channel.
    pub fn channel_occupations(
        &self,
        spin: SpinPolarization,
        orbitals: usize,
    ) -> Result<Vec<DVector<f64>>, ScfError> {
        match self {
            Occupation::Aufbau {
                electrons,
                multiplicity,
            } => aufbau(*electrons, *multiplicity, spin, orbitals),
            Occupation::Fixed(per_channel) => fixed(per_channel, spin, orbitals),
        }
    }

    pub fn electron_count(&self) -> f64 {
        match self {
            Occupation::Aufbau { electrons, .. } => *electrons as f64,
            Occupation::Fixed(per_channel) => per_channel.iter().flatten().sum(),
        }
    }
}

fn aufbau(
    electrons: usize,
    multiplicity: usize,
    spin: SpinPolarization,
    orbitals: usize,
) -> Result<Vec<DVector<f64>>, ScfError> {
    if multiplicity == 0 {
        return Err(ScfError::InvalidConfig(
            "spin multiplicity must be at least 1".to_string(),
        ));
    }
    let unpaired = multiplicity - 1;

    match spin {
        SpinPolarization::Restricted => {
            if unpaired > 1 {
                return Err(ScfError::InvalidConfig(format!(
                    "multiplicity {} needs an unrestricted calculation",
                    multiplicity
                )));
            }
            if (electrons + unpaired) % 2 != 0 {
                return Err(ScfError::InvalidConfig(format!(
                    "multiplicity {} is impossible with {} electrons",
                    multiplicity, electrons
                )));
            }
            if electrons > 2 * orbitals {
                return Err(ScfError::InvalidConfig(format!(
                    "{} electrons do not fit into {} orbitals",
                    electrons, orbitals
                )));
            }
            let mut occ = DVector::zeros(orbitals);
            let mut remaining = electrons;
            for slot in occ.iter_mut() {
                let take = remaining.min(2);
                *slot = take as f64;
                remaining -= take;
            }
            Ok(vec![occ])
        }
        SpinPolarization::Unrestricted => {
            if unpaired > electrons || (electrons - unpaired) % 2 != 0 {
                return Err(ScfError::InvalidConfig(format!(
                    "multiplicity {} is impossible with {} electrons",
                    multiplicity, electrons
                )));
            }
            let n_alpha = (electrons + unpaired) / 2;
            let n_beta = (electrons - unpaired) / 2;
            if n_alpha > orbitals {
                return Err(ScfError::InvalidConfig(format!(
                    "{} alpha electrons do not fit into {} orbitals",
                    n_alpha, orbitals
                )));
            }
            let filled =
                |n: usize| DVector::from_fn(orbitals, |i, _| if i < n { 1.0 } else { 0.0 });
            Ok(vec![filled(n_alpha), filled(n_beta)])
        }
    }
}

fn fixed(
    per_channel: &[Vec<f64>],
    spin: SpinPolarization,
    orbitals: usize,
) -> Result<Vec<DVector<f64>>, ScfError> {
    if per_channel.len() != spin.channels() {
        return Err(ScfError::InvalidConfig(format!(
            "{} occupation vectors given for {} spin channels",
            per_channel.len(),
            spin.channels()
        )));
    }
    let max_occupation = match spin {
        SpinPolarization::Restricted => 2.0,
        SpinPolarization::Unrestricted => 1.0,
    };

    per_channel
        .iter()
        .map(|numbers| {
            if numbers.len() > orbitals {
                return Err(ScfError::InvalidConfig(format!(
                    "{} occupation numbers given for {} orbitals",
                    numbers.len(),
                    orbitals
                )));
            }
            if let Some(bad) = numbers
                .iter()
                .find(|&&n| !(0.0..=max_occupation).contains(&n))
            {
                return Err(ScfError::InvalidConfig(format!(
                    "occupation number {} outside [0, {}]",
                    bad, max_occupation
                )));
            }
            Ok(DVector::from_fn(orbitals, |i, _| {
                numbers.get(i).copied().unwrap_or(0.0)
            }))
        })
        .collect()
}

/// Eigenpairs of one spin channel, ascending in energy.
#[derive(Debug, Clone)]
pub struct OrbitalSet {
    pub energies: DVector<f64>,
    /// Eigenvectors as columns, in the original (non-orthogonal) basis.
    pub coefficients: DMatrix<f64>,
    pub occupations: DVector<f64>,
}

impl OrbitalSet {
    /// `D = Σ_k n_k c_k c_kᵀ` over occupied orbitals.
    pub fn density(&self) -> DMatrix<f64> {
        let n = self.coefficients.nrows();
        let mut density = DMatrix::zeros(n, n);
        for (k, &occ) in self.occupations.iter().enumerate() {
            if occ == 0.0 {
                continue;
            }
            let c = self.coefficients.column(k);
            density.ger(occ, &c, &c, 1.0);
        }
        density
    }

    /// Highest occupied orbital energy.
    pub fn homo(&self) -> Option<f64> {
        self.occupations
            .as_slice()
            .iter()
            .rposition(|&n| n > 0.0)
            .map(|k| self.energies[k])
    }

    /// Lowest unoccupied orbital energy.
    pub fn lumo(&self) -> Option<f64> {
        self.occupations
            .as_slice()
            .iter()
            .position(|&n| n == 0.0)
            .map(|k| self.energies[k])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_aufbau_pairs_electrons() {
        let occ = Occupation::Aufbau {
            electrons: 5,
            multiplicity: 2,
        }
        .channel_occupations(SpinPolarization::Restricted, 4)
        .unwrap();
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].as_slice(), &[2.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn unrestricted_aufbau_follows_multiplicity() {
        let occ = Occupation::Aufbau {
            electrons: 4,
            multiplicity: 3,
        }
        .channel_occupations(SpinPolarization::Unrestricted, 4)
        .unwrap();
        assert_eq!(occ[0].as_slice(), &[1.0, 1.0, 1.0, 0.0]);
        assert_eq!(occ[1].as_slice(), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn impossible_occupations_are_rejected() {
        let cases = [
            (3, 1, SpinPolarization::Unrestricted, 4),
            (2, 5, SpinPolarization::Unrestricted, 4),
            (2, 3, SpinPolarization::Restricted, 4),
            (2, 2, SpinPolarization::Restricted, 4),
            (3, 1, SpinPolarization::Restricted, 4),
            (9, 1, SpinPolarization::Restricted, 4),
            (2, 0, SpinPolarization::Restricted, 4),
        ];
        for (electrons, multiplicity, spin, orbitals) in cases {
            let result = Occupation::Aufbau {
                electrons,
                multiplicity,
            }
            .channel_occupations(spin, orbitals);
            assert!(
                matches!(result, Err(ScfError::InvalidConfig(_))),
                "N={} M={} accepted",
                electrons,
                multiplicity
            );
        }
    }

    #[test]
    fn fixed_occupations_are_padded_and_checked() {
        let occ = Occupation::Fixed(vec![vec![1.0, 0.5], vec![1.0]])
            .channel_occupations(SpinPolarization::Unrestricted, 3)
            .unwrap();
        assert_eq!(occ[0].as_slice(), &[1.0, 0.5, 0.0]);
        assert_eq!(occ[1].as_slice(), &[1.0, 0.0, 0.0]);

        assert!(Occupation::Fixed(vec![vec![1.5]])
            .channel_occupations(SpinPolarization::Unrestricted, 3)
            .is_err());
        assert!(Occupation::Fixed(vec![vec![2.0, 2.0]])
            .channel_occupations(SpinPolarization::Restricted, 1)
            .is_err());
        assert_eq!(Occupation::Fixed(vec![vec![1.0, 0.5], vec![1.0]]).electron_count(), 2.5);
    }

    #[test]
    fn density_from_orbitals() {
        let s = 0.5_f64.sqrt();
        let orbitals = OrbitalSet {
            energies: DVector::from_vec(vec![-1.0, 1.0]),
            coefficients: DMatrix::from_row_slice(2, 2, &[s, s, s, -s]),
            occupations: DVector::from_vec(vec![2.0, 0.0]),
        };
        let density = orbitals.density();
        assert!((density - DMatrix::from_element(2, 2, 1.0)).amax() < 1e-15);
        assert_eq!(orbitals.homo(), Some(-1.0));
        assert_eq!(orbitals.lumo(), Some(1.0));
    }
}

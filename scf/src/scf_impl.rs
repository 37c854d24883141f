//! SCF fixed-point iteration with history-based extrapolation
//!
//! This module provides the driver loop, the DIIS/damping history, occupation
//! handling and the small dense linear-algebra helpers they share.

mod diis;
mod driver;
mod energy;
mod occupation;

pub use diis::{History, Snapshot};
pub use driver::{ScfDriver, ScfOutcome, ScfSettings, ScfStatus};
pub use energy::{trace_product, EnergyComponents};
pub use occupation::{Occupation, OrbitalSet};

use crate::error::ScfError;
use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;
use tracing::warn;

/// Overlap eigenvalues at or below this are treated as linear dependencies.
pub const LINEAR_DEPENDENCY_CUTOFF: f64 = 1e-10;

/// Flips each eigenvector so that its largest-magnitude entry is positive.
pub fn align_eigenvectors(mut eigvecs: DMatrix<f64>) -> DMatrix<f64> {
    for mut col in eigvecs.column_iter_mut() {
        let pivot = col
            .iter()
            .copied()
            .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        if pivot < 0.0 {
            col.neg_mut();
        }
    }
    eigvecs
}

/// Orthogonaliser `X` with `Xᵀ S X = I`.
///
/// Symmetric `S^{-1/2}` when the overlap is well conditioned. Otherwise the
/// eigenvectors with eigenvalues below [`LINEAR_DEPENDENCY_CUTOFF`] are
/// dropped and the rectangular canonical form `U s^{-1/2}` is returned, so
/// the orthonormal basis has fewer functions than the original one.
pub fn orthogonalizer(overlap: &DMatrix<f64>) -> Result<DMatrix<f64>, ScfError> {
    let eig = overlap.clone().symmetric_eigen();
    let kept: Vec<usize> = (0..eig.eigenvalues.len())
        .filter(|&i| eig.eigenvalues[i] > LINEAR_DEPENDENCY_CUTOFF)
        .collect();

    if kept.is_empty() {
        return Err(ScfError::InvalidConfig(
            "overlap matrix has no positive eigenvalues".to_string(),
        ));
    }

    let inv_sqrt = DVector::from_iterator(
        kept.len(),
        kept.iter().map(|&i| 1.0 / eig.eigenvalues[i].sqrt()),
    );
    let u = eig.eigenvectors.select_columns(&kept);
    let scaled = &u * DMatrix::from_diagonal(&inv_sqrt);

    if kept.len() == overlap.nrows() {
        Ok(scaled * u.transpose())
    } else {
        warn!(
            "overlap is near-singular: removed {} of {} basis functions",
            overlap.nrows() - kept.len(),
            overlap.nrows()
        );
        Ok(scaled)
    }
}

/// Eigenpairs of `operator` in the basis orthogonalised by `x`, ascending,
/// back-transformed to the original basis.
pub fn diagonalize(operator: &DMatrix<f64>, x: &DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let f_prime = x.transpose() * operator * x;
    let eig = f_prime.symmetric_eigen();

    let mut indices: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    indices.sort_by(|&a, &b| {
        eig.eigenvalues[a]
            .partial_cmp(&eig.eigenvalues[b])
            .unwrap_or(Ordering::Equal)
    });
    let sorted_eigenvalues =
        DVector::from_fn(eig.eigenvalues.len(), |i, _| eig.eigenvalues[indices[i]]);
    let sorted_eigenvectors = eig.eigenvectors.select_columns(&indices);

    (sorted_eigenvalues, align_eigenvectors(x * sorted_eigenvectors))
}

/// Commutator error `F D S - S D F`; zero at self-consistency.
pub fn error_matrix(
    operator: &DMatrix<f64>,
    density: &DMatrix<f64>,
    overlap: &DMatrix<f64>,
) -> DMatrix<f64> {
    let fds = operator * density * overlap;
    let sdf = overlap * density * operator;
    fds - sdf
}

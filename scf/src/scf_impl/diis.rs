//! Bounded history of SCF iterates and operator extrapolation.
//!
//! Two extrapolation modes share one history:
//!
//! * DIIS: `F = Σ c_i F_i` with `c` minimising `‖Σ c_i E_i‖²` under
//!   `Σ c_i = 1`, where `E_i = F_i D_i S - S D_i F_i` is the commutator error.
//! * Damping: `F = (1 - β) F_new + β F_prev`, used while the latest residual
//!   is still above the DIIS threshold and `β > 0`.

use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;
use tracing::debug;

/// Largest DIIS weight accepted before the B system counts as ill-conditioned.
const MAX_COEFFICIENT: f64 = 1e3;

/// One SCF iterate as stored in the history.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub density: DMatrix<f64>,
    pub operator: DMatrix<f64>,
    pub error: DMatrix<f64>,
    pub energy: f64,
    pub residual: f64,
}

/// FIFO of the most recent SCF iterates for one spin channel.
#[derive(Debug)]
pub struct History {
    capacity: usize,
    snapshots: VecDeque<Snapshot>,
    previous_operator: DMatrix<f64>,
    diis_threshold: f64,
    damping: f64,
}

impl History {
    /// Empty history holding at most `capacity` snapshots (at least one).
    ///
    /// `seed` is the operator the damping mode mixes against until the first
    /// extrapolation has produced one; normally the core Hamiltonian.
    pub fn new(capacity: usize, seed: DMatrix<f64>) -> Self {
        History {
            capacity: capacity.max(1),
            snapshots: VecDeque::with_capacity(capacity.max(1)),
            previous_operator: seed,
            diis_threshold: f64::INFINITY,
            damping: 0.0,
        }
    }

    /// Damp with weight `damping` while the residual exceeds `diis_threshold`.
    pub fn with_mixing(mut self, diis_threshold: f64, damping: f64) -> Self {
        self.diis_threshold = diis_threshold;
        self.damping = damping;
        self
    }

    /// Appends an iterate, evicting the oldest one when full.
    pub fn update(
        &mut self,
        density: DMatrix<f64>,
        operator: DMatrix<f64>,
        error: DMatrix<f64>,
        energy: f64,
        residual: f64,
    ) {
        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(Snapshot {
            density,
            operator,
            error,
            energy,
            residual,
        });
    }

    /// Operator to diagonalise next, given the freshly assembled `operator`.
    ///
    /// Returns `operator` unchanged with fewer than two snapshots or when the
    /// DIIS equations are singular or ill-conditioned.
    pub fn extrapolate(&mut self, operator: &DMatrix<f64>) -> DMatrix<f64> {
        let result = match self.snapshots.back() {
            Some(latest) if self.snapshots.len() >= 2 => {
                if latest.residual > self.diis_threshold && self.damping > 0.0 {
                    (1.0 - self.damping) * operator + self.damping * &self.previous_operator
                } else {
                    self.diis_operator().unwrap_or_else(|| operator.clone())
                }
            }
            _ => operator.clone(),
        };
        self.previous_operator = result.clone();
        result
    }

    fn diis_operator(&self) -> Option<DMatrix<f64>> {
        let n = self.snapshots.len();

        // B_ij = <E_i|E_j>, bordered by the Σ c_i = 1 constraint
        let mut b = DMatrix::zeros(n + 1, n + 1);
        for (i, si) in self.snapshots.iter().enumerate() {
            for (j, sj) in self.snapshots.iter().enumerate().skip(i) {
                let overlap = si.error.dot(&sj.error);
                b[(i, j)] = overlap;
                b[(j, i)] = overlap;
            }
            b[(i, n)] = -1.0;
            b[(n, i)] = -1.0;
        }

        // unit-scaled error block
        let scale = (0..n).map(|i| b[(i, i)]).fold(0.0, f64::max);
        if !(scale.is_finite() && scale > 0.0) {
            debug!("DIIS extrapolation skipped: vanishing error vectors");
            return None;
        }
        let mut errors = b.view_mut((0, 0), (n, n));
        errors /= scale;

        let mut rhs = DVector::zeros(n + 1);
        rhs[n] = -1.0;

        let Some(coeffs) = b.lu().solve(&rhs) else {
            debug!("DIIS extrapolation skipped: singular B matrix");
            return None;
        };
        let weights = coeffs.rows(0, n);
        if weights.iter().any(|c| !c.is_finite() || c.abs() > MAX_COEFFICIENT)
            || (weights.sum() - 1.0).abs() > 1e-8
        {
            debug!("DIIS extrapolation skipped: ill-conditioned coefficients");
            return None;
        }

        let mut extrapolated = DMatrix::zeros(
            self.snapshots[0].operator.nrows(),
            self.snapshots[0].operator.ncols(),
        );
        for (snapshot, &c) in self.snapshots.iter().zip(weights.iter()) {
            extrapolated += &snapshot.operator * c;
        }
        debug!("DIIS extrapolation with {} vectors", n);
        Some(extrapolated)
    }

    /// Drops every stored snapshot and its allocation.
    pub fn release(&mut self) {
        self.snapshots = VecDeque::new();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Snapshots from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}

impl Drop for History {
    fn drop(&mut self) {
        self.release();
    }
}

//! Lopez-Sancho decimation for the retarded surface Green's function.
//!
//! A semi-infinite periodic lead is described by its principal-layer blocks
//! `h0`/`s0` and the nearest-neighbour coupling `h1`/`s1`. Each decimation
//! step folds every second layer into its neighbours, so the effective
//! coupling between the surviving layers shrinks geometrically and the
//! renormalised surface block converges to the inverse of the surface
//! Green's function:
//!
//! ```text
//! a  = ω s0 - h0,  a0 = a,  b = ω s1 - h1,  c = bᵀ
//! repeat while ‖b‖ + ‖c‖ > conv:
//!     e = -c a⁻¹ b,  d = -b a⁻¹ c
//!     a0 += d,  a += d + e
//!     b <- b a⁻¹ b,  c <- c a⁻¹ c
//! g_surf = a0⁻¹
//! ```

use crate::error::NegfError;
use crate::linalg::{
    ensure_shape, fill_shifted_block, invert_in_place, max_abs_norm, ComplexMatrix, C64,
};
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, trace};

/// Upper bound on decimation steps unless the caller overrides it.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Convergence controls for the decimation loop.
///
/// `conv` has no sensible universal value and must always be supplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanchoParams {
    pub conv: f64,
    pub max_iterations: usize,
}

impl SanchoParams {
    pub fn new(conv: f64) -> Self {
        SanchoParams {
            conv,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn validate(&self) -> Result<(), NegfError> {
        if !(self.conv.is_finite() && self.conv > 0.0) {
            return Err(NegfError::InvalidTolerance(self.conv));
        }
        Ok(())
    }
}

/// Principal-layer description of a semi-infinite lead.
#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub h0: DMatrix<f64>,
    pub s0: DMatrix<f64>,
    pub h1: DMatrix<f64>,
    pub s1: DMatrix<f64>,
}

impl Lead {
    pub fn new(
        h0: DMatrix<f64>,
        s0: DMatrix<f64>,
        h1: DMatrix<f64>,
        s1: DMatrix<f64>,
    ) -> Result<Self, NegfError> {
        let n = h0.nrows();
        let square = (n, n);
        ensure_shape("lead on-site Hamiltonian h0", &h0, square)?;
        ensure_shape("lead on-site overlap s0", &s0, square)?;
        ensure_shape("lead coupling Hamiltonian h1", &h1, square)?;
        ensure_shape("lead coupling overlap s1", &s1, square)?;
        Ok(Lead { h0, s0, h1, s1 })
    }

    /// Lead in an orthonormal basis (`s0 = I`, `s1 = 0`).
    pub fn orthogonal(h0: DMatrix<f64>, h1: DMatrix<f64>) -> Result<Self, NegfError> {
        let n = h0.nrows();
        Self::new(h0, DMatrix::identity(n, n), h1, DMatrix::zeros(n, n))
    }

    pub fn dim(&self) -> usize {
        self.h0.nrows()
    }
}

/// Converged surface Green's function together with convergence data.
#[derive(Debug, Clone)]
pub struct SurfaceGreenFunction {
    pub g_surf: ComplexMatrix,
    pub iterations: usize,
    /// `‖b‖_max + ‖c‖_max` when the loop stopped.
    pub residual: f64,
}

/// Mutable state of one decimation run.
///
/// The bundle is fully re-initialised at the start of every call, so one
/// workspace can be reused across an energy scan without reallocating. It is
/// borrowed mutably per call and therefore never shared between concurrent
/// evaluations.
#[derive(Debug, Clone)]
pub struct SanchoWorkspace {
    a: ComplexMatrix,
    a0: ComplexMatrix,
    a_inv: ComplexMatrix,
    b: ComplexMatrix,
    c: ComplexMatrix,
    d: ComplexMatrix,
    e: ComplexMatrix,
    scratch: ComplexMatrix,
}

impl SanchoWorkspace {
    pub fn new(dim: usize) -> Self {
        let zeros = ComplexMatrix::zeros(dim, dim);
        SanchoWorkspace {
            a: zeros.clone(),
            a0: zeros.clone(),
            a_inv: zeros.clone(),
            b: zeros.clone(),
            c: zeros.clone(),
            d: zeros.clone(),
            e: zeros.clone(),
            scratch: zeros,
        }
    }

    pub fn dim(&self) -> usize {
        self.a.nrows()
    }

    /// Computes the retarded surface Green's function of `lead` at `omega`.
    ///
    /// `transp` selects the coupling direction: when set, `h1`/`s1` are taken
    /// as the transposed (reverse) coupling and `b = ω s1ᵀ - h1ᵀ`.
    pub fn surface_green_function(
        &mut self,
        omega: C64,
        lead: &Lead,
        transp: bool,
        params: &SanchoParams,
    ) -> Result<SurfaceGreenFunction, NegfError> {
        params.validate()?;
        if lead.dim() != self.dim() {
            return Err(NegfError::DimensionMismatch {
                what: "Sancho workspace",
                expected: (self.dim(), self.dim()),
                found: (lead.dim(), lead.dim()),
            });
        }

        self.reset(omega, lead, transp);

        let mut iterations = 0;
        let mut residual = self.coupling_norm();
        while residual > params.conv {
            if iterations >= params.max_iterations {
                return Err(NegfError::NotConverged {
                    iterations,
                    residual,
                });
            }
            iterations += 1;
            self.decimate(iterations)?;
            residual = self.coupling_norm();
            if residual.is_nan() {
                return Err(NegfError::SingularRecursion {
                    iteration: iterations,
                });
            }
            trace!(iterations, residual, "decimation step");
        }

        let mut g_surf = self.a0.clone();
        if !invert_in_place(&mut g_surf) {
            return Err(NegfError::SingularSurface);
        }

        debug!(
            omega_re = omega.re,
            omega_im = omega.im,
            iterations,
            residual,
            "surface Green's function converged"
        );
        Ok(SurfaceGreenFunction {
            g_surf,
            iterations,
            residual,
        })
    }

    /// Renormalised surface block `a0` of the last call.
    pub fn surface_block(&self) -> &ComplexMatrix {
        &self.a0
    }

    fn reset(&mut self, omega: C64, lead: &Lead, transp: bool) {
        let zero = C64::new(0.0, 0.0);
        fill_shifted_block(&mut self.a, omega, &lead.s0, &lead.h0, false);
        self.a0.copy_from(&self.a);
        fill_shifted_block(&mut self.b, omega, &lead.s1, &lead.h1, transp);
        self.b.transpose_to(&mut self.c);
        self.a_inv.fill(zero);
        self.d.fill(zero);
        self.e.fill(zero);
        self.scratch.fill(zero);
    }

    fn coupling_norm(&self) -> f64 {
        max_abs_norm(&self.b) + max_abs_norm(&self.c)
    }

    /// One decimation step.
    ///
    /// `d` and `e` must be formed from the old `b` and `c`; the renormalised
    /// couplings are written only after both corrections have been folded
    /// into `a0` and `a`.
    fn decimate(&mut self, iteration: usize) -> Result<(), NegfError> {
        let one = C64::new(1.0, 0.0);
        let zero = C64::new(0.0, 0.0);

        self.a_inv.copy_from(&self.a);
        if !invert_in_place(&mut self.a_inv) {
            return Err(NegfError::SingularRecursion { iteration });
        }

        // e = -c a⁻¹ b
        self.scratch.gemm(one, &self.a_inv, &self.b, zero);
        self.e.gemm(-one, &self.c, &self.scratch, zero);
        // d = -b a⁻¹ c
        self.scratch.gemm(one, &self.a_inv, &self.c, zero);
        self.d.gemm(-one, &self.b, &self.scratch, zero);

        self.a0 += &self.d;
        self.a += &self.d;
        self.a += &self.e;

        // d and e are spent: c a⁻¹ c goes to d (scratch still holds a⁻¹ c),
        // b a⁻¹ b goes to e, then both are swapped into place.
        self.d.gemm(one, &self.c, &self.scratch, zero);
        self.scratch.gemm(one, &self.a_inv, &self.b, zero);
        self.e.gemm(one, &self.b, &self.scratch, zero);
        std::mem::swap(&mut self.c, &mut self.d);
        std::mem::swap(&mut self.b, &mut self.e);
        Ok(())
    }
}

/// Surface Green's functions over a set of energy points.
///
/// Points are evaluated in parallel; each rayon worker owns its own
/// [`SanchoWorkspace`]. The first failure is returned.
pub fn scan(
    energies: &[C64],
    lead: &Lead,
    transp: bool,
    params: &SanchoParams,
) -> Result<Vec<SurfaceGreenFunction>, NegfError> {
    energies
        .par_iter()
        .map_init(
            || SanchoWorkspace::new(lead.dim()),
            |workspace, &omega| workspace.surface_green_function(omega, lead, transp, params),
        )
        .collect()
}

//! Numeric tolerances and hard limits.
//!
//! The tolerances are geometry-kind specific: vector-zero tests are far
//! tighter than plane-proximity tests, and the matrix/eigen tolerances
//! scale with the matrix dimension the way the accumulated rounding
//! error does.

/// General geometric comparison tolerance (plane proximity, point
/// coincidence, distance equality).
pub const EPS: f64 = 1e-7;

/// A vector with magnitude below this is treated as zero.
pub const EPS_ZERO_VEC: f64 = 1e-10;

/// Tolerance for N x N matrix element comparison, rank decisions and
/// Jacobi convergence: machine epsilon * 10^(N+1) * 100.
pub const fn matrix_eps(n: u32) -> f64 {
  f64::EPSILON * pow10(n + 1) * 100.0
}

const fn pow10(n: u32) -> f64 {
  let mut v = 1.0;
  let mut i = 0;
  while i < n {
    v *= 10.0;
    i += 1;
  }
  v
}

/// Half-extent used for unbounded box axes. Anything at or beyond this
/// magnitude reads as "unbounded along that axis".
pub const MAX_EXTENT: f64 = 1e35;

/// Lattice dimension declarators beyond this index fail the expansion.
pub const MAX_LATTICE_INDEX: i32 = 10_000;

/// Ferrari's method switches to the biquadratic path when the depressed
/// cubic-term coefficient is below this. Double precision cannot
/// distinguish a genuinely zero `q` from this level of noise.
pub const FERRARI_Q_EPS: f64 = 1e-6;

/// Target precision of the Newton polish applied to quartic roots.
pub const NEWTON_PREC: f64 = 1e-12;

/// Iteration cap for the Newton polish.
pub const NEWTON_MAX_ITER: usize = 50_000;

/// Iteration cap for the Jacobi eigen sweep.
pub const JACOBI_MAX_ITER: usize = 100_000;

/// Gram-Schmidt relaxation passes when re-orthonormalizing a TR
/// rotation block.
pub const ORTHO_RELAX_LOOPS: usize = 50;

/// Non-orthogonality above this (radians) in a TR rotation block is
/// reported to the user.
pub const ORTHO_WARN_RAD: f64 = 1e-3;

/// Offset step used to move intersection candidates off a plane before
/// the forward-side membership test.
pub const BB_TEST_DELTA: f64 = 10.0 * EPS;

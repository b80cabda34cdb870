//! 3x3 matrices and 4x4 row-vector affine transforms.
//!
//! `Mat3` carries everything the quadric machinery needs: cofactor
//! inverse, rank via Gram-Schmidt, the Jacobi eigen sweep with the
//! descending / zeros-last ordering, and the rotation generators.
//! `Affine` is the 4x4 transform with rotation in the upper-left 3x3
//! and translation in the last row; points transform as `p' = p * M`.

use glam::DVec3;

use crate::constants::{matrix_eps, EPS, JACOBI_MAX_ITER};
use crate::error::{Error, Result};
use crate::math::vector::orthogonalize;

/// Row-major 3x3 matrix acting on row vectors from the right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3 {
  pub m: [[f64; 3]; 3],
}

impl Mat3 {
  pub const ZERO: Mat3 = Mat3 { m: [[0.0; 3]; 3] };
  pub const IDENTITY: Mat3 = Mat3 {
    m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
  };

  pub const EPS: f64 = matrix_eps(3);

  pub fn from_rows(r0: DVec3, r1: DVec3, r2: DVec3) -> Self {
    Mat3 {
      m: [
        [r0.x, r0.y, r0.z],
        [r1.x, r1.y, r1.z],
        [r2.x, r2.y, r2.z],
      ],
    }
  }

  pub fn from_cols(c0: DVec3, c1: DVec3, c2: DVec3) -> Self {
    Mat3::from_rows(c0, c1, c2).transposed()
  }

  pub fn row(&self, i: usize) -> DVec3 {
    DVec3::new(self.m[i][0], self.m[i][1], self.m[i][2])
  }

  pub fn col(&self, j: usize) -> DVec3 {
    DVec3::new(self.m[0][j], self.m[1][j], self.m[2][j])
  }

  pub fn transposed(&self) -> Mat3 {
    let mut out = Mat3::ZERO;
    for i in 0..3 {
      for j in 0..3 {
        out.m[i][j] = self.m[j][i];
      }
    }
    out
  }

  pub fn determinant(&self) -> f64 {
    let m = &self.m;
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
      - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
      + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
  }

  pub fn is_regular(&self) -> bool {
    self.determinant().abs() > Mat3::EPS
  }

  pub fn is_symmetric(&self) -> bool {
    for i in 0..3 {
      for j in (i + 1)..3 {
        if (self.m[i][j] - self.m[j][i]).abs() > Mat3::EPS {
          return false;
        }
      }
    }
    true
  }

  pub fn is_orthogonal(&self) -> bool {
    (*self * self.transposed()).approx_eq(&Mat3::IDENTITY)
  }

  pub fn approx_eq(&self, other: &Mat3) -> bool {
    for i in 0..3 {
      for j in 0..3 {
        if (self.m[i][j] - other.m[i][j]).abs() > Mat3::EPS {
          return false;
        }
      }
    }
    true
  }

  /// Cofactor inverse. A singular matrix inverts to the zero matrix so
  /// downstream regularity checks stay the caller's responsibility.
  pub fn inverse(&self) -> Mat3 {
    let det = self.determinant();
    if det.abs() <= Mat3::EPS {
      return Mat3::ZERO;
    }
    let m = &self.m;
    let cof = |r0: usize, r1: usize, c0: usize, c1: usize| -> f64 {
      m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
    };
    // adj[i][j] = cofactor(j, i)
    let adj = [
      [cof(1, 2, 1, 2), -cof(0, 2, 1, 2), cof(0, 1, 1, 2)],
      [-cof(1, 2, 0, 2), cof(0, 2, 0, 2), -cof(0, 1, 0, 2)],
      [cof(1, 2, 0, 1), -cof(0, 2, 0, 1), cof(0, 1, 0, 1)],
    ];
    let mut out = Mat3 { m: adj };
    for i in 0..3 {
      for j in 0..3 {
        out.m[i][j] /= det;
      }
    }
    out
  }

  /// Rank as the number of linearly independent rows, decided by
  /// Gram-Schmidt orthogonalization of the normalized rows.
  pub fn rank(&self) -> i32 {
    let mut rows = [DVec3::ZERO; 3];
    for i in 0..3 {
      let r = self.row(i);
      rows[i] = if r.length() > Mat3::EPS { r.normalize() } else { DVec3::ZERO };
    }
    orthogonalize(&mut rows, 20) as i32
  }

  pub fn trace(&self) -> f64 {
    self.m[0][0] + self.m[1][1] + self.m[2][2]
  }

  /// Replace the rows with an orthonormal set via Gram-Schmidt.
  /// Fails when the rows are linearly dependent.
  pub fn orthonormalize(&mut self, relax: usize) -> Result<()> {
    let mut rows = [self.row(0), self.row(1), self.row(2)];
    if orthogonalize(&mut rows, relax) != 3 {
      return Err(Error::DegenerateGeometry(
        "cannot orthonormalize a rank-deficient rotation block".into(),
      ));
    }
    *self = Mat3::from_rows(rows[0].normalize(), rows[1].normalize(), rows[2].normalize());
    Ok(())
  }

  /// Largest off-diagonal element (by magnitude) of a symmetric
  /// matrix, with its (row, col) position.
  fn max_off_diagonal(&self) -> (f64, usize, usize) {
    let mut best = 0.0_f64;
    let (mut p, mut q) = (0, 1);
    for i in 0..3 {
      for j in (i + 1)..3 {
        if self.m[i][j].abs() > best.abs() {
          best = self.m[i][j];
          p = i;
          q = j;
        }
      }
    }
    (best, p, q)
  }

  /// Jacobi eigen decomposition of a symmetric matrix.
  ///
  /// Returns eigenvalues and matching (row) eigenvectors. With `sort`
  /// the pairs are ordered descending with near-zero values pushed to
  /// the end; the signature `(positives, negatives)` is judged against
  /// the largest eigenvalue magnitude so that rank-style zero
  /// decisions stay consistent under rounding.
  pub fn sym_eigen(&self, sort: bool, warn: bool) -> Result<SymEigen> {
    if !self.is_symmetric() {
      return Err(Error::DegenerateGeometry(
        "eigen decomposition is implemented for symmetric matrices only".into(),
      ));
    }
    let criterion = Mat3::EPS;
    let mut target = *self;
    let mut vecs = Mat3::IDENTITY; // rows accumulate the eigenvectors
    let (mut off, mut p, mut q) = target.max_off_diagonal();
    let mut prev_off = off;
    let mut iterations = 0usize;

    while off.abs() >= criterion {
      let beta = -off;
      let alpha = 0.5 * (target.m[p][p] - target.m[q][q]);
      let gamma = alpha.abs() / (alpha * alpha + beta * beta).sqrt();
      let sign = if alpha * beta > 0.0 { 1.0 } else { -1.0 };
      let cos_t = (0.5 * (1.0 + gamma)).sqrt();
      let sin_t = (0.5 * (1.0 - gamma)).sqrt() * sign;

      let mut givens = Mat3::IDENTITY;
      givens.m[p][p] = cos_t;
      givens.m[q][q] = cos_t;
      givens.m[p][q] = sin_t;
      givens.m[q][p] = -sin_t;
      let givens_tr = givens.transposed();

      target = givens_tr * target * givens;
      vecs = givens_tr * vecs;

      let next = target.max_off_diagonal();
      off = next.0;
      p = next.1;
      q = next.2;

      iterations += 1;
      if iterations > JACOBI_MAX_ITER {
        return Err(Error::DegenerateGeometry(
          "Jacobi eigen iteration exceeded its cap".into(),
        ));
      }
      // Stalled progress means rounding noise, not divergence.
      if (prev_off - off).abs() < Mat3::EPS {
        break;
      }
      prev_off = off;
    }

    if warn && off.abs() > criterion {
      tracing::warn!(residual = off.abs(), "eigen sweep left a non-diagonal residual");
    }

    let mut pairs: Vec<(f64, DVec3)> =
      (0..3).map(|i| (target.m[i][i], vecs.row(i))).collect();
    if sort {
      pairs.sort_by(|a, b| {
        let az = a.0.abs() < EPS;
        let bz = b.0.abs() < EPS;
        match (az, bz) {
          (true, true) => std::cmp::Ordering::Equal,
          (true, false) => std::cmp::Ordering::Greater,
          (false, true) => std::cmp::Ordering::Less,
          (false, false) => b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal),
        }
      });
    }

    let values = [pairs[0].0, pairs[1].0, pairs[2].0];
    let vectors = [pairs[0].1, pairs[1].1, pairs[2].1];

    let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let signature = if max_abs < Mat3::EPS {
      (0, 0)
    } else {
      let crit = Mat3::EPS * max_abs;
      let pos = values.iter().filter(|v| **v > crit).count() as i32;
      let neg = values.iter().filter(|v| **v < -crit).count() as i32;
      (pos, neg)
    };

    Ok(SymEigen {
      values,
      vectors,
      signature,
    })
  }
}

/// Result of [`Mat3::sym_eigen`].
#[derive(Clone, Copy, Debug)]
pub struct SymEigen {
  pub values: [f64; 3],
  pub vectors: [DVec3; 3],
  /// (positive, negative) eigenvalue counts.
  pub signature: (i32, i32),
}

impl std::ops::Mul for Mat3 {
  type Output = Mat3;
  fn mul(self, rhs: Mat3) -> Mat3 {
    let mut out = Mat3::ZERO;
    for i in 0..3 {
      for j in 0..3 {
        let mut sum = 0.0;
        for k in 0..3 {
          sum += self.m[i][k] * rhs.m[k][j];
        }
        out.m[i][j] = sum;
      }
    }
    out
  }
}

impl std::ops::Mul<f64> for Mat3 {
  type Output = Mat3;
  fn mul(self, rhs: f64) -> Mat3 {
    let mut out = self;
    for i in 0..3 {
      for j in 0..3 {
        out.m[i][j] *= rhs;
      }
    }
    out
  }
}

// Row vector times matrix: v' = v * M.
impl std::ops::Mul<Mat3> for DVec3 {
  type Output = DVec3;
  fn mul(self, m: Mat3) -> DVec3 {
    DVec3::new(self.dot(m.col(0)), self.dot(m.col(1)), self.dot(m.col(2)))
  }
}

/// Rodrigues rotation of a row vector around `axis` by `radians`
/// (right-hand screw).
pub fn rotation_about(axis: DVec3, radians: f64) -> Mat3 {
  let n = axis.normalize();
  let (n1, n2, n3) = (n.x, n.y, n.z);
  let c = radians.cos();
  let s = radians.sin();
  Mat3 {
    m: [
      [c + n1 * n1 * (1.0 - c), n1 * n2 * (1.0 - c) + n3 * s, n1 * n3 * (1.0 - c) - n2 * s],
      [n1 * n2 * (1.0 - c) - n3 * s, c + n2 * n2 * (1.0 - c), n2 * n3 * (1.0 - c) + n1 * s],
      [n1 * n3 * (1.0 - c) + n2 * s, n2 * n3 * (1.0 - c) - n1 * s, c + n3 * n3 * (1.0 - c)],
    ],
  }
}

/// A rotation carrying `from` onto `to`. Anti-parallel input rotates by
/// pi around an arbitrary axis orthogonal to `to` (a pure reflection
/// would flip chirality).
pub fn rotation_onto(to: DVec3, from: DVec3) -> Mat3 {
  use crate::math::vector::{get_orthogonal_unit, is_dependent};
  if is_dependent(to, from) {
    if to.dot(from) > 0.0 {
      return Mat3::IDENTITY;
    }
    return rotation_about(get_orthogonal_unit(to), std::f64::consts::PI);
  }
  let v1 = to.normalize();
  let v2 = from.normalize();
  rotation_about(v1.cross(v2), -v1.dot(v2).clamp(-1.0, 1.0).acos())
}

/// 4x4 affine transform, row-vector convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
  pub m: [[f64; 4]; 4],
}

impl Affine {
  pub const IDENTITY: Affine = Affine {
    m: [
      [1.0, 0.0, 0.0, 0.0],
      [0.0, 1.0, 0.0, 0.0],
      [0.0, 0.0, 1.0, 0.0],
      [0.0, 0.0, 0.0, 1.0],
    ],
  };

  pub fn from_parts(rotation: Mat3, translation: DVec3) -> Affine {
    let mut out = Affine::IDENTITY;
    out.set_rotation(rotation);
    out.set_translation(translation);
    out
  }

  pub fn from_translation(translation: DVec3) -> Affine {
    Affine::from_parts(Mat3::IDENTITY, translation)
  }

  pub fn rotation(&self) -> Mat3 {
    let mut out = Mat3::ZERO;
    for i in 0..3 {
      for j in 0..3 {
        out.m[i][j] = self.m[i][j];
      }
    }
    out
  }

  pub fn translation(&self) -> DVec3 {
    DVec3::new(self.m[3][0], self.m[3][1], self.m[3][2])
  }

  pub fn set_rotation(&mut self, rot: Mat3) {
    for i in 0..3 {
      for j in 0..3 {
        self.m[i][j] = rot.m[i][j];
      }
    }
  }

  pub fn set_translation(&mut self, t: DVec3) {
    self.m[3][0] = t.x;
    self.m[3][1] = t.y;
    self.m[3][2] = t.z;
  }

  /// `p' = [p 1] * M`.
  pub fn apply_point(&self, p: DVec3) -> DVec3 {
    p * self.rotation() + self.translation()
  }

  /// Directions ignore the translation row.
  pub fn apply_vector(&self, v: DVec3) -> DVec3 {
    v * self.rotation()
  }

  /// Inverse of the affine: `R' = R^-1`, `t' = -t * R^-1`.
  pub fn inverse(&self) -> Affine {
    let rinv = self.rotation().inverse();
    Affine::from_parts(rinv, -(self.translation() * rinv))
  }

  pub fn approx_eq(&self, other: &Affine) -> bool {
    let eps = matrix_eps(4);
    for i in 0..4 {
      for j in 0..4 {
        if (self.m[i][j] - other.m[i][j]).abs() > eps {
          return false;
        }
      }
    }
    true
  }

  pub fn is_identity(&self) -> bool {
    self.approx_eq(&Affine::IDENTITY)
  }
}

// Left-to-right composition: applying `a * b` equals applying `a`,
// then `b`, on a row vector.
impl std::ops::Mul for Affine {
  type Output = Affine;
  fn mul(self, rhs: Affine) -> Affine {
    let mut out = Affine {
      m: [[0.0; 4]; 4],
    };
    for i in 0..4 {
      for j in 0..4 {
        let mut sum = 0.0;
        for k in 0..4 {
          sum += self.m[i][k] * rhs.m[k][j];
        }
        out.m[i][j] = sum;
      }
    }
    out
  }
}

#[cfg(test)]
#[path = "matrix_test.rs"]
mod matrix_test;

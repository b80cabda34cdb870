//! Numerics: row-vector affine algebra over `glam` f64 vectors, plus
//! the polynomial solvers used by torus ray intersection.
//!
//! Convention summary (everything downstream depends on it):
//! - vectors are *row* vectors; points transform as `p' = p * M`,
//! - the 4x4 affine carries rotation in the upper-left 3x3 and the
//!   translation in the *last row*,
//! - chirality is right handed, rotation angles follow the right-hand
//!   screw rule around the axis.

pub mod matrix;
pub mod quartic;
pub mod vector;

pub use matrix::{rotation_about, rotation_onto, Affine, Mat3, SymEigen};
pub use vector::{
  get_orthogonal_unit, get_two_orthogonal_units, is_dependent, is_orthogonal, is_same_point,
  normalized, orthogonalize, Axis, Point, Vector,
};

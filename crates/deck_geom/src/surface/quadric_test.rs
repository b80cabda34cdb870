use glam::DVec3;

use super::*;
use crate::math::{rotation_about, Affine};

/// Sphere of radius 4 centered at (10, 0, 0):
/// x^2 + y^2 + z^2 - 20x + 84 = 0.
fn offset_sphere() -> Quadric {
  Quadric::new([1.0, 1.0, 1.0, 0.0, 0.0, 0.0, -20.0, 0.0, 0.0, 84.0])
}

#[test]
fn implicit_signs() {
  let q = offset_sphere();
  assert!(q.implicit(DVec3::new(10.0, 0.0, 0.0)) < 0.0);
  assert!(q.implicit(DVec3::new(0.0, 0.0, 0.0)) > 0.0);
  assert!(q.implicit(DVec3::new(14.0, 0.0, 0.0)).abs() < 1e-9);
}

#[test]
fn ray_intersections_pick_the_near_root() {
  let q = offset_sphere();
  let hit = q.intersection(DVec3::new(-100.0, 0.0, 0.0), DVec3::X).unwrap();
  assert!((hit - DVec3::new(6.0, 0.0, 0.0)).length() < 1e-9);

  // From the center outward: one positive root.
  let hit = q.intersection(DVec3::new(10.0, 0.0, 0.0), DVec3::Y).unwrap();
  assert!((hit - DVec3::new(10.0, 4.0, 0.0)).length() < 1e-9);

  // Pointing away: both roots behind.
  assert!(q.intersection(DVec3::new(-100.0, 0.0, 0.0), -DVec3::X).is_none());
  // Missing entirely.
  assert!(q.intersection(DVec3::new(-100.0, 50.0, 0.0), DVec3::X).is_none());
}

fn normalize_coeffs(c: &[f64; 10]) -> [f64; 10] {
  let max = c.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
  let mut out = *c;
  for v in &mut out {
    *v /= max;
  }
  out
}

#[test]
fn transform_roundtrip_restores_coefficients() {
  let q0 = offset_sphere();
  let rot = rotation_about(DVec3::Z, std::f64::consts::FRAC_PI_4);
  let m = Affine::from_parts(rot, DVec3::new(3.0, -2.0, 7.0));

  let mut q = q0;
  q.transform(&m);
  q.transform(&m.inverse());

  let a = normalize_coeffs(&q0.coeffs);
  let b = normalize_coeffs(&q.coeffs);
  for (x, y) in a.iter().zip(b.iter()) {
    assert!((x - y).abs() < 1e-9, "{a:?} vs {b:?}");
  }
}

#[test]
fn transform_moves_the_surface_with_the_points() {
  // For any transform M and point p on the surface, M(p) must lie on
  // the transformed surface.
  let q0 = offset_sphere();
  let rot = rotation_about(DVec3::new(1.0, 1.0, 0.0), 1.1);
  let m = Affine::from_parts(rot, DVec3::new(-4.0, 0.5, 2.0));
  let mut q = q0;
  q.transform(&m);
  for p in [
    DVec3::new(14.0, 0.0, 0.0),
    DVec3::new(10.0, 4.0, 0.0),
    DVec3::new(10.0, 0.0, -4.0),
  ] {
    assert!(q0.implicit(p).abs() < 1e-9);
    let moved = m.apply_point(p);
    assert!(q.implicit(moved).abs() < 1e-7, "point {p:?} drifted");
  }
}

#[test]
fn sq_card_folds_center_into_the_transform() {
  // SQ sphere of radius 2 centered at (1, 2, 3).
  let params = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, -4.0, 1.0, 2.0, 3.0];
  let (quad, matrix) = Quadric::from_sq(&params, &Affine::IDENTITY).unwrap();
  let mut q = quad;
  q.transform(&matrix);
  assert!(q.implicit(DVec3::new(3.0, 2.0, 3.0)).abs() < 1e-9);
  assert!(q.implicit(DVec3::new(1.0, 2.0, 3.0)) < 0.0);
  assert!(q.implicit(DVec3::new(5.0, 2.0, 3.0)) > 0.0);
}

#[test]
fn degenerate_rank_combinations_are_rejected() {
  // All-zero coefficients cannot define a surface.
  let q = Quadric::new([0.0; 10]);
  assert!(q.bounding_planes("dead", false).is_err());
}

#[test]
fn rotation_matrix_convention_matches_surface_transform() {
  // A plane-like quadric x = 0 rotated 90 degrees about z becomes
  // y = 0 with the same orientation as the rotated normal.
  let mut q = Quadric::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
  let rot = rotation_about(DVec3::Z, std::f64::consts::FRAC_PI_2);
  q.transform(&Affine::from_parts(rot, DVec3::ZERO));
  let n = DVec3::X * rot;
  let probe = 5.0 * n;
  assert!(q.implicit(probe) > 0.0);
  assert!(q.implicit(-probe) < 0.0);
}

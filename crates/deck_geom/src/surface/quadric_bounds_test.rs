use glam::DVec3;

use super::*;
use crate::surface::quadric::Quadric;

fn sets_for(coeffs: [f64; 10], inside: bool) -> PlaneSets {
  bounding_planes(&Quadric::new(coeffs), "t", inside).unwrap()
}

/// Every point of `samples` must satisfy at least one conjunction of
/// the set (forward of every plane in it).
fn assert_covered(sets: &PlaneSets, samples: &[DVec3]) {
  for p in samples {
    let inside_any = sets
      .iter()
      .any(|conj| conj.iter().all(|plane| plane.is_forward(*p)));
    assert!(inside_any, "point {p:?} escapes the bounding set");
  }
}

#[test]
fn ellipsoid_inside_is_a_box() {
  // x^2/4 + y^2/9 + z^2 = 1, inside.
  let sets = sets_for([0.25, 1.0 / 9.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], true);
  assert_eq!(sets.len(), 1);
  assert_eq!(sets[0].len(), 6);
  assert_covered(
    &sets,
    &[
      DVec3::ZERO,
      DVec3::new(1.99, 0.0, 0.0),
      DVec3::new(0.0, 2.99, 0.0),
      DVec3::new(0.0, 0.0, 0.99),
    ],
  );
  // The box is tight: points past the semi-axes are excluded.
  let outside = DVec3::new(2.5, 0.0, 0.0);
  assert!(!sets[0].iter().all(|pl| pl.is_forward(outside)));
}

#[test]
fn ellipsoid_outside_is_six_tangent_half_spaces() {
  let sets = sets_for([0.25, 1.0 / 9.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], false);
  assert_eq!(sets.len(), 6);
  assert_covered(
    &sets,
    &[
      DVec3::new(3.0, 0.0, 0.0),
      DVec3::new(-3.0, 0.0, 0.0),
      DVec3::new(0.0, 4.0, 0.0),
      DVec3::new(0.0, 0.0, -2.0),
      DVec3::new(5.0, 5.0, 5.0),
    ],
  );
}

#[test]
fn shifted_sphere_bounds_follow_the_center() {
  // Sphere radius 4 at (10, 0, 0), inside.
  let sets = sets_for([1.0, 1.0, 1.0, 0.0, 0.0, 0.0, -20.0, 0.0, 0.0, 84.0], true);
  assert_eq!(sets.len(), 1);
  assert_covered(
    &sets,
    &[
      DVec3::new(10.0, 0.0, 0.0),
      DVec3::new(13.9, 0.0, 0.0),
      DVec3::new(10.0, -3.9, 0.0),
    ],
  );
  let outside = DVec3::new(15.0, 0.0, 0.0);
  assert!(!sets[0].iter().all(|pl| pl.is_forward(outside)));
}

#[test]
fn one_sheet_hyperboloid_inside() {
  // x^2 + y^2 - z^2 = 1.
  let sets = sets_for([1.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], true);
  assert_eq!(sets.len(), 2);
  assert_covered(
    &sets,
    &[
      DVec3::ZERO,
      DVec3::new(0.9, 0.0, 0.0),
      DVec3::new(0.0, 0.0, 5.0),
      DVec3::new(3.0, 0.0, 3.0),
    ],
  );
}

#[test]
fn one_sheet_hyperboloid_outside_is_the_waist_square() {
  let sets = sets_for([1.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], false);
  assert_eq!(sets.len(), 4);
  assert_covered(&sets, &[DVec3::new(2.0, 0.0, 0.0), DVec3::new(0.0, -2.0, 0.0)]);
}

#[test]
fn two_sheet_hyperboloid_outside_is_whole_space() {
  // z^2 - x^2 - y^2 = 1 (two sheets along z).
  let sets = sets_for([-1.0, -1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], false);
  assert_eq!(sets.len(), 2);
  assert_covered(&sets, &[DVec3::ZERO, DVec3::new(100.0, 0.0, 0.0)]);
}

#[test]
fn elliptic_cone_inside_has_two_nappes() {
  // x^2 + y^2 - z^2 = 0.
  let sets = sets_for([1.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], true);
  assert_eq!(sets.len(), 2);
  assert_covered(
    &sets,
    &[
      DVec3::new(0.0, 0.0, 5.0),
      DVec3::new(0.0, 0.0, -5.0),
      DVec3::new(1.0, 0.0, 2.0),
    ],
  );
}

#[test]
fn elliptic_cylinder_inside_is_a_square_tube() {
  // x^2/4 + y^2 = 1, any z.
  let sets = sets_for([0.25, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], true);
  assert_eq!(sets.len(), 1);
  assert_eq!(sets[0].len(), 4);
  assert_covered(
    &sets,
    &[
      DVec3::new(0.0, 0.0, 100.0),
      DVec3::new(1.9, 0.0, -50.0),
      DVec3::new(0.0, 0.9, 0.0),
    ],
  );
}

#[test]
fn elliptic_cylinder_outside() {
  let sets = sets_for([0.25, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], false);
  assert_eq!(sets.len(), 4);
  assert_covered(&sets, &[DVec3::new(3.0, 0.0, 7.0), DVec3::new(0.0, -2.0, 0.0)]);
}

#[test]
fn parallel_planes_inside_is_a_slab() {
  // x^2 = 1.
  let sets = sets_for([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], true);
  assert_eq!(sets.len(), 1);
  assert_covered(&sets, &[DVec3::ZERO, DVec3::new(0.9, 40.0, -3.0)]);
  assert!(!sets[0].iter().all(|pl| pl.is_forward(DVec3::new(1.5, 0.0, 0.0))));
}

#[test]
fn parallel_planes_outside_is_two_half_spaces() {
  let sets = sets_for([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0], false);
  assert_eq!(sets.len(), 2);
  assert_covered(&sets, &[DVec3::new(2.0, 0.0, 0.0), DVec3::new(-2.0, 1.0, 1.0)]);
}

#[test]
fn single_plane_from_linear_terms() {
  // z >= 4 encoded as the quadric J z + K with no quadratic part.
  let sets = sets_for([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, -4.0], false);
  assert_eq!(sets.len(), 1);
  assert_eq!(sets[0].len(), 1);
  assert_covered(&sets, &[DVec3::new(0.0, 0.0, 5.0)]);
  assert!(!sets[0][0].is_forward(DVec3::new(0.0, 0.0, 3.0)));
}

#[test]
fn rotated_ellipsoid_bounds_rotate_with_it() {
  // Start from the axis-aligned ellipsoid, rotate 45 degrees about z,
  // and check the transformed bounding box still covers it.
  let mut q = Quadric::new([0.25, 1.0 / 9.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0]);
  let rot = crate::math::rotation_about(DVec3::Z, std::f64::consts::FRAC_PI_4);
  let m = crate::math::Affine::from_parts(rot, DVec3::new(1.0, 1.0, 0.0));
  q.transform(&m);
  let sets = bounding_planes(&q, "rot", true).unwrap();
  assert_eq!(sets.len(), 1);
  // Sample points on the rotated surface's inside.
  for p in [
    DVec3::new(1.9, 0.0, 0.0),
    DVec3::new(0.0, 2.9, 0.0),
    DVec3::new(0.0, 0.0, 0.9),
  ] {
    let moved = m.apply_point(p);
    assert!(
      sets[0].iter().all(|pl| pl.is_forward(moved)),
      "interior point {moved:?} escapes"
    );
  }
}

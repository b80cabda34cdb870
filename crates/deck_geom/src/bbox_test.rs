use std::sync::atomic::{AtomicBool, Ordering};

use glam::DVec3;
use smallvec::smallvec;

use super::*;
use crate::surface::whole_space;

fn boxed(x0: f64, x1: f64, y0: f64, y1: f64, z0: f64, z1: f64) -> BoundingBox {
  BoundingBox::new(x0, x1, y0, y1, z0, z1)
}

fn pl(n: DVec3, d: f64) -> Plane {
  Plane::new(n, d).unwrap()
}

/// Inward-facing planes of an axis box, one conjunction.
fn box_planes(x0: f64, x1: f64, y0: f64, y1: f64, z0: f64, z1: f64) -> PlaneSets {
  vec![smallvec![
    pl(DVec3::X, x0),
    pl(-DVec3::X, -x1),
    pl(DVec3::Y, y0),
    pl(-DVec3::Y, -y1),
    pl(DVec3::Z, z0),
    pl(-DVec3::Z, -z1),
  ]]
}

#[test]
fn set_algebra_laws() {
  let b = boxed(0.0, 2.0, -1.0, 1.0, 5.0, 9.0);
  let u = BoundingBox::universal();
  let e = BoundingBox::empty();
  assert!(is_same_bb(&BoundingBox::and(&b, &b), &b));
  assert!(is_same_bb(&BoundingBox::or(&b, &b), &b));
  assert!(is_same_bb(&BoundingBox::and(&b, &u), &b));
  assert!(is_same_bb(&BoundingBox::or(&b, &e), &b));
  assert!(is_same_bb(&BoundingBox::or(&e, &b), &b));

  // AND distributes over OR up to normalization (hull containment).
  let c = boxed(1.0, 3.0, 0.0, 2.0, 6.0, 10.0);
  let d = boxed(-1.0, 0.5, -2.0, 0.0, 4.0, 7.0);
  let lhs = BoundingBox::and(&b, &BoundingBox::or(&c, &d));
  let rhs = BoundingBox::or(&BoundingBox::and(&b, &c), &BoundingBox::and(&b, &d));
  assert!(lhs.contains(&rhs) || is_same_bb(&lhs, &rhs));
}

#[test]
fn and_of_disjoint_boxes_is_empty() {
  let a = boxed(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
  let b = boxed(5.0, 6.0, 0.0, 1.0, 0.0, 1.0);
  assert!(BoundingBox::and(&a, &b).is_empty());
}

#[test]
fn from_points_ladder() {
  // No points: empty. One point: universal.
  assert!(BoundingBox::from_points(&[]).is_empty());
  assert!(BoundingBox::from_points(&[DVec3::ONE]).is_universal(true));

  // Axis-parallel collinear points bound one axis only.
  let line_x = [
    DVec3::new(0.0, 0.0, 0.0),
    DVec3::new(5.0, 0.0, 0.0),
    DVec3::new(2.0, 0.0, 0.0),
  ];
  let bb = BoundingBox::from_points(&line_x);
  assert!((bb.xmin - 0.0).abs() < 1e-12 && (bb.xmax - 5.0).abs() < 1e-12);
  assert!(bb.ymax >= crate::constants::MAX_EXTENT);

  // Skew collinear points: universal.
  let skew = [
    DVec3::new(0.0, 0.0, 0.0),
    DVec3::new(1.0, 1.0, 0.0),
    DVec3::new(2.0, 2.0, 0.0),
  ];
  assert!(BoundingBox::from_points(&skew).is_universal(true));

  // Coplanar, axis-aligned plane: the normal axis stays open.
  let plane_z = [
    DVec3::new(0.0, 0.0, 1.0),
    DVec3::new(4.0, 0.0, 1.0),
    DVec3::new(0.0, 3.0, 1.0),
    DVec3::new(4.0, 3.0, 1.0),
  ];
  let bb = BoundingBox::from_points(&plane_z);
  assert!((bb.xmax - 4.0).abs() < 1e-12 && (bb.ymax - 3.0).abs() < 1e-12);
  assert!(bb.zmax >= crate::constants::MAX_EXTENT && bb.zmin <= -crate::constants::MAX_EXTENT);

  // A full point cloud: the classical min/max box.
  let cloud = [
    DVec3::new(0.0, 0.0, 0.0),
    DVec3::new(1.0, 0.0, 0.0),
    DVec3::new(0.0, 2.0, 0.0),
    DVec3::new(0.0, 0.0, 3.0),
  ];
  let bb = BoundingBox::from_points(&cloud);
  assert!(is_same_bb(&bb, &boxed(0.0, 1.0, 0.0, 2.0, 0.0, 3.0)));
}

#[test]
fn from_planes_closed_box() {
  let bb = BoundingBox::from_planes(None, &box_planes(0.0, 10.0, 0.0, 10.0, 0.0, 10.0)).unwrap();
  assert!(is_same_bb(&bb, &boxed(0.0, 10.0, 0.0, 10.0, 0.0, 10.0)));
}

#[test]
fn from_planes_union_of_two_boxes() {
  let mut sets = box_planes(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
  sets.extend(box_planes(5.0, 6.0, 0.0, 1.0, 0.0, 1.0));
  let bb = BoundingBox::from_planes(None, &sets).unwrap();
  assert!(is_same_bb(&bb, &boxed(0.0, 6.0, 0.0, 1.0, 0.0, 1.0)));
}

#[test]
fn from_planes_unbounded_axis_parallel_prism() {
  // Four side planes, no caps: infinite along z but clipped in x/y.
  let sets: PlaneSets = vec![smallvec![
    pl(DVec3::X, 0.0),
    pl(-DVec3::X, -4.0),
    pl(DVec3::Y, 0.0),
    pl(-DVec3::Y, -2.0),
  ]];
  let bb = BoundingBox::from_planes(None, &sets).unwrap();
  assert!((bb.xmax - 4.0).abs() < 1e-9);
  assert!((bb.ymax - 2.0).abs() < 1e-9);
  assert!(bb.zmax >= crate::constants::MAX_EXTENT);
}

#[test]
fn from_planes_oblique_unbounded_prism() {
  // Four planes forming an infinite slanted prism: no three-plane
  // vertex exists, but the far-plane closure proves the region is
  // inhabited, and the axis-parallel members still clip y.
  let diag = DVec3::new(1.0, 0.0, 1.0).normalize();
  let sets: PlaneSets = vec![smallvec![
    pl(diag, -1.0),
    pl(-diag, -1.0),
    pl(DVec3::Y, -1.0),
    pl(-DVec3::Y, -1.0),
  ]];
  let bb = BoundingBox::from_planes(None, &sets).unwrap();
  assert!(bb.xmax >= crate::constants::MAX_EXTENT);
  assert!(bb.zmax >= crate::constants::MAX_EXTENT);
  assert!((bb.ymin + 1.0).abs() < 1e-9);
  assert!((bb.ymax - 1.0).abs() < 1e-9);
}

#[test]
fn from_planes_whole_space_sentinel() {
  let bb = BoundingBox::from_planes(None, &whole_space()).unwrap();
  assert!(bb.is_universal(true));
}

#[test]
fn from_planes_empty_conjunction_list_is_universal() {
  let bb = BoundingBox::from_planes(None, &PlaneSets::new()).unwrap();
  assert!(bb.is_universal(true));
}

#[test]
fn timeout_flag_aborts() {
  let flag = AtomicBool::new(true);
  let err = BoundingBox::from_planes(Some(&flag), &box_planes(0.0, 1.0, 0.0, 1.0, 0.0, 1.0));
  assert!(matches!(err, Err(Error::Timeout)));
  flag.store(false, Ordering::Relaxed);
  assert!(BoundingBox::from_planes(Some(&flag), &box_planes(0.0, 1.0, 0.0, 1.0, 0.0, 1.0)).is_ok());
}

#[test]
fn merge_and_concatenates_and_dedups() {
  let a = box_planes(0.0, 2.0, 0.0, 2.0, 0.0, 2.0);
  // Second set shares one identical plane and adds another.
  let b: PlaneSets = vec![smallvec![pl(DVec3::X, 0.0), pl(DVec3::Z, 1.0)]];
  let merged = merge_plane_vectors_and(None, &a, &b).unwrap();
  assert_eq!(merged.len(), 1);
  // 6 + 2 with one duplicate.
  assert_eq!(merged[0].len(), 7);
}

#[test]
fn merge_and_drops_contradictory_conjunctions() {
  // x >= 1 AND x <= 1 at the same position with opposite normals
  // makes a degenerate slab; the conjunction disappears.
  let a: PlaneSets = vec![smallvec![pl(DVec3::X, 1.0)]];
  let b: PlaneSets = vec![smallvec![pl(-DVec3::X, -1.0)]];
  let merged = merge_plane_vectors_and(None, &a, &b).unwrap();
  assert!(merged.is_empty());
}

#[test]
fn merge_and_empty_side_passes_through() {
  let a = box_planes(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
  let merged = merge_plane_vectors_and(None, &PlaneSets::new(), &a).unwrap();
  assert_eq!(merged.len(), a.len());
}

#[test]
fn transform_rebuilds_from_corners() {
  let mut bb = boxed(0.0, 1.0, 0.0, 1.0, 0.0, 1.0);
  let rot = crate::math::rotation_about(DVec3::Z, std::f64::consts::FRAC_PI_2);
  bb.transform(&crate::math::Affine::from_parts(rot, DVec3::new(10.0, 0.0, 0.0)));
  // Rotated into the y axis, translated along x.
  assert!((bb.xmin - 9.0).abs() < 1e-9 || (bb.xmin - 10.0).abs() < 1e-9);
  assert!(bb.ymax <= 1.0 + 1e-9);
}

#[test]
fn expand_scales_about_the_center() {
  let mut bb = boxed(0.0, 2.0, 0.0, 2.0, 0.0, 2.0);
  bb.expand(2.0);
  assert!(is_same_bb(&bb, &boxed(-1.0, 3.0, -1.0, 3.0, -1.0, 3.0)));
}

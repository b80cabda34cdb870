use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;

use glam::DVec3;

use super::*;
use crate::bbox::BoundingBox;
use crate::constants::MAX_EXTENT;
use crate::input::cell_card::CellCard;
use crate::surface::{Plane, Surface, SurfaceBody, SurfaceMap};

fn bb(x0: f64, x1: f64, y0: f64, y1: f64, z0: f64, z1: f64) -> BoundingBox {
  BoundingBox::new(x0, x1, y0, y1, z0, z1)
}

#[test]
fn rectangular_2d_ranges() {
  let center = DVec3::new(3.75, 2.5, 0.0);
  let vectors = [DVec3::new(5.0, 0.0, 0.0), DVec3::new(2.5, 5.0, 0.0)];
  let outer = bb(-6.0, 13.0, -23.0, -8.0, -100.0, 100.0);
  let ranges = calc_dimension_declarator(2, center, &vectors, &outer).unwrap();
  assert_eq!(ranges, [(-1, 4), (-5, -2), (0, 0)]);
}

#[test]
fn rectangular_2d_translation_invariance() {
  let shift = DVec3::new(10.0, 20.0, 5.0);
  let center = DVec3::new(3.75, 2.5, 0.0) + shift;
  let vectors = [DVec3::new(5.0, 0.0, 0.0), DVec3::new(2.5, 5.0, 0.0)];
  let mut outer = bb(-6.0, 13.0, -23.0, -8.0, -100.0, 100.0);
  outer.translate(shift);
  let ranges = calc_dimension_declarator(2, center, &vectors, &outer).unwrap();
  assert_eq!(ranges, [(-1, 4), (-5, -2), (0, 0)]);
}

#[test]
fn rectangular_2d_with_unbounded_axis() {
  let center = DVec3::new(3.75, 2.5, 0.0);
  let vectors = [DVec3::new(5.0, 0.0, 0.0), DVec3::new(2.5, 5.0, 0.0)];
  // Unbounded z is orthogonal to both index vectors: fine.
  let outer = bb(-6.0, 13.0, -23.0, -8.0, -MAX_EXTENT, MAX_EXTENT);
  let ranges = calc_dimension_declarator(2, center, &vectors, &outer).unwrap();
  assert_eq!(ranges, [(-1, 4), (-5, -2), (0, 0)]);

  // Tilted vectors see the unbounded axis: infinite lattice.
  let tilted = [DVec3::new(5.0, 0.0, 0.1), DVec3::new(2.5, 5.0, 0.1)];
  assert!(matches!(
    calc_dimension_declarator(2, center, &tilted, &outer),
    Err(crate::error::Error::InfiniteLattice)
  ));
}

#[test]
fn hexagonal_2d_ranges() {
  let center = DVec3::ZERO;
  let vectors = [
    DVec3::new(10.0, 4.0, 0.0),
    DVec3::new(6.0, 14.0, 0.0),
    DVec3::new(-4.0, 10.0, 0.0),
  ];
  let outer = bb(10.0, 40.0, -10.0, 18.0, -18.5, -6.5);
  let ranges = calc_dimension_declarator(2, center, &vectors, &outer).unwrap();
  assert_eq!(ranges, [(0, 5), (-2, 1), (0, 0)]);
}

#[test]
fn hexagonal_2d_unbounded_axis() {
  let center = DVec3::ZERO;
  let vectors = [
    DVec3::new(10.0, 4.0, 0.0),
    DVec3::new(6.0, 14.0, 0.0),
    DVec3::new(-4.0, 10.0, 0.0),
  ];
  let outer = bb(10.0, 40.0, -10.0, 18.0, -MAX_EXTENT, MAX_EXTENT);
  let ranges = calc_dimension_declarator(2, center, &vectors, &outer).unwrap();
  assert_eq!(ranges, [(0, 5), (-2, 1), (0, 0)]);

  let tilted = [
    DVec3::new(10.0, 4.0, 0.1),
    DVec3::new(6.0, 14.0, 0.1),
    DVec3::new(-4.0, 10.0, 0.1),
  ];
  assert!(calc_dimension_declarator(2, center, &tilted, &outer).is_err());
}

#[test]
fn hexagonal_3d_ranges() {
  let center = DVec3::ZERO;
  let vectors = [
    DVec3::new(10.0, 4.0, 0.0),
    DVec3::new(6.0, 14.0, 0.0),
    DVec3::new(-4.0, 10.0, 0.0),
    DVec3::new(0.0, 0.0, -5.0),
  ];
  let outer = bb(10.0, 40.0, -10.0, 18.0, -18.5, -6.5);
  let ranges = calc_dimension_declarator(3, center, &vectors, &outer).unwrap();
  assert_eq!(ranges, [(0, 5), (-2, 1), (1, 4)]);
}

#[test]
fn dimension_declarator_coverage() {
  // Every vertex of the outer box must land inside the union of
  // translated base cells: its basis coordinates rounded lie within
  // the computed ranges.
  let center = DVec3::ZERO;
  let vectors = [
    DVec3::new(10.0, 4.0, 0.0),
    DVec3::new(6.0, 14.0, 0.0),
    DVec3::new(-4.0, 10.0, 0.0),
  ];
  let outer = bb(10.0, 40.0, -10.0, 18.0, -18.5, -6.5);
  let ranges = calc_dimension_declarator(2, center, &vectors, &outer).unwrap();
  let third = vectors[0].cross(vectors[1]).normalize();
  let mat = crate::math::Mat3::from_rows(vectors[0], vectors[1], third);
  for pt in outer.vertices() {
    let res = (pt - center) * mat.inverse();
    let i = res.x.round() as i32;
    let j = res.y.round() as i32;
    assert!(
      ranges[0].0 <= i && i <= ranges[0].1,
      "vertex {pt:?} falls outside the i range"
    );
    assert!(ranges[1].0 <= j && j <= ranges[1].1);
  }
}

#[test]
fn excess_index_fails() {
  let center = DVec3::ZERO;
  let vectors = [DVec3::new(0.001, 0.0, 0.0), DVec3::new(0.0, 0.001, 0.0)];
  let outer = bb(-50.0, 50.0, -50.0, 50.0, 0.0, 1.0);
  assert!(matches!(
    calc_dimension_declarator(2, center, &vectors, &outer),
    Err(crate::error::Error::ExcessMaxIndex)
  ));
}

fn lattice_fixture() -> (Arc<SurfaceMap>, CellCard) {
  let map = Arc::new(SurfaceMap::new());
  // Unit cell: 0 <= x <= 5, 0 <= y <= 5 (ids 1..4 in pair order).
  for (name, n, d) in [
    ("11", DVec3::X, 5.0),
    ("12", DVec3::X, 0.0),
    ("13", DVec3::Y, 5.0),
    ("14", DVec3::Y, 0.0),
  ] {
    map
      .register(Surface::new(name, SurfaceBody::Plane(Plane::new(n, d).unwrap())).unwrap())
      .unwrap();
  }
  let lattice = CellCard::parse("9 0 -11 12 -13 14 u=5 lat=1 fill=6").unwrap();
  (map, lattice)
}

#[test]
fn lattice_basis_from_plane_pairs() {
  let (map, lattice) = lattice_fixture();
  let (dim, vectors, center) = lattice_basis(&lattice, &map).unwrap();
  assert_eq!(dim, 2);
  assert_eq!(vectors.len(), 2);
  // First pair: "-11 12" opens toward +x with pitch 5.
  assert!((vectors[0] - DVec3::new(5.0, 0.0, 0.0)).length() < 1e-9);
  assert!((vectors[1] - DVec3::new(0.0, 5.0, 0.0)).length() < 1e-9);
  assert!((center - DVec3::new(2.5, 2.5, 0.0)).length() < 1e-9);
}

#[test]
fn lattice_basis_rejects_odd_layouts() {
  let map = Arc::new(SurfaceMap::new());
  map
    .register(
      Surface::new("1", SurfaceBody::Plane(Plane::new(DVec3::X, 1.0).unwrap())).unwrap(),
    )
    .unwrap();
  let card = CellCard::parse("9 0 -1 lat=1 fill=6").unwrap();
  assert!(lattice_basis(&card, &map).is_err());
}

fn test_ctx<'a>(
  tr_map: &'a HashMap<usize, crate::math::Affine>,
  smap: &'a Arc<SurfaceMap>,
  counter: &'a AtomicUsize,
  cancel: Option<&'a AtomicBool>,
) -> FillContext<'a> {
  FillContext {
    tr_map,
    smap,
    cancel,
    timeout: None,
    counter,
    threads: 2,
  }
}

#[test]
fn translate_equation_renames_surfaces() {
  let (map, lattice) = lattice_fixture();
  let tr_map = HashMap::new();
  let counter = AtomicUsize::new(0);
  let ctx = test_ctx(&tr_map, &map, &counter, None);
  let eq = translate_equation(&lattice.equation, "5 0 0", "9[1,0,0]", &ctx).unwrap();
  assert_eq!(eq, "-11_t9[1,0,0] 12_t9[1,0,0] -13_t9[1,0,0] 14_t9[1,0,0]");
  // The copy moved: plane 11 was x = 5, its copy is x = 10.
  let moved = map.by_name("11_t9[1,0,0]").unwrap();
  assert!(moved.is_forward(DVec3::new(11.0, 0.0, 0.0)));
  assert!(!moved.is_forward(DVec3::new(9.0, 0.0, 0.0)));
}

#[test]
fn expand_lattice_generates_and_prunes_elements() {
  let (map, lattice) = lattice_fixture();
  let tr_map = HashMap::new();
  let counter = AtomicUsize::new(0);
  let ctx = test_ctx(&tr_map, &map, &counter, None);

  let container = CellCard::parse("90 0 -900 fill=5").unwrap();
  let container_bb = bb(0.5, 9.5, 0.5, 4.5, -50.0, 50.0);
  let base_bb = bb(0.0, 5.0, 0.0, 5.0, -MAX_EXTENT, MAX_EXTENT);
  let entries = vec![crate::input::cell_card::FillEntry {
    universe: "6".into(),
    tr: None,
  }];
  let vectors = [DVec3::new(5.0, 0.0, 0.0), DVec3::new(0.0, 5.0, 0.0)];
  // Declared wider than the window on j: the pruning drops rows that
  // cannot overlap the container.
  let elements = expand_lattice(
    Some(&container),
    &container_bb,
    "",
    &lattice,
    [(0, 1), (-1, 0), (0, 0)],
    &entries,
    &vectors,
    &base_bb,
    &ctx,
  )
  .unwrap();

  // j = -1 lies fully below the window; only j = 0 survives.
  assert_eq!(elements.len(), 2);
  let names: Vec<&str> = elements.iter().map(|c| c.name.as_str()).collect();
  assert!(names.contains(&"9[0,0,0]<90"));
  assert!(names.contains(&"9[1,0,0]<90"));
  for element in &elements {
    assert!(element.equation.contains("(-900)") || element.equation.ends_with("(-900)"));
    assert!(!element.parameters.contains_key("lat"));
    // Filled with universe 6, shifted.
    assert!(element.parameters.get("fill").unwrap().starts_with('6'));
  }
  assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 2);
}

#[test]
fn expand_lattice_respects_cancel() {
  let (map, lattice) = lattice_fixture();
  let tr_map = HashMap::new();
  let counter = AtomicUsize::new(0);
  let cancel = AtomicBool::new(true);
  let ctx = test_ctx(&tr_map, &map, &counter, Some(&cancel));
  let entries = vec![crate::input::cell_card::FillEntry {
    universe: "5".into(),
    tr: None,
  }];
  let vectors = [DVec3::new(5.0, 0.0, 0.0), DVec3::new(0.0, 5.0, 0.0)];
  let out = expand_lattice(
    None,
    &BoundingBox::universal(),
    "",
    &lattice,
    [(0, 3), (0, 3), (0, 0)],
    &entries,
    &vectors,
    &bb(0.0, 5.0, 0.0, 5.0, 0.0, 1.0),
    &ctx,
  );
  assert!(matches!(out, Err(crate::error::Error::Cancelled)));
}

#[test]
fn simple_fill_clips_and_renames() {
  let map = Arc::new(SurfaceMap::new());
  for (name, n, d) in [("1", DVec3::X, 1.0), ("2", DVec3::Y, 1.0)] {
    map
      .register(Surface::new(name, SurfaceBody::Plane(Plane::new(n, d).unwrap())).unwrap())
      .unwrap();
  }
  let tr_map = HashMap::new();
  let counter = AtomicUsize::new(0);
  let ctx = test_ctx(&tr_map, &map, &counter, None);

  let outer = CellCard::parse("out 0 -2 fill=7").unwrap();
  let inner = CellCard::parse("in 3 -1.0 -1 u=7").unwrap();
  let entry = crate::input::cell_card::FillEntry {
    universe: "7".into(),
    tr: Some("5 0 0".into()),
  };
  let cell = expand_simple_inner(&outer, &entry, &inner, &ctx).unwrap();
  assert_eq!(cell.name, "in<out");
  // The transformed-surface anchor is the deepest hierarchy level.
  assert_eq!(cell.equation, "(-1_tout) (-2)");
  assert!(!cell.parameters.contains_key("u"));
  assert_eq!(cell.material, "3");
  // The inner surface moved by the fill transform: x = 1 became x = 6.
  let moved = map.by_name("1_tout").unwrap();
  assert!(moved.implicit(DVec3::new(6.0, 0.0, 0.0)).abs() < 1e-9);
  assert!(moved.implicit(DVec3::new(1.0, 0.0, 0.0)) < 0.0);
}

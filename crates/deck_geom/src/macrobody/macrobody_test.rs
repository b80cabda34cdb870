use std::collections::HashMap;

use glam::DVec3;

use super::*;
use crate::input::DataLine;
use crate::surface::SurfaceBody;

fn expand_lines(surfaces: &[&str]) -> (Vec<DataLine>, Vec<Expansion>) {
  let tr_map = HashMap::new();
  let mut lines: Vec<DataLine> = surfaces
    .iter()
    .enumerate()
    .map(|(i, s)| DataLine::new("t", i as u64 + 1, *s))
    .collect();
  let expansions = expand_in_surface_list(&tr_map, &mut lines).unwrap();
  (lines, expansions)
}

fn parse_surface(line: &DataLine) -> crate::surface::Surface {
  let card = crate::input::surface_card::SurfaceCard::parse(&line.data, false, true).unwrap();
  crate::surface::Surface::from_card(
    &card.name,
    &card.symbol,
    &card.params,
    &crate::math::Affine::IDENTITY,
  )
  .unwrap()
}

#[test]
fn rpp_expands_to_six_outward_planes() {
  let (lines, expansions) = expand_lines(&["B rpp 0 10 0 10 0 10"]);
  assert_eq!(expansions.len(), 1);
  assert_eq!(expansions[0].symbol, "rpp");
  assert_eq!(lines.len(), 6);
  let names: Vec<String> = lines
    .iter()
    .map(|l| l.data.split_whitespace().next().unwrap().to_string())
    .collect();
  assert_eq!(names, vec!["B.1", "B.2", "B.3", "B.4", "B.5", "B.6"]);
  // All six face outward: the body center is behind every plane.
  let center = DVec3::new(5.0, 5.0, 5.0);
  for line in &lines {
    let s = parse_surface(line);
    assert!(!s.is_forward(center), "{}", line.data);
  }
}

#[test]
fn rpp_substitution_in_cell_equations() {
  let (_, expansions) = expand_lines(&["B rpp 0 10 0 10 0 10"]);
  let mut cells = vec![
    DataLine::new("t", 1, "1 0 -B"),
    DataLine::new("t", 2, "2 0 B"),
  ];
  replace_in_cell_list(&expansions, &mut cells).unwrap();
  let c1 = crate::input::cell_card::CellCard::parse(&cells[0].data).unwrap();
  assert_eq!(c1.equation, "(-B.1 -B.2 -B.3 -B.4 -B.5 -B.6)");
  let c2 = crate::input::cell_card::CellCard::parse(&cells[1].data).unwrap();
  assert_eq!(c2.equation, "(B.1:B.2:B.3:B.4:B.5:B.6)");
}

#[test]
fn substitution_matches_whole_names_only() {
  let (_, expansions) = expand_lines(&["2 rpp 0 1 0 1 0 1"]);
  let mut cells = vec![DataLine::new("t", 1, "1 0 -12 -2 22")];
  replace_in_cell_list(&expansions, &mut cells).unwrap();
  let c = crate::input::cell_card::CellCard::parse(&cells[0].data).unwrap();
  assert_eq!(c.equation, "-12 (-2.1 -2.2 -2.3 -2.4 -2.5 -2.6) 22");
}

#[test]
fn sph_and_ell_keep_their_names() {
  let (lines, expansions) = expand_lines(&[
    "S sph 1 2 3 4",
    "E ell 0 0 -2 0 0 2 6",
  ]);
  assert_eq!(lines.len(), 2);
  assert!(lines[0].data.starts_with("S s"));
  assert!(lines[1].data.starts_with("E gq"));
  // No cell-side rewriting for single-surface bodies.
  let mut cells = vec![DataLine::new("t", 1, "1 0 -S -E")];
  replace_in_cell_list(&expansions, &mut cells).unwrap();
  assert_eq!(cells[0].data, "1 0 -S -E");
}

#[test]
fn ell_positive_seventh_parameter_is_the_major_radius() {
  // Foci at z = -2 and z = 2, semi-major radius 6 along z.
  let (lines, _) = expand_lines(&["E ell 0 0 -2 0 0 2 6"]);
  let s = parse_surface(&lines[0]);
  // Major apex at z = 6; the foci restretch to z = +-4, so the minor
  // radius is sqrt(36 - 16).
  assert!(s.implicit(DVec3::new(0.0, 0.0, 6.0)).abs() < 1e-6);
  let minor = (36.0_f64 - 16.0).sqrt();
  assert!(s.implicit(DVec3::new(minor, 0.0, 0.0)).abs() < 1e-6);
  assert!(!s.is_forward(DVec3::ZERO));
  assert!(s.is_forward(DVec3::new(0.0, 0.0, 7.0)));
}

#[test]
fn ell_negative_seventh_parameter_is_the_minor_radius() {
  // Center at origin, major semi-axis 3 along z, minor radius 2.
  let (lines, _) = expand_lines(&["E ell 0 0 0 0 0 3 -2"]);
  let s = parse_surface(&lines[0]);
  assert!(s.implicit(DVec3::new(0.0, 0.0, 3.0)).abs() < 1e-6);
  assert!(s.implicit(DVec3::new(2.0, 0.0, 0.0)).abs() < 1e-6);
  assert!(!s.is_forward(DVec3::ZERO));
}

#[test]
fn rcc_produces_cylinder_and_caps() {
  let (lines, _) = expand_lines(&["C rcc 0 0 0 0 0 8 2"]);
  assert_eq!(lines.len(), 3);
  let shell = parse_surface(&lines[0]);
  assert!(matches!(shell.body(), SurfaceBody::Cylinder(_)));
  assert!(shell.implicit(DVec3::new(2.0, 0.0, 4.0)).abs() < 1e-9);
  let top = parse_surface(&lines[1]);
  assert!(top.is_forward(DVec3::new(0.0, 0.0, 9.0)));
  assert!(!top.is_forward(DVec3::new(0.0, 0.0, 7.0)));
  let bottom = parse_surface(&lines[2]);
  assert!(bottom.is_forward(DVec3::new(0.0, 0.0, -1.0)));
}

#[test]
fn trc_cone_shell_covers_the_frustum() {
  // Base at origin radius 4, top at z = 4 radius 2.
  let (lines, _) = expand_lines(&["T trc 0 0 0 0 0 4 4 2"]);
  assert_eq!(lines.len(), 3);
  let shell = parse_surface(&lines[0]);
  assert!(matches!(shell.body(), SurfaceBody::Cone(_)));
  // On the slant: radius 3 at z = 2.
  assert!(shell.implicit(DVec3::new(3.0, 0.0, 2.0)).abs() < 1e-9);
  assert!(!shell.is_forward(DVec3::new(0.0, 0.0, 2.0)));
  assert!(shell.is_forward(DVec3::new(5.0, 0.0, 2.0)));
}

#[test]
fn rec_elliptic_cylinder() {
  // Axis z, major 3 along x, minor 2 (derived from the 10-param form).
  let (lines, _) = expand_lines(&["R rec 0 0 0 0 0 6 3 0 0 2"]);
  let shell = parse_surface(&lines[0]);
  assert!(shell.implicit(DVec3::new(3.0, 0.0, 1.0)).abs() < 1e-6);
  assert!(shell.implicit(DVec3::new(0.0, 2.0, 5.0)).abs() < 1e-6);
  assert!(!shell.is_forward(DVec3::ZERO));
  // Non-orthogonal axes are fatal.
  let tr_map = HashMap::new();
  let mut bad = vec![DataLine::new("t", 1, "R rec 0 0 0 0 0 6 3 0 1 2")];
  assert!(expand_in_surface_list(&tr_map, &mut bad).is_err());
}

#[test]
fn wed_five_planes_enclose_the_wedge() {
  let (lines, _) = expand_lines(&["W wed 0 0 0  4 0 0  0 3 0  0 0 2"]);
  assert_eq!(lines.len(), 5);
  // A point well inside the wedge is behind every face.
  let inside = DVec3::new(0.5, 0.5, 1.0);
  for line in &lines {
    let s = parse_surface(line);
    assert!(!s.is_forward(inside), "{}", line.data);
  }
  // Beyond the hypotenuse.
  let outside = DVec3::new(3.0, 3.0, 1.0);
  let hypo = parse_surface(&lines[0]);
  assert!(hypo.is_forward(outside));
}

#[test]
fn rhp_nine_parameter_form_closes_the_prism() {
  let (lines, _) = expand_lines(&["H rhp 0 0 0  0 0 10  2 0 0"]);
  assert_eq!(lines.len(), 8);
  let inside = DVec3::new(0.0, 0.0, 5.0);
  for line in &lines {
    let s = parse_surface(line);
    assert!(!s.is_forward(inside), "{}", line.data);
  }
}

#[test]
fn arb_reorients_faces_outward() {
  // Tetrahedron over vertices 1-4, remaining vertex slots zeroed.
  let (lines, _) = expand_lines(&[
    "A arb 0 0 0  4 0 0  0 4 0  0 0 4  0 0 0  0 0 0  0 0 0  0 0 0 \
     124 134 123 234 0 0",
  ]);
  assert_eq!(lines.len(), 6);
  let inside = DVec3::new(0.5, 0.5, 0.5);
  for line in &lines {
    let s = parse_surface(line);
    assert!(!s.is_forward(inside), "{}", line.data);
  }
}

#[test]
fn tor_expands_to_torus_and_three_angular_planes() {
  let (lines, expansions) = expand_lines(&["T tor 0 0 0  10 2 2  3  0 90"]);
  assert_eq!(lines.len(), 4);
  let torus = parse_surface(&lines[0]);
  assert!(matches!(torus.body(), SurfaceBody::Torus(_)));
  for line in &lines[1..] {
    let s = parse_surface(line);
    assert!(matches!(s.body(), SurfaceBody::Plane(_)), "{}", line.data);
  }

  // The substitution is the two-piece convex split.
  let mut cells = vec![DataLine::new("t", 1, "1 0 -T")];
  replace_in_cell_list(&expansions, &mut cells).unwrap();
  let c = crate::input::cell_card::CellCard::parse(&cells[0].data).unwrap();
  assert_eq!(c.equation, "((-T.1 T.2 -T.4):(-T.1 T.4 -T.3))");

  let mut cells = vec![DataLine::new("t", 1, "2 0 T")];
  replace_in_cell_list(&expansions, &mut cells).unwrap();
  let c = crate::input::cell_card::CellCard::parse(&cells[0].data).unwrap();
  assert_eq!(c.equation, "((T.1:-T.2:T.4) (T.1:-T.4:T.3))");
}

#[test]
fn axis_symmetric_two_points_make_plane_or_cone_or_cylinder() {
  // Same radius twice: a cylinder about x.
  let (lines, _) = expand_lines(&["1 x 2 3 7 3"]);
  let s = parse_surface(&lines[0]);
  assert!(matches!(s.body(), SurfaceBody::Cylinder(_)));
  assert!(s.implicit(DVec3::new(5.0, 3.0, 0.0)).abs() < 1e-9);

  // Same coordinate twice: a plane.
  let (lines, _) = expand_lines(&["2 y 4 1 4 9"]);
  let s = parse_surface(&lines[0]);
  assert!(matches!(s.body(), SurfaceBody::Plane(_)));
  assert!(s.implicit(DVec3::new(0.0, 4.0, 0.0)).abs() < 1e-9);

  // Different radii: a cone through both samples.
  let (lines, _) = expand_lines(&["3 x 1 1 3 2"]);
  let s = parse_surface(&lines[0]);
  assert!(matches!(s.body(), SurfaceBody::Cone(_)));
  assert!(s.implicit(DVec3::new(1.0, 1.0, 0.0)).abs() < 1e-9);
  assert!(s.implicit(DVec3::new(3.0, 0.0, 2.0)).abs() < 1e-9);
}

#[test]
fn axis_symmetric_three_points_make_a_quadric() {
  // r^2 = 1 + s^2 around x: a hyperboloid sampled at s = -1, 0, 1.
  let rt2 = 2.0_f64.sqrt();
  let card = format!("4 x -1 {rt2} 0 1 1 {rt2}");
  let (lines, _) = expand_lines(&[card.as_str()]);
  let s = parse_surface(&lines[0]);
  assert!(matches!(s.body(), SurfaceBody::Quadric(_)));
  for p in [
    DVec3::new(0.0, 1.0, 0.0),
    DVec3::new(1.0, rt2, 0.0),
    DVec3::new(-1.0, 0.0, rt2),
  ] {
    assert!(s.implicit(p).abs() < 1e-9, "{p:?}");
  }
}

#[test]
fn tr_matrix_applies_to_expanded_surfaces() {
  let mut tr_map = HashMap::new();
  tr_map.insert(
    2usize,
    crate::math::Affine::from_translation(DVec3::new(0.0, 0.0, 100.0)),
  );
  let mut lines = vec![DataLine::new("t", 1, "B 2 rpp 0 1 0 1 0 1")];
  expand_in_surface_list(&tr_map, &mut lines).unwrap();
  // The z-max plane moved to 101.
  let top = lines
    .iter()
    .find(|l| l.data.starts_with("B.5"))
    .expect("B.5 generated");
  let s = parse_surface(top);
  assert!(s.implicit(DVec3::new(0.5, 0.5, 101.0)).abs() < 1e-9);
}

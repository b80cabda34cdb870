use std::collections::HashMap;

use super::*;

fn parse(s: &str) -> CellCard {
  CellCard::parse(s).unwrap()
}

#[test]
fn plus_signs_drop_from_the_equation() {
  let card = parse("17  0   -19 +20 imp:n=1");
  assert_eq!(card.equation, "-19 20");
  assert_eq!(card.material, "0");
  assert!(card.density.is_none());
}

#[test]
fn fill_with_inline_transform() {
  let card = parse("17  0   -19 fill=13 (-8.039 8.989 0) imp:n=1");
  assert_eq!(card.parameters.get("fill").unwrap(), "13(-8.039 8.989 0)");
}

#[test]
fn parenthesized_equation_stays_whole() {
  let card = parse("1 0    (-1.1 -1.2 -1.3 -1.4 -1.5 -1.6) fill=1 (11 22 33)  u= 2");
  assert_eq!(card.equation, "(-1.1 -1.2 -1.3 -1.4 -1.5 -1.6)");
  assert_eq!(card.parameters.get("fill").unwrap(), "1(11 22 33)");
  assert_eq!(card.parameters.get("u").unwrap(), "2");
}

#[test]
fn union_equation_and_universe() {
  let card = parse("301   2 -1.0  -91:90    u= 3");
  assert_eq!(card.equation, "-91:90");
  assert_eq!(card.material, "2");
  assert_eq!(card.density, Some(-1.0));
  assert_eq!(card.parameters.get("u").unwrap(), "3");
}

#[test]
fn lattice_fill_universe_count_must_match() {
  assert!(CellCard::parse("101 0 -11 lat=1 fill= -1:1 0:0 0:0 2 2 u=1").is_err());
}

#[test]
fn lattice_fill_canonical_form() {
  let card = parse("7 3 -2.7 -11 12 -13 14 -15 16 u=2 lat=1 imp:p=1 fill=0:0 0:0 0:0 3");
  assert_eq!(card.equation, "-11 12 -13 14 -15 16");
  assert_eq!(card.parameters.get("fill").unwrap(), "0:0 0:0 0:0  3");

  let card = parse("101   0   -10.1 -10.2 -10.3 -10.4 LAT=1 fill= 0:1 -1:0  0:0  12 34  32 21 U=1");
  assert_eq!(card.parameters.get("fill").unwrap(), "0:1 -1:0 0:0  12 34 32 21");

  let card = parse(
    "101   0   -10.1 -10.2 -10.3 -10.4 LAT=1 fill= 0:1 -1:0  0:0  2(10 -20 30) 33  3(7 7 7) 20   U=1",
  );
  assert_eq!(
    card.parameters.get("fill").unwrap(),
    "0:1 -1:0 0:0  2(10 -20 30) 33 3(7 7 7) 20"
  );
}

#[test]
fn starred_fill_marks_every_transform() {
  let card = parse("4 0       -21 *fill=2 (2 4 0) imp:p=1");
  assert_eq!(card.parameters.get("fill").unwrap(), "2(*2 4 0)");

  let card = parse(
    "101   0   -10.1 -10.2 -10.3 -10.4 LAT=1 \
     *fill= 0:1 -1:0  0:0  2  (*{10+10} {-20+1}  {30*abs(0.1)})  31 3(*7 7 7)     12    u=98",
  );
  assert_eq!(card.equation, "-10.1 -10.2 -10.3 -10.4");
  assert_eq!(
    card.parameters.get("fill").unwrap(),
    "0:1 -1:0 0:0  2(*{10+10} {-20+1} {30*abs(0.1)}) 31 3(*7 7 7) 12"
  );
  assert_eq!(card.parameters.get("u").unwrap(), "98");
}

#[test]
fn like_but_records_the_source() {
  let card = parse("C1 like 1 but trcl=(0 0 0) vol = 1 ");
  assert!(card.parameters.contains_key("vol"));
  assert_eq!(card.trcl, "0 0 0");
  assert!(card.equation.is_empty());
  assert_eq!(card.like_cell.as_deref(), Some("1"));
  assert_eq!(card.depends, vec!["1"]);
}

#[test]
fn parameters_before_the_material_are_rejected() {
  assert!(CellCard::parse_at("f", 1, "C1 vol = 1 like 1 but trcl=(0 0 0)", true).is_err());
}

#[test]
fn trcl_accumulates_canonically() {
  let card = parse("1 1 -0.1  -10000.1 -10000.2 trcl=(-10 -10 0)");
  assert_eq!(card.trcl, "-10 -10 0");

  let card = parse(
    "c1  m1  -1.0  -10  vol=1 trcl=(1 1 1) *trcl=(0 0 0  0 -90 -90  90 0 -90  90 {45 + 45} 0, 2 2 2)",
  );
  assert_eq!(
    card.trcl,
    "1 1 1,*0 0 0  0 -90 -90  90 0 -90  90 {45 + 45} 0,*2 2 2"
  );
}

#[test]
fn complement_references_become_dependencies() {
  let card = parse("11 2 -18   #8 #9 #10 imp:n=1 u=1");
  assert_eq!(card.name, "11");
  assert_eq!(card.equation, "#8 #9 #10");
  assert_eq!(card.depends, vec!["8", "9", "10"]);
}

#[test]
fn surface_name_extraction() {
  let names = surface_names("-1 2 3 (4:5) ((-6:7 (8 #9)))");
  let expected: std::collections::HashSet<String> =
    ["1", "2", "3", "4", "5", "6", "7", "8"].iter().map(|s| s.to_string()).collect();
  assert_eq!(names, expected);
}

#[test]
fn braces_in_density() {
  let card = parse("C1 M1 {1.2*00001}   -S1");
  assert_eq!(card.name, "C1");
  assert_eq!(card.material, "M1");
  assert!((card.density.unwrap() - 1.2).abs() < 1e-12);
  assert_eq!(card.equation, "-S1");
}

#[test]
fn roundtrip_through_input_string() {
  let card = parse("3 0 (-1 2):(4 -5) u=7 trcl=(1 0 0)");
  let again = parse(&card.to_input_string());
  assert_eq!(again.equation, card.equation);
  assert_eq!(again.parameters, card.parameters);
  assert_eq!(again.trcl, card.trcl);
}

#[test]
fn fill_spec_parsing() {
  let spec = FillSpec::parse("13(-8.039 8.989 0)").unwrap();
  assert!(spec.ranges.is_none());
  assert_eq!(spec.entries.len(), 1);
  assert_eq!(spec.entries[0].universe, "13");
  assert_eq!(spec.entries[0].tr.as_deref(), Some("-8.039 8.989 0"));

  let spec = FillSpec::parse("0:1 -1:0 0:0  2(10 -20 30) 33 3(7 7 7) 20").unwrap();
  assert_eq!(spec.ranges, Some([(0, 1), (-1, 0), (0, 0)]));
  assert_eq!(spec.entries.len(), 4);
  assert_eq!(spec.element_count(), 4);
  assert_eq!(spec.entries[2].tr.as_deref(), Some("7 7 7"));
}

#[test]
fn dependency_order_with_kahn() {
  let mut cards = vec![
    parse("1 0 -5 #2"),
    parse("2 0 -6"),
    parse("3 like 1 but vol=2"),
  ];
  let universes = HashMap::new();
  let sequence = solve_dependencies(&mut cards, &universes).unwrap();
  // 2 resolves before 1, 1 before 3.
  let pos = |name: &str| sequence.iter().position(|&i| cards[i].name == name).unwrap();
  assert!(pos("2") < pos("1"));
  assert!(pos("1") < pos("3"));
  assert_eq!(cards[1].order, 0);
}

#[test]
fn circular_dependencies_are_reported() {
  let mut cards = vec![parse("1 0 -5 #2"), parse("2 0 -6 #1")];
  let universes = HashMap::new();
  assert!(matches!(
    solve_dependencies(&mut cards, &universes),
    Err(crate::error::Error::CircularReference(_))
  ));
}

#[test]
fn fill_universe_dependencies_count() {
  let mut cards = vec![
    parse("outer 0 -1 fill=9"),
    parse("inner 0 -2 u=9"),
  ];
  let mut universes = HashMap::new();
  universes.insert("9".to_string(), vec!["inner".to_string()]);
  let sequence = solve_dependencies(&mut cards, &universes).unwrap();
  assert_eq!(cards[sequence[0]].name, "inner");
}

#[test]
fn complement_substitution_applies_de_morgan() {
  let mut cards = vec![parse("2 0 -6 7"), parse("1 0 -5 #2")];
  let universes = HashMap::new();
  let sequence = solve_dependencies(&mut cards, &universes).unwrap();
  resolve_complements(&mut cards, &sequence).unwrap();
  assert_eq!(cards[1].equation, "-5 (6:-7)");
}

#[test]
fn like_but_inherits_and_overrides() {
  let mut cards = vec![
    parse("1 2 -1.0 -5 6 u=3 vol=9"),
    parse("C1 like 1 but vol=2 trcl=(0 0 1)"),
  ];
  let universes = HashMap::new();
  let sequence = solve_dependencies(&mut cards, &universes).unwrap();
  resolve_like_but(&mut cards, &sequence).unwrap();
  let c1 = &cards[1];
  assert_eq!(c1.material, "2");
  assert_eq!(c1.density, Some(-1.0));
  assert_eq!(c1.equation, "-5 6");
  assert_eq!(c1.parameters.get("vol").unwrap(), "2");
  assert_eq!(c1.parameters.get("u").unwrap(), "3");
  assert_eq!(c1.trcl, "0 0 1");
  assert!(c1.like_cell.is_none());
}

use super::*;

#[test]
fn number_forms() {
  assert_eq!(TrCard::parse("Tr01 0 0 10", false).unwrap().number(), 1);
  assert_eq!(TrCard::parse("tR1 0 0 10", false).unwrap().number(), 1);
  assert_eq!(TrCard::parse("TR5 0 0 10", false).unwrap().number(), 5);
}

#[test]
fn star_prefix_and_suffix_are_equivalent() {
  let pre = TrCard::parse("*Tr1 0 0 10", false).unwrap();
  let post = TrCard::parse("tR1* 0 0 10", false).unwrap();
  assert_eq!(pre.number(), 1);
  assert_eq!(post.number(), 1);
  assert!(pre.matrix().approx_eq(&post.matrix()));
  // Translation is literal either way.
  assert_eq!(pre.matrix().translation(), glam::DVec3::new(0.0, 0.0, 10.0));
}

#[test]
fn arguments_may_be_expressions() {
  let card = TrCard::parse("TR5 0 0 cos(0)", false).unwrap();
  assert_eq!(card.matrix().translation(), glam::DVec3::new(0.0, 0.0, 1.0));
  let card = TrCard::parse("tr6  (-0.500000)*1 0 0   1 0 0  0 1 0  0 0 1  1", false).unwrap();
  assert_eq!(card.matrix().translation().x, -0.5);
}

#[test]
fn malformed_cards_are_rejected() {
  for bad in [
    "-TR1 0 12 0",
    "TR1x 0 0 10",
    "*TR5 0 0  ab",
    "TR-1* 0 0 10",
    "TR-1 0 0 10",
    "SO 0 0 10",
    "TR1 0 ab 0 10",
  ] {
    assert!(TrCard::parse(bad, false).is_err(), "{bad} should fail");
  }
}

#[test]
fn identity_spellings() {
  for card in [
    "TR01  j j j  j j j  j j j   j  j j     j",
    "Tr6   0 0 0  1 0 0  0 1 0   0  0 1     1",
    "TR22  j j j  1 0 0  0 1 0   0  0 1     1",
    "TR9   j j j  j j j  0 1 0   0  0 1.0  -1",
    "TR08  j j j  1 0 0  j j j   0  0 1.0  -1",
  ] {
    let tr = TrCard::parse(card, false).unwrap();
    assert!(tr.matrix().is_identity(), "{card}");
  }
  // Incomplete rotation rows cannot be completed.
  assert!(TrCard::parse("TR-10 j j j  1 0 0  0 1 0   j  j j    -1", false).is_err());
  assert!(TrCard::parse("TR06  1 2 3  4 5 6  7 8 9  10 11 12   13", false).is_err());
}

#[test]
fn messy_rotation_is_orthonormalized() {
  let tr = TrCard::parse("TR7   1 2 3  4 5 6  7 8 9  10 11 120  -13", false).unwrap();
  let rot = tr.matrix().rotation();
  assert!((rot * rot.transposed()).approx_eq(&crate::math::Mat3::IDENTITY));
}

#[test]
fn transform_map_rejects_duplicates() {
  use crate::input::DataLine;
  let lines = vec![
    DataLine::new("d", 1, "tr1 0 0 10"),
    DataLine::new("d", 2, "tr2 5 0 0"),
  ];
  let map = TrCard::make_transform_map(&lines).unwrap();
  assert_eq!(map.len(), 2);

  let dup = vec![
    DataLine::new("d", 1, "tr1 0 0 10"),
    DataLine::new("d", 2, "TR01 5 0 0"),
  ];
  assert!(TrCard::make_transform_map(&dup).is_err());
}

#[test]
fn non_tr_cards_are_skipped_by_the_map() {
  use crate::input::DataLine;
  let lines = vec![
    DataLine::new("d", 1, "m1 1001 1"),
    DataLine::new("d", 2, "tr3 1 2 3"),
  ];
  let map = TrCard::make_transform_map(&lines).unwrap();
  assert_eq!(map.len(), 1);
  assert!(map.contains_key(&3));
}

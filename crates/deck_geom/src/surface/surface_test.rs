use glam::DVec3;

use super::*;
use crate::math::Affine;

fn surface(card: &str) -> Surface {
  let fields: Vec<&str> = card.split_whitespace().collect();
  let params: Vec<f64> = fields[2..].iter().map(|v| v.parse().unwrap()).collect();
  Surface::from_card(fields[0], fields[1], &params, &Affine::IDENTITY).unwrap()
}

#[test]
fn card_dispatch_covers_the_mnemonic_set() {
  for card in [
    "1 p 1 0 0 5",
    "2 px 3",
    "3 s 1 2 3 4",
    "4 so 7",
    "5 sx 2 1",
    "6 c/z 1 1 2",
    "7 cx 4",
    "8 k/z 0 0 5 0.25 -1",
    "9 kz 5 0.25",
    "10 sq 1 1 1 0 0 0 -9 0 0 0",
    "11 gq 1 1 1 0 0 0 0 0 0 -25",
    "12 tz 0 0 0 10 2 2",
    "13 ta 0 0 0 0 0 1 10 2 2",
    "14 tri 0 0 0 1 0 0 0 1 0",
    "15 ca 0 0 0 1 1 0 3",
    "16 ka 0 0 0 0 1 0 0.5",
  ] {
    let s = surface(card);
    assert!(!s.name().is_empty());
  }
  assert!(matches!(
    Surface::from_card("x", "frob", &[1.0], &Affine::IDENTITY),
    Err(crate::error::Error::UnknownSymbol(_))
  ));
}

#[test]
fn reversal_flips_the_side_everywhere_but_the_boundary() {
  // Reversal law: off the surface, exactly one of the pair claims the
  // point; on the surface, neither the reversed strict test nor the
  // forward test disagree about ownership.
  for card in ["1 so 5", "2 px 2", "3 cz 3", "4 tz 0 0 0 10 2 2"] {
    let fwd = surface(card);
    let rev = fwd.make_reverse().unwrap();
    assert!(rev.is_reversed());
    assert_eq!(rev.name(), format!("-{}", fwd.name()));
    for p in [
      DVec3::new(0.1, 0.2, 0.3),
      DVec3::new(9.0, -1.0, 2.5),
      DVec3::new(-4.0, 4.0, 0.0),
      DVec3::new(11.0, 0.0, 0.0),
    ] {
      assert_ne!(
        fwd.is_forward(p),
        rev.is_forward(p),
        "surface {card}, point {p:?}"
      );
    }
  }
}

#[test]
fn reversed_plane_is_strict_at_the_boundary() {
  let fwd = surface("1 px 2");
  let rev = fwd.make_reverse().unwrap();
  let on = DVec3::new(2.0, 0.0, 0.0);
  assert!(fwd.is_forward(on));
  assert!(!rev.is_forward(on));
  assert!(rev.make_reverse().is_err());
}

#[test]
fn ray_hit_consistency() {
  // If a ray from p hits at q, then p and a point just past q lie on
  // opposite sides, and q is on the ray.
  let cards = ["1 so 5", "2 px 2", "3 cz 3", "4 s 1 0 0 2"];
  let dir = DVec3::new(1.0, 0.2, -0.1).normalize();
  let origin = DVec3::new(-8.0, 0.3, 0.6);
  for card in cards {
    let s = surface(card);
    let Some(q) = s.intersection(origin, dir) else {
      continue;
    };
    let dist = (q - origin).length();
    let past = origin + (dist + 2e-7) * dir;
    assert_ne!(s.is_forward(origin), s.is_forward(past), "{card}");
    // q sits on the ray.
    let along = (q - origin).dot(dir);
    assert!((q - (origin + along * dir)).length() < 1e-7, "{card}");
  }
}

#[test]
fn deep_copy_takes_the_new_name_and_no_id() {
  let s = surface("77 so 5");
  let copy = s.deep_copy("77_tC1").unwrap();
  assert_eq!(copy.name(), "77_tC1");
  assert_eq!(copy.id(), 0);
  assert!(!copy.is_reversed());
}

#[test]
fn transform_keeps_bounding_planes_on_the_surface_side() {
  let mut s = surface("1 so 5");
  let rev = s.make_reverse().unwrap();
  assert_eq!(rev.bounding_planes().len(), 1);
  s.transform(&Affine::from_translation(DVec3::new(10.0, 0.0, 0.0)));
  // The forward sphere moved; its outside tangent planes moved along.
  let outside_point = DVec3::new(25.0, 0.0, 0.0);
  let covered = s
    .bounding_planes()
    .iter()
    .any(|conj| conj.iter().all(|pl| pl.is_forward(outside_point)));
  assert!(covered);
}

#[test]
fn serialization_reparses_to_the_same_kind() {
  for card in [
    "1 p 0 0 1 4",
    "2 so 5",
    "3 s 1 2 3 4",
    "4 c/z 1 1 2",
    "5 k/x 0 0 5 0.25 1",
    "6 gq 1 2 3 0 0 0 0 0 0 -9",
    "7 ta 0 0 1 0 0 1 10 2 2",
    "8 ca 0 0 0 1 1 0 3",
  ] {
    let s = surface(card);
    let text = s.to_input_string();
    let fields: Vec<&str> = text.split_whitespace().collect();
    let params: Vec<f64> = fields[2..].iter().map(|v| v.parse().unwrap()).collect();
    let back = Surface::from_card(fields[0], fields[1], &params, &Affine::IDENTITY).unwrap();
    assert_eq!(back.kind(), s.kind(), "{card} -> {text}");
    // Same implicit sign at a few probes.
    for p in [DVec3::new(0.5, 0.5, 0.5), DVec3::new(7.0, -2.0, 1.0)] {
      assert_eq!(back.is_forward(p), s.is_forward(p), "{card} -> {text}");
    }
  }
}

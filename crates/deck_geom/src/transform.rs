//! Transform algebra: TR argument lists to affine matrices.
//!
//! A TR argument list is `dx dy dz  r11..r33  M` with every component
//! optional (`j` keeps the default). A leading `*` marks angle input in
//! degrees, converted to direction cosines. Six rotation entries give
//! two complete rows and the third is their cross product; the rotation
//! block is re-orthonormalized by Gram-Schmidt when the input drifted.
//! `M = +-2` reads the first three rotation entries as rotation angles
//! around x, y, z; a negative `M` applies the (negated) translation
//! before the rotation.

use std::collections::HashMap;

use glam::DVec3;

use crate::constants::{EPS, ORTHO_RELAX_LOOPS, ORTHO_WARN_RAD};
use crate::error::{Error, Result};
use crate::formula;
use crate::math::{rotation_about, Affine, Mat3};
use crate::strings::{self, BRACES};

/// Parse one TR argument list (no commas) into an affine matrix.
pub fn generate_single_transform_matrix(trstr: &str, warn_compat: bool) -> Result<Affine> {
  let mut s = trstr.trim().to_ascii_lowercase();
  let degree_input = s.starts_with('*');
  if degree_input {
    s = s[1..].trim_start().to_string();
  }
  let fields = strings::split_ws(&s, BRACES);
  if fields.len() < 3 || fields.len() > 13 {
    return Err(Error::BadCard {
      file: String::new(),
      line: 0,
      what: format!(
        "transform takes 3 to 13 components, got {} in \"{trstr}\"",
        fields.len()
      ),
    });
  }

  // Defaults encode the identity; for angle input the rotation block
  // defaults are the identity's angles.
  let mut args: [f64; 13] = if degree_input {
    [0.0, 0.0, 0.0, 0.0, 90.0, 90.0, 90.0, 0.0, 90.0, 90.0, 90.0, 0.0, 1.0]
  } else {
    [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0]
  };
  // Rotation-block positions actually supplied (0-based within the
  // nine rotation entries).
  let mut supplied: Vec<usize> = Vec::new();
  for (i, field) in fields.iter().enumerate() {
    if field == "j" {
      continue;
    }
    args[i] = formula::eval_param(field)?;
    if (3..12).contains(&i) {
      supplied.push(i - 3);
    }
  }
  if degree_input {
    for a in args.iter_mut().take(12).skip(3) {
      *a = a.to_radians().cos();
    }
  }

  let displacement = DVec3::new(args[0], args[1], args[2]);
  let mut rot_args: [f64; 9] = args[3..12].try_into().unwrap();
  let last_value = args[12].round() as i32;

  match supplied.len() {
    0 | 9 => {}
    6 => {
      if warn_compat {
        tracing::warn!("six-element rotation input is not phits compatible");
      }
      // Two complete, row-aligned triples are required.
      let rows_ok = supplied[1] == supplied[0] + 1
        && supplied[2] == supplied[1] + 1
        && supplied[4] == supplied[3] + 1
        && supplied[5] == supplied[4] + 1
        && supplied[0] % 3 == 0
        && supplied[3] % 3 == 0;
      if !rows_ok {
        return Err(Error::BadCard {
          file: String::new(),
          line: 0,
          what: "six rotation components must form two complete rows".into(),
        });
      }
      let v1 = DVec3::new(
        rot_args[supplied[0]],
        rot_args[supplied[1]],
        rot_args[supplied[2]],
      );
      let v2 = DVec3::new(
        rot_args[supplied[3]],
        rot_args[supplied[4]],
        rot_args[supplied[5]],
      );
      let mut v3 = v1.cross(v2);
      // Rows one and three supplied: their cross points against row
      // two.
      if supplied[0] == 0 && supplied[3] == 6 {
        v3 = -v3;
      }
      let mut missing: Vec<usize> = (0..9).filter(|i| !supplied.contains(i)).collect();
      missing.sort_unstable();
      rot_args[missing[0]] = v3.x;
      rot_args[missing[1]] = v3.y;
      rot_args[missing[2]] = v3.z;
    }
    _ => {
      return Err(Error::BadCard {
        file: String::new(),
        line: 0,
        what: format!(
          "rotation block needs 0, 6 or 9 components, got {}",
          supplied.len()
        ),
      });
    }
  }

  let mut rotation = if last_value.abs() == 2 {
    // Entries 4-6 are rotation angles (as cosines) around x, y, z.
    rotation_about(DVec3::X, args[3].clamp(-1.0, 1.0).acos())
      * rotation_about(DVec3::Y, args[4].clamp(-1.0, 1.0).acos())
      * rotation_about(DVec3::Z, args[5].clamp(-1.0, 1.0).acos())
  } else {
    let mut m = Mat3::IDENTITY;
    for (i, v) in rot_args.iter().enumerate() {
      m.m[i / 3][i % 3] = if v.abs() > EPS { *v } else { 0.0 };
    }
    m
  };

  if !rotation.is_orthogonal() {
    let original = rotation;
    rotation.orthonormalize(ORTHO_RELAX_LOOPS)?;
    let r0 = original.row(0).normalize();
    let r1 = original.row(1).normalize();
    let r2 = original.row(2).normalize();
    if r0.dot(r1).abs() > ORTHO_WARN_RAD
      || r0.dot(r2).abs() > ORTHO_WARN_RAD
      || r1.dot(r2).abs() > ORTHO_WARN_RAD
    {
      tracing::warn!(input = trstr, "transform rotation block is not orthogonal; re-orthonormalized");
    }
  }

  let rotation4 = Affine::from_parts(rotation, DVec3::ZERO);
  if last_value < 0 {
    // Negative M: the negated translation applies first.
    let displacement4 = Affine::from_translation(-displacement);
    Ok(displacement4 * rotation4)
  } else {
    let displacement4 = Affine::from_translation(displacement);
    Ok(rotation4 * displacement4)
  }
}

/// Compose a comma-separated TRCL string left to right. A segment that
/// is a bare number indexes the TR table.
pub fn compose_transforms(tr_map: &HashMap<usize, Affine>, trcl_str: &str) -> Result<Affine> {
  if trcl_str.trim().is_empty() {
    return Ok(Affine::IDENTITY);
  }
  let arg_str = strings::dequote('(', ')', trcl_str);
  let segments = strings::split_outside(&arg_str, &[','], BRACES);

  let mut matrix = Affine::IDENTITY;
  for segment in segments {
    let seg = segment.trim();
    let part = if strings::is_arithmetic(seg) {
      let tr_num = seg.parse::<f64>().unwrap() as usize;
      *tr_map.get(&tr_num).ok_or(Error::UndefinedTr(tr_num))?
    } else {
      generate_single_transform_matrix(seg, false)?
    };
    matrix = matrix * part;
  }
  Ok(matrix)
}

/// Canonical TRCL serialization of a matrix: translation followed by
/// the nine rotation entries.
pub fn to_trcl_string(matrix: &Affine) -> String {
  let t = matrix.translation();
  let mut out = format!("{} {} {}", t.x, t.y, t.z);
  let r = matrix.rotation();
  for i in 0..3 {
    for j in 0..3 {
      out.push_str(&format!(" {}", r.m[i][j]));
    }
  }
  out
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

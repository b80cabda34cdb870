//! Grammar pieces shared between surface and cell cards: name
//! character classes, canonical TRCL accumulation, and the
//! deterministic naming of TRCL-generated surfaces and lattice
//! elements.

use regex::Regex;

use crate::error::{Error, Result};
use crate::strings::{self, BRACES};

/// Character class of a cell name.
pub const CELL_NAME_CLASS: &str = r"[-+.,_@<\[\]\w]+";

fn user_name_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"^ *[0-9a-zA-Z][0-9a-zA-Z_]* *$").unwrap())
}

fn full_name_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(&format!(r"^([-+*]*)({CELL_NAME_CLASS})$")).unwrap())
}

/// Validate a name. `as_user_input` applies the strict rules for names
/// typed in a deck; generated names only need the full character class.
pub fn check_name_characters(name: &str, as_user_input: bool) -> Result<()> {
  if as_user_input {
    if name.is_empty() {
      return Err(Error::BadCard {
        file: String::new(),
        line: 0,
        what: "user-input name is empty".into(),
      });
    }
    if !user_name_pattern().is_match(name) {
      return Err(Error::BadCard {
        file: String::new(),
        line: 0,
        what: format!("user-input name must be [0-9a-zA-Z_], got \"{name}\""),
      });
    }
    if name.starts_with('_') {
      return Err(Error::BadCard {
        file: String::new(),
        line: 0,
        what: format!("user-input name must not start with '_': \"{name}\""),
      });
    }
    return Ok(());
  }
  if !full_name_pattern().is_match(name) {
    return Err(Error::BadCard {
      file: String::new(),
      line: 0,
      what: format!("name contains invalid characters: \"{name}\""),
    });
  }
  Ok(())
}

/// Name of the surface created by applying a cell's TRCL to
/// `old_surface`. The name embeds the transforming cell so that the
/// same source surface transformed inside two different cells stays
/// distinct, while nested hierarchies (`AA<BB<CC`) anchor on everything
/// below the outermost level.
pub fn transformed_surface_name(tred_cell: &str, old_surface: &str) -> String {
  let (sign, base) = match old_surface.chars().next() {
    Some(c @ ('+' | '-')) => (c.to_string(), &old_surface[1..]),
    _ => (String::new(), old_surface),
  };
  let anchor = match tred_cell.find('<') {
    Some(pos) => &tred_cell[pos + 1..],
    None => tred_cell,
  };
  format!("{sign}{base}_t{anchor}")
}

/// Canonical name of lattice element (i, j, k) of `base`.
pub fn element_name(base: &str, i: i32, j: i32, k: i32) -> String {
  format!("{base}[{i},{j},{k}]")
}

fn tr_param_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  // {} may carry deferred arithmetic inside the argument list.
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)(\*?)(trsf|trcl) *= *\(([-+"(){}*/%.,0-9a-zA-Z ]+)\)"#).unwrap()
  })
}

/// If `src` is a TRCL/TRSF assignment, append its canonical form to
/// `tr_str` (comma separated, `*` prefix preserved per segment) and
/// report `true`.
pub fn append_canonical_tr_str(src: &str, tr_str: &mut String) -> bool {
  let Some(caps) = tr_param_pattern().captures(src) else {
    return false;
  };
  let is_degree = !caps.get(1).map(|m| m.as_str().is_empty()).unwrap_or(true);
  let args = caps.get(3).map(|m| m.as_str()).unwrap_or("");
  for segment in strings::split_outside(args, &[','], BRACES) {
    let mut seg = strings::dequote('(', ')', &segment);
    if is_degree && !seg.starts_with('*') {
      seg = format!("*{seg}");
    }
    if tr_str.is_empty() {
      *tr_str = seg;
    } else {
      *tr_str = format!("{tr_str},{seg}");
    }
  }
  true
}

fn cell_param_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"^([\w:*]+)=(\( *[-+*/%\w .{},]+ *\)|[-+:\w.]+)$").unwrap()
  })
}

/// Split a `key=value` token (whitespace around `=` already collapsed).
pub fn split_key_value(token: &str) -> Option<(String, String)> {
  let caps = cell_param_pattern().captures(token)?;
  Some((
    caps.get(1).unwrap().as_str().to_ascii_lowercase(),
    caps.get(2).unwrap().as_str().to_string(),
  ))
}

/// Collapse whitespace around `=` outside any grouping so `key = value`
/// tokenizes as one field.
pub fn normalize_assignments(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut depth = 0i32;
  let chars: Vec<char> = s.chars().collect();
  let mut i = 0usize;
  while i < chars.len() {
    let c = chars[i];
    match c {
      '(' | '{' => depth += 1,
      ')' | '}' => depth -= 1,
      _ => {}
    }
    if c == '=' && depth == 0 {
      while out.ends_with(' ') {
        out.pop();
      }
      out.push('=');
      i += 1;
      while i < chars.len() && chars[i] == ' ' {
        i += 1;
      }
      continue;
    }
    out.push(c);
    i += 1;
  }
  out
}

//! Surface card parsing.
//!
//! Grammar: `<name> [<tr_num>] <mnemonic> <num>* (<key>=<value>)*`.
//! TRSF/TRCL assignments accumulate into one canonical TR string;
//! numeric parameters may be `{...}` deferred arithmetic handed to the
//! expression oracle.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::formula;
use crate::input::{card, ijmr};
use crate::math::Affine;
use crate::strings::{self, CARD_QUOTES};
use crate::transform;

/// Parsed surface card.
#[derive(Clone, Debug)]
pub struct SurfaceCard {
  pub name: String,
  pub symbol: String,
  /// TR table number, when the card names one.
  pub tr_number: Option<usize>,
  /// Evaluated numeric parameters.
  pub params: Vec<f64>,
  /// Canonical TRSF string accumulated from the card.
  pub tr_str: String,
  /// Unrecognized key=value parameters, passed through.
  pub param_map: HashMap<String, String>,
}

impl SurfaceCard {
  /// Parse a single already-joined surface card. `disable_ijmr` and
  /// `disable_formula` skip the expensive passes for generated cards
  /// that are guaranteed plain.
  pub fn parse(card_str: &str, disable_formula: bool, disable_ijmr: bool) -> Result<SurfaceCard> {
    let mut work = card_str.trim().to_string();

    if !disable_ijmr {
      // The name itself must not be a repetition expression.
      let mut parts = work.splitn(2, char::is_whitespace);
      let first = parts.next().unwrap_or("").to_string();
      let rest = parts.next().unwrap_or("").to_string();
      if ijmr::is_ijmr_expression(&first) {
        return Err(Error::BadCard {
          file: String::new(),
          line: 0,
          what: format!("surface name must not be an ijmr expression: \"{first}\""),
        });
      }
      work = format!("{} {}", first, ijmr::expand(&rest)?);
    }

    let work = card::normalize_assignments(&work);
    let mut fields = strings::split_ws(&work, CARD_QUOTES);

    // Some decks use [] as arithmetic quoting; lattice element names
    // are the only place [] is meaningful, and those never appear on
    // surface cards past the name.
    for field in fields.iter_mut().skip(1) {
      *field = field.replace('[', "{").replace(']', "}");
    }

    // TR parameters first, then generic key=value parameters.
    let mut tr_str = String::new();
    fields.retain(|f| !card::append_canonical_tr_str(f, &mut tr_str));
    let mut param_map = HashMap::new();
    fields.retain(|f| match card::split_key_value(f) {
      Some((k, v)) => {
        param_map.insert(k, v);
        false
      }
      None => {
        true
      }
    });
    for field in fields.iter_mut() {
      *field = strings::dequote('"', '"', field);
    }

    if fields.len() <= 1 {
      return Err(Error::BadCard {
        file: String::new(),
        line: 0,
        what: format!("too short surface card \"{card_str}\""),
      });
    }

    let mut name = fields[0].clone();
    let (symbol, param_start, tr_number) = if strings::is_integer(&fields[1]) {
      if fields.len() < 3 {
        return Err(Error::BadCard {
          file: String::new(),
          line: 0,
          what: format!("surface card \"{card_str}\" has a TR number but no mnemonic"),
        });
      }
      let tr: i64 = fields[1].parse().unwrap();
      if tr < 0 {
        return Err(Error::BadCard {
          file: String::new(),
          line: 0,
          what: "negative TR number (periodic boundary) is not supported".into(),
        });
      }
      (fields[2].to_ascii_lowercase(), 3, Some(tr as usize))
    } else {
      (fields[1].to_ascii_lowercase(), 2, None)
    };

    let mut params = Vec::with_capacity(fields.len() - param_start);
    for field in &fields[param_start..] {
      let value = if disable_formula {
        field.parse::<f64>().map_err(|_| Error::BadCard {
          file: String::new(),
          line: 0,
          what: format!("bad numeric parameter \"{field}\""),
        })?
      } else {
        formula::eval_param(field)?
      };
      params.push(value);
    }

    name = strings::canonical_name(&name);
    card::check_name_characters(&name, false)?;

    Ok(SurfaceCard {
      name,
      symbol,
      tr_number,
      params,
      tr_str,
      param_map,
    })
  }

  /// TR matrix named by the card's TR number, if any.
  pub fn matrix(&self, tr_map: &HashMap<usize, Affine>) -> Result<Option<Affine>> {
    match self.tr_number {
      None => Ok(None),
      Some(n) => tr_map
        .get(&n)
        .copied()
        .map(Some)
        .ok_or(Error::UndefinedTr(n)),
    }
  }

  /// Full transform of the card: TRSF string first, then the numbered
  /// TR.
  pub fn full_matrix(&self, tr_map: &HashMap<usize, Affine>) -> Result<Affine> {
    let mut matrix = Affine::IDENTITY;
    if !self.tr_str.is_empty() {
      matrix = matrix * transform::compose_transforms(tr_map, &self.tr_str)?;
    }
    if let Some(m) = self.matrix(tr_map)? {
      matrix = matrix * m;
    }
    Ok(matrix)
  }
}

#[cfg(test)]
#[path = "surface_card_test.rs"]
mod surface_card_test;

//! `i j m r` repetition grammar.
//!
//! Card parameter lists may compress runs of values:
//! - `Nr` repeats the previous entry N times,
//! - `Ni` linearly interpolates N entries between the previous and the
//!   next,
//! - `Nm` multiplies the previous entry by the factor N,
//! - `j` stands for "jump" (keep the default) and passes through.
//!
//! Expansion happens before numeric evaluation; names must never be
//! repetition expressions.

use regex::Regex;

use crate::error::{Error, Result};

fn ijmr_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"^(\d*)([ijmr])$").unwrap())
}

/// True when the token is an `i`/`j`/`m`/`r` repetition expression
/// (`j` alone does not count; it is a plain jump marker).
pub fn is_ijmr_expression(token: &str) -> bool {
  match ijmr_pattern().captures(token.trim()) {
    Some(caps) => {
      let count = caps.get(1).map(|m| m.as_str()).unwrap_or("");
      let kind = caps.get(2).map(|m| m.as_str()).unwrap_or("");
      !(count.is_empty() && kind == "j")
    }
    None => false,
  }
}

/// Expand repetition expressions over a whitespace-separated list.
pub fn expand(list: &str) -> Result<String> {
  let tokens: Vec<&str> = list.split_whitespace().collect();
  let mut out: Vec<String> = Vec::with_capacity(tokens.len());
  let mut idx = 0usize;
  while idx < tokens.len() {
    let token = tokens[idx].to_ascii_lowercase();
    let Some(caps) = ijmr_pattern().captures(&token) else {
      out.push(tokens[idx].to_string());
      idx += 1;
      continue;
    };
    let count_str = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let kind = caps.get(2).unwrap().as_str();
    if count_str.is_empty() && kind == "j" {
      out.push("j".into());
      idx += 1;
      continue;
    }
    let count: usize = if count_str.is_empty() {
      1
    } else {
      count_str.parse().map_err(|_| bad(list, "repetition count"))?
    };
    match kind {
      "r" => {
        let prev = out.last().cloned().ok_or_else(|| bad(list, "r with no previous entry"))?;
        for _ in 0..count {
          out.push(prev.clone());
        }
      }
      "m" => {
        let prev: f64 = out
          .last()
          .and_then(|v| v.parse().ok())
          .ok_or_else(|| bad(list, "m with no numeric previous entry"))?;
        let factor: f64 = count_str.parse().map_err(|_| bad(list, "m factor"))?;
        out.push(format!("{}", prev * factor));
      }
      "i" => {
        let prev: f64 = out
          .last()
          .and_then(|v| v.parse().ok())
          .ok_or_else(|| bad(list, "i with no numeric previous entry"))?;
        let next_tok = tokens.get(idx + 1).ok_or_else(|| bad(list, "i with no following entry"))?;
        let next: f64 = next_tok.parse().map_err(|_| bad(list, "i with non-numeric bound"))?;
        let step = (next - prev) / (count as f64 + 1.0);
        for n in 1..=count {
          out.push(format!("{}", prev + step * n as f64));
        }
      }
      // A counted jump is just that many jump markers.
      "j" => {
        for _ in 0..count {
          out.push("j".into());
        }
      }
      _ => unreachable!(),
    }
    idx += 1;
  }
  Ok(out.join(" "))
}

fn bad(list: &str, what: &str) -> Error {
  Error::BadCard {
    file: String::new(),
    line: 0,
    what: format!("invalid {what} in \"{list}\""),
  }
}

//! Fortran-style scalar expression oracle.
//!
//! Numeric card parameters may be deferred arithmetic in braces, e.g.
//! `{1.2*00001}` or `{30*abs(0.1)}`. This module evaluates such
//! expressions to an `f64`. Supported grammar:
//!
//! ```text
//! expr   := term (('+'|'-') term)*
//! term   := power (('*'|'/') power)*
//! power  := unary ('**' power)?          # right associative
//! unary  := ('+'|'-')* primary
//! primary:= number | 'pi' | func '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Functions: `sin cos tan asin acos atan exp log log10 sqrt abs float
//! int nint mod min max`. Domain violations (negative `sqrt`,
//! non-positive `log`, `asin`/`acos` outside [-1, 1], division by
//! zero) surface as [`Error::NumericDomain`].

use crate::error::{Error, Result};

/// Evaluate an expression string to a scalar.
pub fn eval(expr: &str) -> Result<f64> {
  let trimmed = expr.trim();
  // Fast path: plain numbers vastly outnumber real expressions in a
  // typical deck.
  if let Ok(v) = trimmed.parse::<f64>() {
    return Ok(v);
  }
  let tokens = tokenize(trimmed)?;
  let mut p = Parser { tokens, pos: 0 };
  let v = p.expr()?;
  if p.pos != p.tokens.len() {
    return Err(Error::NumericDomain(format!(
      "trailing input in expression \"{trimmed}\""
    )));
  }
  Ok(v)
}

/// Evaluate a card parameter: `{...}` wrapping is stripped first.
pub fn eval_param(param: &str) -> Result<f64> {
  let t = param.trim();
  if t.starts_with('{') && t.ends_with('}') && t.len() >= 2 {
    eval(&t[1..t.len() - 1])
  } else {
    eval(t)
  }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
  Num(f64),
  Ident(String),
  Plus,
  Minus,
  Mul,
  Div,
  Pow,
  LParen,
  RParen,
  Comma,
}

fn tokenize(s: &str) -> Result<Vec<Token>> {
  let bytes: Vec<char> = s.chars().collect();
  let mut out = Vec::new();
  let mut i = 0usize;
  while i < bytes.len() {
    let c = bytes[i];
    match c {
      ' ' | '\t' => i += 1,
      '+' => {
        out.push(Token::Plus);
        i += 1;
      }
      '-' => {
        out.push(Token::Minus);
        i += 1;
      }
      '*' => {
        if i + 1 < bytes.len() && bytes[i + 1] == '*' {
          out.push(Token::Pow);
          i += 2;
        } else {
          out.push(Token::Mul);
          i += 1;
        }
      }
      '/' => {
        out.push(Token::Div);
        i += 1;
      }
      '(' => {
        out.push(Token::LParen);
        i += 1;
      }
      ')' => {
        out.push(Token::RParen);
        i += 1;
      }
      ',' => {
        out.push(Token::Comma);
        i += 1;
      }
      _ if c.is_ascii_digit() || c == '.' => {
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == '.') {
          i += 1;
        }
        // Scientific exponent, optionally signed.
        if i < bytes.len() && (bytes[i] == 'e' || bytes[i] == 'E') {
          let mut j = i + 1;
          if j < bytes.len() && (bytes[j] == '+' || bytes[j] == '-') {
            j += 1;
          }
          if j < bytes.len() && bytes[j].is_ascii_digit() {
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
              i += 1;
            }
          }
        }
        let text: String = bytes[start..i].iter().collect();
        let v = text
          .parse::<f64>()
          .map_err(|_| Error::NumericDomain(format!("bad number \"{text}\"")))?;
        out.push(Token::Num(v));
      }
      _ if c.is_ascii_alphabetic() => {
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == '_') {
          i += 1;
        }
        out.push(Token::Ident(bytes[start..i].iter().collect::<String>().to_lowercase()));
      }
      _ => {
        return Err(Error::NumericDomain(format!(
          "unexpected character '{c}' in expression \"{s}\""
        )))
      }
    }
  }
  Ok(out)
}

struct Parser {
  tokens: Vec<Token>,
  pos: usize,
}

impl Parser {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn next(&mut self) -> Option<Token> {
    let t = self.tokens.get(self.pos).cloned();
    if t.is_some() {
      self.pos += 1;
    }
    t
  }

  fn expect(&mut self, t: Token) -> Result<()> {
    match self.next() {
      Some(ref got) if *got == t => Ok(()),
      other => Err(Error::NumericDomain(format!(
        "expected {t:?}, found {other:?}"
      ))),
    }
  }

  fn expr(&mut self) -> Result<f64> {
    let mut v = self.term()?;
    loop {
      match self.peek() {
        Some(Token::Plus) => {
          self.pos += 1;
          v += self.term()?;
        }
        Some(Token::Minus) => {
          self.pos += 1;
          v -= self.term()?;
        }
        _ => return Ok(v),
      }
    }
  }

  fn term(&mut self) -> Result<f64> {
    let mut v = self.power()?;
    loop {
      match self.peek() {
        Some(Token::Mul) => {
          self.pos += 1;
          v *= self.power()?;
        }
        Some(Token::Div) => {
          self.pos += 1;
          let d = self.power()?;
          if d == 0.0 {
            return Err(Error::NumericDomain("division by zero".into()));
          }
          v /= d;
        }
        _ => return Ok(v),
      }
    }
  }

  fn power(&mut self) -> Result<f64> {
    let base = self.unary()?;
    if let Some(Token::Pow) = self.peek() {
      self.pos += 1;
      let exp = self.power()?;
      return Ok(base.powf(exp));
    }
    Ok(base)
  }

  fn unary(&mut self) -> Result<f64> {
    let mut sign = 1.0;
    loop {
      match self.peek() {
        Some(Token::Plus) => self.pos += 1,
        Some(Token::Minus) => {
          sign = -sign;
          self.pos += 1;
        }
        _ => break,
      }
    }
    Ok(sign * self.primary()?)
  }

  fn primary(&mut self) -> Result<f64> {
    match self.next() {
      Some(Token::Num(v)) => Ok(v),
      Some(Token::LParen) => {
        let v = self.expr()?;
        self.expect(Token::RParen)?;
        Ok(v)
      }
      Some(Token::Ident(name)) => {
        if name == "pi" {
          return Ok(std::f64::consts::PI);
        }
        self.expect(Token::LParen)?;
        let mut args = vec![self.expr()?];
        while let Some(Token::Comma) = self.peek() {
          self.pos += 1;
          args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;
        apply(&name, &args)
      }
      other => Err(Error::NumericDomain(format!(
        "unexpected token {other:?} in expression"
      ))),
    }
  }
}

fn apply(name: &str, args: &[f64]) -> Result<f64> {
  let arity = |n: usize| -> Result<()> {
    if args.len() == n {
      Ok(())
    } else {
      Err(Error::NumericDomain(format!(
        "{name} expects {n} argument(s), got {}",
        args.len()
      )))
    }
  };
  match name {
    "sin" => arity(1).map(|_| args[0].sin()),
    "cos" => arity(1).map(|_| args[0].cos()),
    "tan" => arity(1).map(|_| args[0].tan()),
    "asin" => {
      arity(1)?;
      if args[0].abs() > 1.0 {
        return Err(Error::NumericDomain(format!("asin({}) out of domain", args[0])));
      }
      Ok(args[0].asin())
    }
    "acos" => {
      arity(1)?;
      if args[0].abs() > 1.0 {
        return Err(Error::NumericDomain(format!("acos({}) out of domain", args[0])));
      }
      Ok(args[0].acos())
    }
    "atan" => arity(1).map(|_| args[0].atan()),
    "exp" => arity(1).map(|_| args[0].exp()),
    "log" => {
      arity(1)?;
      if args[0] <= 0.0 {
        return Err(Error::NumericDomain(format!("log({}) out of domain", args[0])));
      }
      Ok(args[0].ln())
    }
    "log10" => {
      arity(1)?;
      if args[0] <= 0.0 {
        return Err(Error::NumericDomain(format!("log10({}) out of domain", args[0])));
      }
      Ok(args[0].log10())
    }
    "sqrt" => {
      arity(1)?;
      if args[0] < 0.0 {
        return Err(Error::NumericDomain(format!("sqrt({}) out of domain", args[0])));
      }
      Ok(args[0].sqrt())
    }
    "abs" => arity(1).map(|_| args[0].abs()),
    "float" => arity(1).map(|_| args[0]),
    "int" => arity(1).map(|_| args[0].trunc()),
    "nint" => arity(1).map(|_| args[0].round()),
    "mod" => {
      arity(2)?;
      if args[1] == 0.0 {
        return Err(Error::NumericDomain("mod by zero".into()));
      }
      Ok(args[0] % args[1])
    }
    "min" => {
      if args.is_empty() {
        return Err(Error::NumericDomain("min of nothing".into()));
      }
      Ok(args.iter().cloned().fold(f64::INFINITY, f64::min))
    }
    "max" => {
      if args.is_empty() {
        return Err(Error::NumericDomain("max of nothing".into()));
      }
      Ok(args.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
    }
    _ => Err(Error::NumericDomain(format!("unknown function \"{name}\""))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ev(s: &str) -> f64 {
    eval(s).unwrap()
  }

  #[test]
  fn arithmetic() {
    assert_eq!(ev("1+2*3"), 7.0);
    assert_eq!(ev("(1+2)*3"), 9.0);
    assert_eq!(ev("2**3**2"), 512.0); // right associative
    assert_eq!(ev("-2**2"), -4.0);
    assert_eq!(ev("10/4"), 2.5);
    assert_eq!(ev("1.2*00001"), 1.2);
    assert_eq!(ev("45 + 45"), 90.0);
  }

  #[test]
  fn functions() {
    assert!((ev("cos(0)") - 1.0).abs() < 1e-12);
    assert!((ev("sin(pi/2)") - 1.0).abs() < 1e-12);
    assert!((ev("abs(-1.0)") - 1.0).abs() < 1e-12);
    assert!((ev("exp(0)") - 1.0).abs() < 1e-12);
    assert!((ev("sqrt(16)") - 4.0).abs() < 1e-12);
    assert!((ev("30*abs(0.1)") - 3.0).abs() < 1e-12);
    assert_eq!(ev("min(3, 1, 2)"), 1.0);
    assert_eq!(ev("max(3, 1, 2)"), 3.0);
    assert_eq!(ev("mod(7, 4)"), 3.0);
    assert_eq!(ev("int(-1.7)"), -1.0);
    assert_eq!(ev("nint(-1.7)"), -2.0);
  }

  #[test]
  fn domain_errors() {
    assert!(matches!(eval("sqrt(-1)"), Err(Error::NumericDomain(_))));
    assert!(matches!(eval("log(0)"), Err(Error::NumericDomain(_))));
    assert!(matches!(eval("asin(2)"), Err(Error::NumericDomain(_))));
    assert!(matches!(eval("1/0"), Err(Error::NumericDomain(_))));
    assert!(matches!(eval("1 + "), Err(Error::NumericDomain(_))));
    assert!(matches!(eval("frob(1)"), Err(Error::NumericDomain(_))));
  }

  #[test]
  fn param_braces() {
    assert_eq!(eval_param("{1+1}").unwrap(), 2.0);
    assert_eq!(eval_param(" 3.5 ").unwrap(), 3.5);
    assert_eq!(eval_param("(-0.500000)*1").unwrap(), -0.5);
  }
}

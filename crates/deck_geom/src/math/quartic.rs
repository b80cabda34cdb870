//! Real-coefficient polynomial solvers up to degree four.
//!
//! The quartic path is Ferrari's method. When the resolvent cubic
//! yields a negative auxiliary root the two auxiliary quadratics have
//! complex coefficients; they are solved in complex arithmetic and only
//! the real parts survive (the imaginary parts cancel for real-root
//! configurations). Roots feeding geometric predicates should be
//! polished with [`refine_newton`]; the raw Ferrari output of an
//! ill-conditioned quartic can be wrong in the fifth digit.

use crate::constants::{EPS, FERRARI_Q_EPS, NEWTON_MAX_ITER};

/// Minimal complex value for the auxiliary quadratics.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Cx {
  re: f64,
  im: f64,
}

impl Cx {
  fn new(re: f64, im: f64) -> Cx {
    Cx { re, im }
  }

  fn abs(self) -> f64 {
    self.re.hypot(self.im)
  }

  fn sqrt(self) -> Cx {
    // Principal square root.
    let r = self.abs();
    if r == 0.0 {
      return Cx::new(0.0, 0.0);
    }
    let re = ((r + self.re) * 0.5).sqrt();
    let im_mag = ((r - self.re) * 0.5).sqrt();
    Cx::new(re, if self.im >= 0.0 { im_mag } else { -im_mag })
  }
}

impl std::ops::Add for Cx {
  type Output = Cx;
  fn add(self, o: Cx) -> Cx {
    Cx::new(self.re + o.re, self.im + o.im)
  }
}
impl std::ops::Sub for Cx {
  type Output = Cx;
  fn sub(self, o: Cx) -> Cx {
    Cx::new(self.re - o.re, self.im - o.im)
  }
}
impl std::ops::Mul for Cx {
  type Output = Cx;
  fn mul(self, o: Cx) -> Cx {
    Cx::new(
      self.re * o.re - self.im * o.im,
      self.re * o.im + self.im * o.re,
    )
  }
}
impl std::ops::Div for Cx {
  type Output = Cx;
  fn div(self, o: Cx) -> Cx {
    let d = o.re * o.re + o.im * o.im;
    Cx::new(
      (self.re * o.re + self.im * o.im) / d,
      (self.im * o.re - self.re * o.im) / d,
    )
  }
}
impl std::ops::Neg for Cx {
  type Output = Cx;
  fn neg(self) -> Cx {
    Cx::new(-self.re, -self.im)
  }
}

/// Real roots of `c2 x^2 + c1 x + c0 = 0`. A double root is reported
/// only when `accept_double` is set; complex pairs yield nothing.
pub fn solve_quadratic(c2: f64, c1: f64, c0: f64, accept_double: bool) -> Vec<f64> {
  if c2.abs() < EPS {
    if c1.abs() < EPS {
      return Vec::new();
    }
    return vec![-c0 / c1];
  }
  let disc = c1 * c1 - 4.0 * c2 * c0;
  if disc.abs() < EPS {
    return if accept_double { vec![-0.5 * c1 / c2] } else { Vec::new() };
  }
  if disc < 0.0 {
    return Vec::new();
  }
  // One root directly, the other from the root product, to dodge
  // catastrophic cancellation.
  let s1 = if c1 > 0.0 {
    (-c1 - disc.sqrt()) * 0.5 / c2
  } else {
    (-c1 + disc.sqrt()) * 0.5 / c2
  };
  vec![s1, c0 / (c2 * s1)]
}

fn solve_quadratic_cx(c2: Cx, c1: Cx, c0: Cx, accept_double: bool) -> Vec<Cx> {
  let four = Cx::new(4.0, 0.0);
  let half = Cx::new(0.5, 0.0);
  if c2.abs() < EPS {
    if c1.abs() < EPS {
      return Vec::new();
    }
    return vec![-c0 / c1];
  }
  let disc = c1 * c1 - four * c2 * c0;
  if disc.abs() < EPS {
    return if accept_double { vec![-(half * c1 / c2)] } else { Vec::new() };
  }
  let s1 = if c1.re > 0.0 {
    (-c1 - disc.sqrt()) * half / c2
  } else {
    (-c1 + disc.sqrt()) * half / c2
  };
  vec![s1, c0 / (c2 * s1)]
}

/// Newton-iterated cube root; `powf` faults on negative bases with
/// fractional exponents.
pub fn cuberoot(x: f64) -> f64 {
  if x == 0.0 {
    return 0.0;
  }
  let positive = x > 0.0;
  let x = x.abs();
  let mut s = if x > 1.0 { x } else { 1.0 };
  let mut prev;
  loop {
    prev = s;
    s = (x / (s * s) + 2.0 * s) / 3.0;
    if s >= prev {
      break;
    }
  }
  if positive { prev } else { -prev }
}

/// Real roots of `c3 x^3 + ... + c0 = 0` by Cardano's formula.
pub fn solve_cubic(c3: f64, c2: f64, c1: f64, c0: f64, accept_double: bool) -> Vec<f64> {
  if c3.abs() < EPS {
    return solve_quadratic(c2, c1, c0, accept_double);
  }
  let b = c2 / (3.0 * c3);
  let c = c1 / c3;
  let d = c0 / c3;
  let p = b * b - c / 3.0;
  let q = (b * (c - 2.0 * b * b) - d) / 2.0;
  let a = q * q - p * p * p;

  // A double root sits exactly on a = 0; rounding spreads it over a
  // small window on either side.
  if a.abs() < 100.0 * EPS {
    if q.abs() < EPS {
      // Triple root.
      return if accept_double { vec![-b] } else { Vec::new() };
    }
    let qr = cuberoot(q);
    let sol1 = 2.0 * qr - b;
    let sol2 = -qr - b;
    return if accept_double { vec![sol1, sol2] } else { vec![sol1] };
  }
  if a > 0.0 {
    // One real root, one conjugate pair.
    let a3 = if q > 0.0 {
      cuberoot(q + a.sqrt())
    } else {
      cuberoot(q - a.sqrt())
    };
    let b3 = p / a3;
    vec![a3 + b3 - b]
  } else {
    // Three distinct real roots (trigonometric form).
    let sp = p.sqrt();
    let t = (q / (p * sp)).clamp(-1.0, 1.0).acos();
    let amp = 2.0 * sp;
    vec![
      amp * (t / 3.0).cos() - b,
      amp * ((t + 2.0 * std::f64::consts::PI) / 3.0).cos() - b,
      amp * ((t + 4.0 * std::f64::consts::PI) / 3.0).cos() - b,
    ]
  }
}

/// Evaluate `c4 x^4 + c3 x^3 + c2 x^2 + c1 x + c0`.
#[inline]
pub fn quartic_value(c4: f64, c3: f64, c2: f64, c1: f64, c0: f64, x: f64) -> f64 {
  (((c4 * x + c3) * x + c2) * x + c1) * x + c0
}

#[inline]
fn quartic_deriv(c4: f64, c3: f64, c2: f64, c1: f64, x: f64) -> f64 {
  ((4.0 * c4 * x + 3.0 * c3) * x + 2.0 * c2) * x + c1
}

/// Polish a root estimate by Newton iteration with an `f(x)/x`-scaled
/// stop criterion. Terminates on convergence, stall, two-cycle
/// oscillation, vanished derivative, or the iteration cap.
pub fn refine_newton(c4: f64, c3: f64, c2: f64, c1: f64, c0: f64, init: f64, prec: f64) -> f64 {
  debug_assert!(prec > 0.0);
  let mut x = init;
  let mut prev = init;
  let mut preprev = init;
  let mut fval = quartic_value(c4, c3, c2, c1, c0, x);
  let mut dval = quartic_deriv(c4, c3, c2, c1, x);
  let mut count = 0usize;
  while fval * fval > prec * prec * x * x {
    x -= fval / dval;
    if (x - prev) * (x - prev) < prec * prec {
      return x; // stationary
    }
    if (x - preprev) * (x - preprev) < prec * prec {
      return x; // oscillating between two points
    }
    count += 1;
    if count > NEWTON_MAX_ITER {
      return x;
    }
    if dval * dval < EPS * EPS {
      tracing::warn!(x, "quartic Newton refinement hit a zero derivative");
      return x;
    }
    fval = quartic_value(c4, c3, c2, c1, c0, x);
    dval = quartic_deriv(c4, c3, c2, c1, x);
    preprev = prev;
    prev = x;
  }
  x
}

/// Real roots of `c4 x^4 + ... + c0 = 0` by Ferrari's method.
pub fn solve_quartic(c4: f64, c3: f64, c2: f64, c1: f64, c0: f64, accept_double: bool) -> Vec<f64> {
  if c4.abs() < EPS {
    return solve_cubic(c3, c2, c1, c0, accept_double);
  }

  // Biquadratic: c1 == c3 == 0.
  if c3.abs() < EPS && c1.abs() < EPS {
    if c2.abs() < EPS && c0.abs() < EPS {
      return if accept_double { vec![0.0] } else { Vec::new() };
    }
    let disc = c2 * c2 - 4.0 * c4 * c0;
    if disc < 0.0 || (disc == 0.0 && !accept_double) {
      return Vec::new();
    }
    if disc == 0.0 {
      let sol = -c2 / (2.0 * c4);
      if sol < 0.0 {
        return Vec::new();
      }
      return vec![sol.sqrt(), -sol.sqrt()];
    }
    let mut out = Vec::new();
    let s1 = (0.5 / c4) * (-c2 + disc.sqrt());
    let s2 = (0.5 / c4) * (-c2 - disc.sqrt());
    if s1 > 0.0 {
      out.push(s1.sqrt());
      out.push(-s1.sqrt());
    } else if s1 == 0.0 && accept_double {
      out.push(0.0);
    }
    if s2 > 0.0 {
      out.push(s2.sqrt());
      out.push(-s2.sqrt());
    }
    return out;
  }

  // Depress: y = x + c3/(4 c4).
  let b3 = 0.25 * c3 / c4;
  let p = c2 / c4 - 6.0 * b3 * b3;
  let q = c1 / c4 - 2.0 * c2 / c4 * b3 + 8.0 * b3 * b3 * b3;
  let r = c0 / c4 - c1 / c4 * b3 + c2 / c4 * b3 * b3 - 3.0 * b3 * b3 * b3 * b3;

  // For |q| in the double-precision noise floor the depressed quartic
  // is effectively biquadratic; recursing keeps the branch selection
  // stable.
  if q.abs() < FERRARI_Q_EPS {
    let mut ys = solve_quartic(1.0, 0.0, p, 0.0, r, accept_double);
    for y in &mut ys {
      *y -= b3;
    }
    return ys;
  }

  // u solves the resolvent cubic u^3 + 2p u^2 + (p^2 - 4r) u - q^2 = 0;
  // a real-coefficient cubic always yields at least one real u.
  let us = solve_cubic(1.0, 2.0 * p, p * p - 4.0 * r, -q * q, true);
  let mut u = us[0];
  u = refine_newton(0.0, 1.0, 2.0 * p, p * p - 4.0 * r, -q * q, u, 1e-12);

  if u >= 0.0 {
    let su = u.sqrt();
    let mut ys = solve_quadratic(1.0, -su, 0.5 * (p + u) + 0.5 * q * su / u, accept_double);
    ys.extend(solve_quadratic(
      1.0,
      su,
      0.5 * (p + u) - 0.5 * q * su / u,
      accept_double,
    ));
    for y in &mut ys {
      *y -= b3;
    }
    ys
  } else {
    // Negative u: both auxiliary quadratics pick up imaginary
    // coefficients; real roots fall out as the real parts.
    let im = Cx::new(0.0, 1.0);
    let cu = Cx::new(u, 0.0);
    let cq = Cx::new(q, 0.0);
    let cp = Cx::new(p, 0.0);
    let half = Cx::new(0.5, 0.0);
    let su = Cx::new(-u, 0.0).sqrt();
    let one = Cx::new(1.0, 0.0);
    let mut ys = solve_quadratic_cx(
      one,
      -(im * su),
      half * (cp + cu) + half * cq * im * su / cu,
      accept_double,
    );
    ys.extend(solve_quadratic_cx(
      one,
      im * su,
      half * (cp + cu) - half * cq * im * su / cu,
      accept_double,
    ));
    ys.into_iter().map(|y| y.re - b3).collect()
  }
}

#[cfg(test)]
#[path = "quartic_test.rs"]
mod quartic_test;

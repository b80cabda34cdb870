use super::*;

fn sorted(mut v: Vec<f64>) -> Vec<f64> {
  v.sort_by(|a, b| a.partial_cmp(b).unwrap());
  v
}

fn assert_roots(got: Vec<f64>, want: &[f64], tol: f64) {
  let got = sorted(got);
  assert_eq!(got.len(), want.len(), "root count: got {got:?}, want {want:?}");
  let mut want = want.to_vec();
  want.sort_by(|a, b| a.partial_cmp(b).unwrap());
  for (g, w) in got.iter().zip(want.iter()) {
    assert!((g - w).abs() < tol, "root {g} != {w} (got {got:?})");
  }
}

#[test]
fn quadratic_cases() {
  // Linear fallback.
  assert_roots(solve_quadratic(0.0, 5.0, 100.0, false), &[-20.0], 1e-12);
  // Double root only when accepted.
  assert_roots(solve_quadratic(1.0, 2.0, 1.0, true), &[-1.0], 1e-12);
  assert!(solve_quadratic(1.0, 2.0, 1.0, false).is_empty());
  // Complex pair yields nothing.
  assert!(solve_quadratic(1.0, 2.0, 4.0, true).is_empty());
  // Two real roots.
  let b = 10.0_f64;
  let disc = (b * b - 4.0 * 5.0).sqrt();
  assert_roots(
    solve_quadratic(5.0, b, 1.0, false),
    &[(-b + disc) / 10.0, (-b - disc) / 10.0],
    1e-10,
  );
}

#[test]
fn cubic_cases() {
  // Triple root of (x+2)^3.
  assert_roots(solve_cubic(1.0, 6.0, 12.0, 8.0, true), &[-2.0], 1e-6);
  assert!(solve_cubic(1.0, 6.0, 12.0, 8.0, false).is_empty());
  // (x-2)(x+2)^2: simple root without accept_double, both with.
  assert_roots(solve_cubic(1.0, 2.0, -4.0, -8.0, false), &[2.0], 1e-7);
  assert_roots(solve_cubic(1.0, 2.0, -4.0, -8.0, true), &[2.0, -2.0], 1e-7);
  // Scaled leading coefficient: 4(x-3)(x+2)^2.
  assert_roots(solve_cubic(4.0, 4.0, -32.0, -48.0, false), &[3.0], 1e-7);
  // One real + conjugate pair: (x-3)(x^2-2x+2).
  assert_roots(solve_cubic(1.0, -5.0, 8.0, -6.0, false), &[3.0], 1e-9);
  // Three distinct real roots: 3(x-4)(x-2)(x+3).
  assert_roots(solve_cubic(3.0, -9.0, -30.0, 72.0, false), &[4.0, 2.0, -3.0], 1e-8);
}

#[test]
fn biquadratic_cases() {
  // x^4 = 1.
  assert_roots(solve_quartic(1.0, 0.0, 0.0, 0.0, -1.0, true), &[1.0, -1.0], 1e-10);
  // x^4 - 8 x^2 + 16: double roots at +-2.
  assert_roots(solve_quartic(1.0, 0.0, -8.0, 0.0, 16.0, true), &[2.0, -2.0], 1e-10);
  assert!(solve_quartic(1.0, 0.0, -8.0, 0.0, 16.0, false).is_empty());
  // x^4 = 0.
  assert_roots(solve_quartic(1.0, 0.0, 0.0, 0.0, 0.0, true), &[0.0], 1e-12);
  assert!(solve_quartic(1.0, 0.0, 0.0, 0.0, 0.0, false).is_empty());
}

#[test]
fn quartic_four_real_roots() {
  // 2(x-5)(x-3)(x-1)(x+2).
  let sols = solve_quartic(2.0, -14.0, 10.0, 62.0, -60.0, true);
  assert_roots(sols, &[5.0, 3.0, 1.0, -2.0], 1e-6);
}

#[test]
fn quartic_double_roots() {
  // 3(x-2)^2 (x+3)^2.
  assert_roots(solve_quartic(3.0, 6.0, -33.0, -36.0, 108.0, true), &[2.0, -3.0], 1e-5);
  assert!(solve_quartic(3.0, 6.0, -33.0, -36.0, 108.0, false).is_empty());
}

#[test]
fn quartic_mixed_real_complex() {
  // 2(x-3)(x-4)(x^2+4): two real, one conjugate pair.
  assert_roots(solve_quartic(2.0, -14.0, 32.0, -56.0, 96.0, true), &[4.0, 3.0], 1e-6);
  // -2(x-2)^2 (x^2+13): one real double root.
  assert_roots(solve_quartic(-2.0, 8.0, -34.0, 104.0, -104.0, true), &[2.0], 1e-5);
  assert!(solve_quartic(-2.0, 8.0, -34.0, 104.0, -104.0, false).is_empty());
  // All complex: -2(x^2+5)(x^2+13).
  assert!(solve_quartic(-2.0, 0.0, -36.0, 0.0, -130.0, true).is_empty());
}

#[test]
fn newton_polish_reaches_ten_digits() {
  // Ill-conditioned quartic: raw Ferrari output drifts, the Newton
  // polish recovers the roots to ten decimals.
  let (c4, c3, c2, c1, c0) = (
    81.0000000000000711,
    -971.967600000000971,
    27060.1884043286518,
    -144861.519769971666,
    210336.31869343578,
  );
  let mut sols = solve_quartic(c4, c3, c2, c1, c0, true);
  for s in &mut sols {
    *s = refine_newton(c4, c3, c2, c1, c0, *s, 1e-12);
  }
  let sols = sorted(sols);
  let expects = [2.869014932042753, 3.1307873527391585];
  assert!(sols.len() >= 2, "lost roots: {sols:?}");
  for w in expects {
    assert!(
      sols.iter().any(|s| (s - w).abs() < 1e-10),
      "no root near {w} in {sols:?}"
    );
  }
}

#[test]
fn newton_polish_is_stationary_on_exact_roots() {
  // (x-7)(x-13) scaled to a quartic with c4=81 (a well-conditioned
  // relative of the drifting case above).
  let x = refine_newton(81.0, -3240.0, 79542.0, -942840.0, 3619161.0, 7.0005, 1e-12);
  assert!((x - 7.0).abs() < 1e-9);
}

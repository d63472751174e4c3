//! Scalar root finding.

/// Outcome of an iterative root search. `root` is always the last valid
/// iterate, even when the search did not converge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootResult {
    pub root: f64,
    pub iterations: usize,
    pub converged: bool,
}

const MIN_DERIVATIVE: f64 = 1e-12;

/// Newton-Raphson. Stops when the step falls below `tol` or after
/// `max_iter` steps; a derivative below 1e-12 in magnitude aborts with the
/// current iterate.
pub fn newton_raphson<F, D>(f: F, df: D, x0: f64, tol: f64, max_iter: usize) -> RootResult
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let mut x = x0;
    for i in 0..max_iter {
        let slope = df(x);
        if !slope.is_finite() || slope.abs() < MIN_DERIVATIVE {
            log::debug!("newton_raphson: vanishing derivative at x={}", x);
            return RootResult { root: x, iterations: i, converged: false };
        }
        let step = f(x) / slope;
        let next = x - step;
        if !next.is_finite() {
            return RootResult { root: x, iterations: i, converged: false };
        }
        x = next;
        if step.abs() < tol {
            return RootResult { root: x, iterations: i + 1, converged: true };
        }
    }
    RootResult { root: x, iterations: max_iter, converged: false }
}

/// Bisection on `[a, b]`. Without a sign change the midpoint is returned
/// unconverged.
pub fn bisection<F>(f: F, a: f64, b: f64, tol: f64, max_iter: usize) -> RootResult
where
    F: Fn(f64) -> f64,
{
    let (mut lo, mut hi) = if a <= b { (a, b) } else { (b, a) };
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if f_lo == 0.0 {
        return RootResult { root: lo, iterations: 0, converged: true };
    }
    if f_hi == 0.0 {
        return RootResult { root: hi, iterations: 0, converged: true };
    }
    if f_lo.signum() == f_hi.signum() {
        return RootResult { root: 0.5 * (lo + hi), iterations: 0, converged: false };
    }

    for i in 0..max_iter {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || 0.5 * (hi - lo) < tol {
            return RootResult { root: mid, iterations: i + 1, converged: true };
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    RootResult { root: 0.5 * (lo + hi), iterations: max_iter, converged: false }
}

/// Secant method from two starting points; same stopping rule as Newton.
pub fn secant<F>(f: F, x0: f64, x1: f64, tol: f64, max_iter: usize) -> RootResult
where
    F: Fn(f64) -> f64,
{
    let (mut prev, mut cur) = (x0, x1);
    let mut f_prev = f(prev);
    for i in 0..max_iter {
        let f_cur = f(cur);
        let denom = f_cur - f_prev;
        if denom.abs() < MIN_DERIVATIVE {
            return RootResult { root: cur, iterations: i, converged: f_cur.abs() < tol };
        }
        let step = f_cur * (cur - prev) / denom;
        let next = cur - step;
        if !next.is_finite() {
            return RootResult { root: cur, iterations: i, converged: false };
        }
        prev = cur;
        f_prev = f_cur;
        cur = next;
        if step.abs() < tol {
            return RootResult { root: cur, iterations: i + 1, converged: true };
        }
    }
    RootResult { root: cur, iterations: max_iter, converged: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn newton_finds_sqrt2() {
        let r = newton_raphson(|x| x * x - 2.0, |x| 2.0 * x, 1.0, 1e-12, 50);
        assert!(r.converged);
        assert_relative_eq!(r.root, std::f64::consts::SQRT_2, epsilon = 1e-10);
    }

    #[test]
    fn newton_aborts_on_flat_derivative() {
        let r = newton_raphson(|x| x * x + 1.0, |_| 0.0, 3.0, 1e-12, 50);
        assert!(!r.converged);
        assert_eq!(r.root, 3.0);
    }

    #[test]
    fn bisection_brackets() {
        let r = bisection(|x| x.powi(3) - x - 2.0, 1.0, 2.0, 1e-10, 200);
        assert!(r.converged);
        assert_relative_eq!(r.root, 1.521_379_706_804_567_6, epsilon = 1e-8);
    }

    #[test]
    fn bisection_without_sign_change_returns_midpoint() {
        let r = bisection(|x| x * x + 1.0, -1.0, 3.0, 1e-10, 100);
        assert!(!r.converged);
        assert_eq!(r.root, 1.0);
    }

    #[test]
    fn secant_matches_newton() {
        let r = secant(|x| x.cos() - x, 0.0, 1.0, 1e-12, 100);
        assert!(r.converged);
        assert_relative_eq!(r.root, 0.739_085_133_215_160_6, epsilon = 1e-9);
    }
}

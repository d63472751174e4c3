//! Polynomial and spline interpolation.

use super::EPSILON;

/// Lagrange form evaluated at `x`. Terms whose basis denominator vanishes
/// (repeated abscissae) are skipped.
pub fn lagrange(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len().min(ys.len());
    let mut result = 0.0;
    for i in 0..n {
        let mut term = ys[i];
        let mut degenerate = false;
        for j in 0..n {
            if i == j {
                continue;
            }
            let denom = xs[i] - xs[j];
            if denom.abs() < EPSILON {
                degenerate = true;
                break;
            }
            term *= (x - xs[j]) / denom;
        }
        if !degenerate {
            result += term;
        }
    }
    result
}

/// Newton divided-difference coefficients `f[x0], f[x0,x1], ...`.
pub fn divided_differences(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len().min(ys.len());
    let mut coef: Vec<f64> = ys[..n].to_vec();
    for level in 1..n {
        for i in (level..n).rev() {
            let denom = xs[i] - xs[i - level];
            coef[i] = if denom.abs() < EPSILON {
                0.0
            } else {
                (coef[i] - coef[i - 1]) / denom
            };
        }
    }
    coef
}

/// Newton form evaluated at `x` (Horner scheme over the divided differences).
pub fn newton(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let coef = divided_differences(xs, ys);
    let n = coef.len();
    if n == 0 {
        return 0.0;
    }
    let mut result = coef[n - 1];
    for i in (0..n - 1).rev() {
        result = result * (x - xs[i]) + coef[i];
    }
    result
}

/// Natural cubic spline (second derivative zero at both ends).
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl CubicSpline {
    /// Build the spline through `(xs[i], ys[i])`. `xs` must be strictly
    /// increasing; fewer than two knots degrade to a constant.
    pub fn new(xs: &[f64], ys: &[f64]) -> Self {
        let n = xs.len().min(ys.len());
        let xs = xs[..n].to_vec();
        let ys = ys[..n].to_vec();
        if n < 3 {
            return Self { m: vec![0.0; n], xs, ys };
        }

        let h: Vec<f64> = xs.windows(2).map(|w| (w[1] - w[0]).max(EPSILON)).collect();

        // Tridiagonal system for interior second derivatives (Thomas algorithm).
        let size = n - 2;
        let mut diag = vec![0.0; size];
        let mut upper = vec![0.0; size];
        let mut lower = vec![0.0; size];
        let mut rhs = vec![0.0; size];
        for k in 0..size {
            let i = k + 1;
            lower[k] = h[i - 1];
            diag[k] = 2.0 * (h[i - 1] + h[i]);
            upper[k] = h[i];
            rhs[k] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }
        for k in 1..size {
            let w = lower[k] / diag[k - 1];
            diag[k] -= w * upper[k - 1];
            rhs[k] -= w * rhs[k - 1];
        }
        let mut interior = vec![0.0; size];
        interior[size - 1] = rhs[size - 1] / diag[size - 1];
        for k in (0..size - 1).rev() {
            interior[k] = (rhs[k] - upper[k] * interior[k + 1]) / diag[k];
        }

        let mut m = vec![0.0; n];
        m[1..n - 1].copy_from_slice(&interior);
        Self { xs, ys, m }
    }

    pub fn domain(&self) -> Option<(f64, f64)> {
        Some((*self.xs.first()?, *self.xs.last()?))
    }

    /// Evaluate at `x`. Points outside the knot range use the end segment.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        match n {
            0 => return 0.0,
            1 => return self.ys[0],
            2 => {
                let h = (self.xs[1] - self.xs[0]).max(EPSILON);
                let t = (x - self.xs[0]) / h;
                return self.ys[0] + t * (self.ys[1] - self.ys[0]);
            }
            _ => {}
        }

        let seg = match self.xs.partition_point(|&k| k <= x) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        };
        let (x0, x1) = (self.xs[seg], self.xs[seg + 1]);
        let (y0, y1) = (self.ys[seg], self.ys[seg + 1]);
        let (m0, m1) = (self.m[seg], self.m[seg + 1]);
        let h = (x1 - x0).max(EPSILON);
        let a = (x1 - x) / h;
        let b = (x - x0) / h;
        a * y0 + b * y1 + ((a.powi(3) - a) * m0 + (b.powi(3) - b) * m1) * h * h / 6.0
    }
}

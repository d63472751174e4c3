//! Least-squares curve fitting.

use ndarray::{Array1, Array2};

use super::linalg::gaussian_elimination;
use super::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    /// Ascending powers: c0 + c1 x + c2 x^2 + ...
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
}

impl PolynomialFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

/// `y = a * e^(b x)` or `y = a * x^b`, depending on the fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveFit {
    pub a: f64,
    pub b: f64,
    pub r_squared: f64,
}

fn r_squared(ys: &[f64], predicted: impl Iterator<Item = f64>) -> f64 {
    let n = ys.len();
    if n == 0 {
        return 0.0;
    }
    let mean = ys.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = ys.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = ys.iter().zip(predicted).map(|(y, p)| (y - p).powi(2)).sum();
    if ss_tot < EPSILON {
        return if ss_res < EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Ordinary least squares line. A vertical/degenerate point cloud yields
/// slope 0 through the mean.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> LinearFit {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return LinearFit { slope: 0.0, intercept: 0.0, r_squared: 0.0 };
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let nf = n as f64;
    let mx = xs.iter().sum::<f64>() / nf;
    let my = ys.iter().sum::<f64>() / nf;
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = if sxx < EPSILON { 0.0 } else { sxy / sxx };
    let intercept = my - slope * mx;
    let r2 = r_squared(ys, xs.iter().map(|x| slope * x + intercept));
    LinearFit { slope, intercept, r_squared: r2 }
}

/// Polynomial least squares via the Vandermonde normal equations.
pub fn polynomial_regression(xs: &[f64], ys: &[f64], degree: usize) -> PolynomialFit {
    let n = xs.len().min(ys.len());
    let terms = degree + 1;
    if n == 0 {
        return PolynomialFit { coefficients: vec![0.0; terms], r_squared: 0.0 };
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);

    let mut vandermonde = Array2::<f64>::zeros((n, terms));
    for (i, &x) in xs.iter().enumerate() {
        let mut p = 1.0;
        for j in 0..terms {
            vandermonde[[i, j]] = p;
            p *= x;
        }
    }
    let y = Array1::from(ys.to_vec());
    let vt = vandermonde.t();
    let normal = vt.dot(&vandermonde);
    let rhs = vt.dot(&y);
    let coefficients = gaussian_elimination(&normal, &rhs).to_vec();

    let fit = PolynomialFit { coefficients, r_squared: 0.0 };
    let r2 = r_squared(ys, xs.iter().map(|&x| fit.predict(x)));
    PolynomialFit { r_squared: r2, ..fit }
}

/// `y = a e^(b x)` by regressing `ln y` on `x`. Points with `y <= 0` are ignored.
pub fn exponential_regression(xs: &[f64], ys: &[f64]) -> CurveFit {
    let (lx, ly): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter(|&(_, &y)| y > 0.0)
        .map(|(&x, &y)| (x, y.ln()))
        .unzip();
    let line = linear_regression(&lx, &ly);
    CurveFit { a: line.intercept.exp(), b: line.slope, r_squared: line.r_squared }
}

/// `y = a x^b` by regressing `ln y` on `ln x`. Non-positive points are ignored.
pub fn power_regression(xs: &[f64], ys: &[f64]) -> CurveFit {
    let (lx, ly): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter(|&(&x, &y)| x > 0.0 && y > 0.0)
        .map(|(&x, &y)| (x.ln(), y.ln()))
        .unzip();
    let line = linear_regression(&lx, &ly);
    CurveFit { a: line.intercept.exp(), b: line.slope, r_squared: line.r_squared }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_scenario() {
        let fit = linear_regression(&[0.0, 1.0, 2.0, 3.0], &[0.0, 2.0, 4.0, 6.0]);
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn quadratic_recovered() {
        let xs: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 1.0 - 2.0 * x + 0.5 * x * x).collect();
        let fit = polynomial_regression(&xs, &ys, 2);
        assert_relative_eq!(fit.coefficients[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[1], -2.0, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[2], 0.5, epsilon = 1e-8);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn exponential_and_power() {
        let xs: Vec<f64> = (1..6).map(f64::from).collect();
        let exp_ys: Vec<f64> = xs.iter().map(|x| 2.0 * (0.3 * x).exp()).collect();
        let e = exponential_regression(&xs, &exp_ys);
        assert_relative_eq!(e.a, 2.0, epsilon = 1e-9);
        assert_relative_eq!(e.b, 0.3, epsilon = 1e-9);

        let pow_ys: Vec<f64> = xs.iter().map(|x| 1.5 * x.powf(1.7)).collect();
        let p = power_regression(&xs, &pow_ys);
        assert_relative_eq!(p.a, 1.5, epsilon = 1e-9);
        assert_relative_eq!(p.b, 1.7, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_x_gives_flat_line() {
        let fit = linear_regression(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]);
        assert_eq!(fit.slope, 0.0);
        assert_relative_eq!(fit.intercept, 2.0);
    }
}

//! Finite-difference derivatives of uniformly sampled sequences.
//!
//! Every function returns a vector the same length as its input. Edge
//! samples that the stencil cannot reach fall back to lower-order
//! one-sided formulas; inputs shorter than two samples yield zeros.

/// First-order forward difference; the last sample uses a backward step.
pub fn forward(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    if n < 2 || h == 0.0 {
        return vec![0.0; n];
    }
    let mut d: Vec<f64> = y.windows(2).map(|w| (w[1] - w[0]) / h).collect();
    d.push((y[n - 1] - y[n - 2]) / h);
    d
}

/// First-order backward difference; the first sample uses a forward step.
pub fn backward(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    if n < 2 || h == 0.0 {
        return vec![0.0; n];
    }
    let mut d = Vec::with_capacity(n);
    d.push((y[1] - y[0]) / h);
    d.extend(y.windows(2).map(|w| (w[1] - w[0]) / h));
    d
}

/// Second-order central difference with one-sided ends.
pub fn central(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    if n < 2 || h == 0.0 {
        return vec![0.0; n];
    }
    let mut d = vec![0.0; n];
    d[0] = (y[1] - y[0]) / h;
    d[n - 1] = (y[n - 1] - y[n - 2]) / h;
    for i in 1..n - 1 {
        d[i] = (y[i + 1] - y[i - 1]) / (2.0 * h);
    }
    d
}

/// Fourth-order five-point stencil. The two samples at each end fall back
/// to the central/one-sided formulas.
pub fn five_point(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    let mut d = central(y, h);
    if n < 5 || h == 0.0 {
        return d;
    }
    for i in 2..n - 2 {
        d[i] = (-y[i + 2] + 8.0 * y[i + 1] - 8.0 * y[i - 1] + y[i - 2]) / (12.0 * h);
    }
    d
}

/// Central second derivative; ends copy their nearest interior value.
pub fn second_derivative(y: &[f64], h: f64) -> Vec<f64> {
    let n = y.len();
    if n < 3 || h == 0.0 {
        return vec![0.0; n];
    }
    let h2 = h * h;
    let mut d = vec![0.0; n];
    for i in 1..n - 1 {
        d[i] = (y[i + 1] - 2.0 * y[i] + y[i - 1]) / h2;
    }
    d[0] = d[1];
    d[n - 1] = d[n - 2];
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cubic(h: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * h).powi(3)).collect()
    }

    #[test]
    fn lengths_preserved() {
        let y = [1.0, 2.0, 4.0, 7.0];
        assert_eq!(forward(&y, 1.0).len(), 4);
        assert_eq!(backward(&y, 1.0).len(), 4);
        assert_eq!(central(&y, 1.0).len(), 4);
        assert_eq!(five_point(&y, 1.0).len(), 4);
        assert_eq!(second_derivative(&y, 1.0).len(), 4);
    }

    #[test]
    fn linear_slope_is_exact() {
        let y: Vec<f64> = (0..6).map(|i| 3.0 * i as f64 * 0.5 + 1.0).collect();
        for d in [forward(&y, 0.5), backward(&y, 0.5), central(&y, 0.5), five_point(&y, 0.5)] {
            for v in d {
                assert_relative_eq!(v, 3.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn five_point_exact_on_cubic() {
        let h = 0.1;
        let y = cubic(h, 10);
        let d = five_point(&y, h);
        for i in 2..8 {
            let x = i as f64 * h;
            assert_relative_eq!(d[i], 3.0 * x * x, epsilon = 1e-9);
        }
    }

    #[test]
    fn second_derivative_of_parabola() {
        let y: Vec<f64> = (0..8).map(|i| (i as f64).powi(2)).collect();
        for v in second_derivative(&y, 1.0) {
            assert_relative_eq!(v, 2.0, epsilon = 1e-12);
        }
    }
}

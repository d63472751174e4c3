//! Numerical integration over uniform samples and of closures.

/// Composite trapezoidal rule with spacing `h`.
pub fn trapezoidal(y: &[f64], h: f64) -> f64 {
    if y.len() < 2 {
        return 0.0;
    }
    y.windows(2).map(|w| (w[0] + w[1]) * 0.5 * h).sum()
}

/// Composite Simpson 1/3 rule. With an odd number of intervals the first
/// `n - 1` points use Simpson and the last interval the trapezoid.
pub fn simpson(y: &[f64], h: f64) -> f64 {
    let n = y.len();
    if n < 3 {
        return trapezoidal(y, h);
    }
    let intervals = n - 1;
    if intervals % 2 == 1 {
        return simpson_even(&y[..n - 1], h) + trapezoidal(&y[n - 2..], h);
    }
    simpson_even(y, h)
}

fn simpson_even(y: &[f64], h: f64) -> f64 {
    let n = y.len();
    if n < 3 {
        return trapezoidal(y, h);
    }
    let mut sum = y[0] + y[n - 1];
    for (i, v) in y.iter().enumerate().take(n - 1).skip(1) {
        sum += if i % 2 == 1 { 4.0 * v } else { 2.0 * v };
    }
    sum * h / 3.0
}

/// Composite Simpson 3/8 rule; falls back to 1/3 when the interval count
/// is not a multiple of three.
pub fn simpson_38(y: &[f64], h: f64) -> f64 {
    let n = y.len();
    if n < 4 || (n - 1) % 3 != 0 {
        return simpson(y, h);
    }
    let mut sum = y[0] + y[n - 1];
    for (i, v) in y.iter().enumerate().take(n - 1).skip(1) {
        sum += if i % 3 == 0 { 2.0 * v } else { 3.0 * v };
    }
    sum * 3.0 * h / 8.0
}

/// Romberg integration of `f` on `[a, b]` with `max_iterations` levels of
/// Richardson extrapolation. Returns the most extrapolated estimate.
pub fn romberg<F>(f: F, a: f64, b: f64, max_iterations: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    let levels = max_iterations.max(1);
    let mut prev = vec![0.5 * (b - a) * (f(a) + f(b))];
    for k in 1..levels {
        let steps = 1usize << k;
        let h = (b - a) / steps as f64;
        let midpoints: f64 = (1..steps).step_by(2).map(|i| f(a + i as f64 * h)).sum();
        let mut row = Vec::with_capacity(k + 1);
        row.push(0.5 * prev[0] + h * midpoints);
        for j in 1..=k {
            let factor = 4f64.powi(j as i32);
            row.push((factor * row[j - 1] - prev[j - 1]) / (factor - 1.0));
        }
        prev = row;
    }
    prev[prev.len() - 1]
}

/// Running trapezoidal integral; output[0] = 0 and output has the input's length.
pub fn cumulative_trapezoidal(y: &[f64], h: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(y.len());
    let mut acc = 0.0;
    for (i, v) in y.iter().enumerate() {
        if i > 0 {
            acc += (y[i - 1] + v) * 0.5 * h;
        }
        out.push(acc);
    }
    out
}

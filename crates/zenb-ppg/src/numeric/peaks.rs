//! Derivative-based peak detection with a prominence filter.

/// A detected local maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub value: f64,
    /// Height above the higher of the two adjacent valley minima
    pub prominence: f64,
}

/// Local maxima where the first difference changes sign from + to - and
/// the discrete second derivative is negative, keeping only peaks whose
/// prominence reaches `min_prominence`.
pub fn find_peaks(y: &[f64], min_prominence: f64) -> Vec<Peak> {
    let n = y.len();
    if n < 3 {
        return Vec::new();
    }

    let candidates: Vec<usize> = (1..n - 1)
        .filter(|&i| {
            let rising = y[i] - y[i - 1] > 0.0;
            let falling = y[i + 1] - y[i] <= 0.0;
            let curvature = y[i + 1] - 2.0 * y[i] + y[i - 1];
            rising && falling && curvature < 0.0
        })
        .collect();

    let mut peaks = Vec::with_capacity(candidates.len());
    for (k, &i) in candidates.iter().enumerate() {
        let left_start = if k == 0 { 0 } else { candidates[k - 1] };
        let right_end = candidates.get(k + 1).copied().unwrap_or(n - 1);
        let left_min = y[left_start..=i].iter().copied().fold(f64::INFINITY, f64::min);
        let right_min = y[i..=right_end].iter().copied().fold(f64::INFINITY, f64::min);
        let prominence = y[i] - left_min.max(right_min);
        if prominence >= min_prominence {
            peaks.push(Peak { index: i, value: y[i], prominence });
        }
    }
    peaks
}

/// Local minima, reported with positive prominence (depth).
pub fn find_valleys(y: &[f64], min_prominence: f64) -> Vec<Peak> {
    let inverted: Vec<f64> = y.iter().map(|v| -v).collect();
    find_peaks(&inverted, min_prominence)
        .into_iter()
        .map(|p| Peak { value: -p.value, ..p })
        .collect()
}

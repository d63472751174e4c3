//! Dense linear algebra on small systems (normal equations, filter design).

use ndarray::{Array1, Array2};

use super::PIVOT_EPSILON;
use crate::error::{PpgError, Result};

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// Columns whose best pivot is near zero are skipped and their unknown is
/// left at 0, so a singular system yields a best-effort answer instead of
/// an error.
pub fn gaussian_elimination(a: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = a.nrows().min(a.ncols()).min(b.len());
    let mut m = a.slice(ndarray::s![..n, ..n]).to_owned();
    let mut rhs = b.slice(ndarray::s![..n]).to_owned();
    let mut pivot_of_row = vec![None; n];

    let mut row = 0;
    for col in 0..n {
        if row >= n {
            break;
        }
        let best = (row..n)
            .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
            .unwrap_or(row);
        if m[[best, col]].abs() < PIVOT_EPSILON {
            log::debug!("gaussian_elimination: skipping near-zero pivot in column {}", col);
            continue;
        }
        if best != row {
            for k in 0..n {
                m.swap([best, k], [row, k]);
            }
            rhs.swap(best, row);
        }
        for i in row + 1..n {
            let factor = m[[i, col]] / m[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[i, k]] -= factor * m[[row, k]];
            }
            rhs[i] -= factor * rhs[row];
        }
        pivot_of_row[row] = Some(col);
        row += 1;
    }

    let mut x = Array1::zeros(n);
    for r in (0..n).rev() {
        if let Some(col) = pivot_of_row[r] {
            let mut acc = rhs[r];
            for k in col + 1..n {
                acc -= m[[r, k]] * x[k];
            }
            x[col] = acc / m[[r, col]];
        }
    }
    x
}

/// Doolittle LU decomposition, `A = L U` with unit-diagonal `L`. No
/// pivoting; a vanishing pivot leaves the corresponding column of `L` at 0.
pub fn lu_decomposition(a: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let n = a.nrows().min(a.ncols());
    let mut l = Array2::eye(n);
    let mut u = Array2::zeros((n, n));
    for i in 0..n {
        for k in i..n {
            let sum: f64 = (0..i).map(|j| l[[i, j]] * u[[j, k]]).sum();
            u[[i, k]] = a[[i, k]] - sum;
        }
        for k in i + 1..n {
            if u[[i, i]].abs() < PIVOT_EPSILON {
                l[[k, i]] = 0.0;
                continue;
            }
            let sum: f64 = (0..i).map(|j| l[[k, j]] * u[[j, i]]).sum();
            l[[k, i]] = (a[[k, i]] - sum) / u[[i, i]];
        }
    }
    (l, u)
}

/// Gauss-Jordan inversion with partial pivoting.
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(PpgError::NumericInstability(format!(
            "cannot invert non-square {}x{} matrix",
            a.nrows(),
            a.ncols()
        )));
    }
    let mut m = a.clone();
    let mut inv: Array2<f64> = Array2::eye(n);
    for col in 0..n {
        let best = (col..n)
            .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
            .unwrap_or(col);
        if m[[best, col]].abs() < PIVOT_EPSILON {
            return Err(PpgError::NumericInstability(format!(
                "singular matrix at column {}",
                col
            )));
        }
        if best != col {
            for k in 0..n {
                m.swap([best, k], [col, k]);
                inv.swap([best, k], [col, k]);
            }
        }
        let pivot = m[[col, col]];
        for k in 0..n {
            m[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }
        for i in 0..n {
            if i == col {
                continue;
            }
            let factor = m[[i, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                m[[i, k]] -= factor * m[[col, k]];
                inv[[i, k]] -= factor * inv[[col, k]];
            }
        }
    }
    Ok(inv)
}

//! Moment statistics, correlation and the small dense linear algebra the
//! pipeline needs (component counts are tens to a few hundred, so plain
//! Gauss–Jordan and Jacobi sweeps are adequate).
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{IcaError, Result};

/// Central moments m2, m3, m4 (biased, `/ n`).
fn central_moments(x: ArrayView1<f64>) -> (f64, f64, f64) {
    let n = x.len() as f64;
    let mean = x.sum() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &v in x.iter() {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Bias-corrected sample skewness `G1`, matching `scipy.stats.skew(bias=False)`.
///
/// Returns NaN for a constant signal.
pub fn skewness(x: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    let (m2, m3, _) = central_moments(x);
    if m2 <= 0.0 {
        return f64::NAN;
    }
    let g1 = m3 / m2.powf(1.5);
    g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
}

/// Bias-corrected excess kurtosis `G2`, matching
/// `scipy.stats.kurtosis(fisher=True, bias=False)`.
///
/// Returns NaN for a constant signal.
pub fn excess_kurtosis(x: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    let (m2, _, m4) = central_moments(x);
    if m2 <= 0.0 {
        return f64::NAN;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

/// Pearson correlation of every row of `a` ([P, T]) against every row of
/// `b` ([Q, T]); returns [P, Q]. Rows with zero variance give NaN.
pub fn cross_correlation(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array2<f64> {
    let za = standardize_rows(a);
    let zb = standardize_rows(b);
    za.dot(&zb.t())
}

/// Rows centered and scaled to unit Euclidean norm, so that a dot product
/// of two rows is their correlation coefficient.
fn standardize_rows(x: ArrayView2<f64>) -> Array2<f64> {
    let mut out = x.to_owned();
    for mut row in out.rows_mut() {
        let mean = row.mean().unwrap_or(0.0);
        row.mapv_inplace(|v| v - mean);
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        } else {
            row.fill(f64::NAN);
        }
    }
    out
}

/// Sample covariance of the rows of `x` ([N, T]), `ddof = 1`.
pub fn covariance(x: ArrayView2<f64>) -> Array2<f64> {
    let n_t = x.ncols();
    let means = x.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(x.nrows()));
    let centered = &x - &means.insert_axis(Axis(1));
    centered.dot(&centered.t()) / (n_t.saturating_sub(1).max(1)) as f64
}

/// Invert a square matrix by Gauss–Jordan elimination with partial pivoting.
pub fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(IcaError::Linalg(format!(
            "cannot invert non-square {}x{} matrix",
            n,
            matrix.ncols()
        )));
    }

    // Augmented matrix [A | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    aug.slice_mut(ndarray::s![.., ..n]).assign(matrix);
    for i in 0..n {
        aug[[i, n + i]] = 1.0;
    }

    let scale = matrix.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);
    for i in 0..n {
        let pivot_row = (i..n)
            .max_by(|&a, &b| aug[[a, i]].abs().total_cmp(&aug[[b, i]].abs()))
            .unwrap_or(i);
        if pivot_row != i {
            for j in 0..2 * n {
                aug.swap([i, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[i, i]];
        if pivot.abs() < 1e-12 * scale {
            return Err(IcaError::Linalg("matrix is singular or nearly singular".into()));
        }
        for j in 0..2 * n {
            aug[[i, j]] /= pivot;
        }

        for k in 0..n {
            if k != i {
                let factor = aug[[k, i]];
                if factor != 0.0 {
                    for j in 0..2 * n {
                        aug[[k, j]] -= factor * aug[[i, j]];
                    }
                }
            }
        }
    }

    Ok(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Eigenvalues of a symmetric matrix (cyclic Jacobi rotations), ascending.
pub fn symmetric_eigenvalues(matrix: &Array2<f64>) -> Result<Array1<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(IcaError::Linalg("eigenvalues need a square matrix".into()));
    }
    let mut a = matrix.clone();
    let frob = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let tol = 1e-14 * frob.max(f64::MIN_POSITIVE);

    for _sweep in 0..100 {
        let off: f64 = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum::<f64>()
            .sqrt();
        if off < tol {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                // Rotation zeroing a[p][q].
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
            }
        }
    }

    let mut d: Vec<f64> = a.diag().to_vec();
    d.sort_by(f64::total_cmp);
    Ok(Array1::from(d))
}

//! Two-parameter spectral models and their least-squares fits.
//!
//! - `linear`: `x = a + b·f`, closed-form least squares.
//! - `powlaw`: `x = a·f^b`, started from a straight-line fit in log-log
//!   space and refined with Levenberg–Marquardt on the linear-scale
//!   residuals.
use std::str::FromStr;

use crate::error::{IcaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitKind {
    Linear,
    Powlaw,
}

impl FromStr for FitKind {
    type Err = IcaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(FitKind::Linear),
            "powlaw" => Ok(FitKind::Powlaw),
            _ => Err(IcaError::UnsupportedFitType(s.to_string())),
        }
    }
}

impl std::fmt::Display for FitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FitKind::Linear => "linear",
            FitKind::Powlaw => "powlaw",
        })
    }
}

/// A fitted model: `coef = [a, b]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Model {
    pub kind: FitKind,
    pub coef: [f64; 2],
}

impl Model {
    pub fn eval(&self, f: f64) -> f64 {
        let [a, b] = self.coef;
        match self.kind {
            FitKind::Linear => a + b * f,
            FitKind::Powlaw => a * f.powf(b),
        }
    }

    /// Fit `kind` to the samples `(f[i], x[i])`.
    pub fn fit(kind: FitKind, f: &[f64], x: &[f64]) -> Result<Self> {
        let coef = match kind {
            FitKind::Linear => {
                let (a, b) = linear_regression(f, x)?;
                [a, b]
            }
            FitKind::Powlaw => fit_powlaw(f, x)?,
        };
        Ok(Model { kind, coef })
    }
}

/// Least-squares `(intercept, slope)` of `y` against `u`.
pub fn linear_regression(u: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let n = u.len();
    if n < 2 || n != y.len() {
        return Err(IcaError::shape(format!(
            "regression needs two or more paired samples, got {} and {}",
            n,
            y.len()
        )));
    }
    let mu = u.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let (mut suu, mut suy) = (0.0, 0.0);
    for (&ui, &yi) in u.iter().zip(y) {
        suu += (ui - mu) * (ui - mu);
        suy += (ui - mu) * (yi - my);
    }
    if suu <= 0.0 {
        return Err(IcaError::Linalg("regression abscissa is constant".into()));
    }
    let slope = suy / suu;
    Ok((my - slope * mu, slope))
}

fn fit_powlaw(f: &[f64], x: &[f64]) -> Result<[f64; 2]> {
    if f.iter().any(|&v| !(v > 0.0)) {
        return Err(IcaError::config("power-law fit needs strictly positive frequencies"));
    }

    let (lf, lx): (Vec<f64>, Vec<f64>) = f
        .iter()
        .zip(x)
        .filter(|&(_, &xi)| xi > 0.0)
        .map(|(&fi, &xi)| (fi.ln(), xi.ln()))
        .unzip();
    let init = match linear_regression(&lf, &lx) {
        Ok((intercept, slope)) => [intercept.exp(), slope],
        Err(_) => [x.iter().sum::<f64>() / x.len().max(1) as f64, 0.0],
    };

    Ok(levenberg_marquardt(
        |fi, [a, b]| a * fi.powf(b),
        |fi, [a, b]| {
            let p = fi.powf(b);
            [p, a * p * fi.ln()]
        },
        f,
        x,
        init,
    ))
}

const LM_MAX_ITER: usize = 200;
const LM_MAX_DAMPING_STEPS: usize = 20;
const LM_REL_TOL: f64 = 1e-12;

/// Minimize `Σ (x[i] − model(f[i], p))²` over the two parameters `p`.
///
/// `jacobian(f, p)` returns `[∂model/∂p0, ∂model/∂p1]`. Returns the best
/// parameters found; never fails, a degenerate problem returns `init`.
pub fn levenberg_marquardt<M, J>(model: M, jacobian: J, f: &[f64], x: &[f64], init: [f64; 2]) -> [f64; 2]
where
    M: Fn(f64, [f64; 2]) -> f64,
    J: Fn(f64, [f64; 2]) -> [f64; 2],
{
    let sse = |p: [f64; 2]| -> f64 {
        f.iter().zip(x).map(|(&fi, &xi)| (xi - model(fi, p)).powi(2)).sum()
    };

    let mut p = init;
    let mut cost = sse(p);
    if !cost.is_finite() {
        return p;
    }
    let mut lambda = 1e-3;

    for _ in 0..LM_MAX_ITER {
        // Normal equations Jᵀ J δ = Jᵀ r.
        let (mut h00, mut h01, mut h11, mut g0, mut g1) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (&fi, &xi) in f.iter().zip(x) {
            let [j0, j1] = jacobian(fi, p);
            let r = xi - model(fi, p);
            h00 += j0 * j0;
            h01 += j0 * j1;
            h11 += j1 * j1;
            g0 += j0 * r;
            g1 += j1 * r;
        }

        let mut improved = false;
        for _ in 0..LM_MAX_DAMPING_STEPS {
            let a00 = h00 * (1.0 + lambda);
            let a11 = h11 * (1.0 + lambda);
            let det = a00 * a11 - h01 * h01;
            if det.abs() > f64::MIN_POSITIVE && det.is_finite() {
                let cand = [p[0] + (a11 * g0 - h01 * g1) / det, p[1] + (a00 * g1 - h01 * g0) / det];
                let c = sse(cand);
                if c.is_finite() && c < cost {
                    let gain = cost - c;
                    p = cand;
                    cost = c;
                    lambda = (lambda / 10.0).max(1e-12);
                    improved = gain > LM_REL_TOL * c.max(f64::MIN_POSITIVE);
                    break;
                }
            }
            lambda *= 10.0;
        }
        if !improved {
            break;
        }
    }
    p
}

/// Normalized residual energy `Σ(x − x̂)² / Σx²`.
pub fn goodness_of_fit(x: &[f64], fitted: &[f64]) -> f64 {
    let resid: f64 = x.iter().zip(fitted).map(|(a, b)| (a - b).powi(2)).sum();
    let energy: f64 = x.iter().map(|a| a * a).sum();
    resid / energy
}

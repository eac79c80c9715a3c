//! Suggested number of components from the eigenvalue spectrum of the
//! normalized data covariance.
//!
//! Eigenvalues `D` are sorted ascending and a cutoff index `n` is chosen:
//! - `abs`:    first `D[n] ≥ param`
//! - `maxrel`: first `D[n] ≥ max(D) / param`
//! - `rel`:    one past the last `i` with `D[i+1] / D[i] ≥ param`
//!
//! `n` counts the eigenvalues treated as noise, and the suggestion is
//! `ndof = N − n`. Confirming or overriding it is up to
//! the caller.
use crate::config::{NdofConfig, NdofMethod};
use crate::error::{IcaError, Result};
use crate::normalize::{apply_scale, channel_scale};
use crate::signal::Signal;
use crate::stats::{covariance, symmetric_eigenvalues};

#[derive(Debug, Clone, PartialEq)]
pub struct NdofEstimate {
    /// Suggested number of eigendirections to keep.
    pub ndof: usize,
    /// Covariance eigenvalues, ascending.
    pub eigenvalues: Vec<f64>,
    /// `D[i+1] / D[i]`.
    pub ratios: Vec<f64>,
    /// Eigenvalue threshold for `abs`/`maxrel`, ratio threshold for `rel`.
    pub cutoff: f64,
    /// Index `n` of the cutoff in `eigenvalues`.
    pub index: usize,
}

/// Suggest how many eigendirections of `data` carry signal.
///
/// Under `abs` and `maxrel`, when no eigenvalue reaches the cutoff every
/// direction counts as noise: `index` is `N` and `ndof` is 0. Under `rel`,
/// when no ratio reaches `param` nothing counts as noise and `ndof` is `N`.
pub fn estimate_ndof(data: &Signal, cfg: &NdofConfig) -> Result<NdofEstimate> {
    if !(cfg.param > 0.0 && cfg.param.is_finite()) {
        return Err(IcaError::config(format!("cutoff parameter must be positive, got {}", cfg.param)));
    }
    let x = data.concatenated();
    let n_ch = x.nrows();

    log::info!("normalizing data");
    let scale = channel_scale(&x, cfg.normalize.as_deref())?;
    let x = apply_scale(&x, &scale);

    log::info!("computing covariance eigenvalues of {n_ch} channels");
    let d = symmetric_eigenvalues(&covariance(x.view()))?.to_vec();
    let ratios: Vec<f64> = d.windows(2).map(|w| w[1] / w[0]).collect();

    let (cutoff, index) = match cfg.method {
        NdofMethod::Abs | NdofMethod::Maxrel => {
            let cutoff = if cfg.method == NdofMethod::Abs {
                cfg.param
            } else {
                d.last().copied().unwrap_or(0.0) / cfg.param
            };
            let index = match d.iter().position(|&v| v >= cutoff) {
                Some(i) => i,
                None => {
                    log::warn!("no eigenvalue reaches {cutoff:e}; every direction is noise");
                    n_ch
                }
            };
            (cutoff, index)
        }
        NdofMethod::Rel => {
            // Everything up to and including the low side of the jump is noise.
            let index = match ratios.iter().rposition(|&r| r >= cfg.param) {
                Some(i) => i + 1,
                None => {
                    log::warn!("no eigenvalue jump of {} or more; keeping all directions", cfg.param);
                    0
                }
            };
            (cfg.param, index)
        }
    };

    let ndof = n_ch - index;
    log::info!("estimated {ndof} largest eigendirections");
    Ok(NdofEstimate { ndof, eigenvalues: d, ratios, cutoff, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 4 channels carrying 2 strong sources plus faint independent noise.
    fn low_rank() -> Signal {
        let n = 2000;
        let x = Array2::from_shape_fn((4, n), |(c, t)| {
            let t = t as f64;
            let s1 = (t * 0.013).sin();
            let s2 = (t * 0.071).cos();
            let faint = 1e-4 * ((t * (0.5 + c as f64 * 0.37)).sin());
            match c {
                0 => s1 + faint,
                1 => s2 + faint,
                2 => s1 - s2 + faint,
                _ => 2.0 * s1 + 0.5 * s2 + faint,
            }
        });
        Signal::from(x)
    }

    #[test]
    fn relative_jump_finds_two_directions() {
        let est = estimate_ndof(&low_rank(), &NdofConfig::default()).unwrap();
        assert_eq!(est.ndof, 2);
        assert!(est.eigenvalues.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(est.ratios.len(), 3);
    }

    #[test]
    fn maxrel_and_abs_agree_on_clear_gap() {
        let cfg = NdofConfig { method: NdofMethod::Maxrel, param: 1e3, ..NdofConfig::default() };
        assert_eq!(estimate_ndof(&low_rank(), &cfg).unwrap().ndof, 2);
        let cfg = NdofConfig { method: NdofMethod::Abs, param: 1e-2, ..NdofConfig::default() };
        assert_eq!(estimate_ndof(&low_rank(), &cfg).unwrap().ndof, 2);
    }

    #[test]
    fn unreachable_cutoff_keeps_nothing() {
        let cfg = NdofConfig { method: NdofMethod::Abs, param: 1e9, ..NdofConfig::default() };
        let est = estimate_ndof(&low_rank(), &cfg).unwrap();
        assert_eq!(est.index, 4);
        assert_eq!(est.ndof, 0);
    }

    #[test]
    fn no_jump_keeps_everything() {
        let cfg = NdofConfig { method: NdofMethod::Rel, param: 1e15, ..NdofConfig::default() };
        let est = estimate_ndof(&low_rank(), &cfg).unwrap();
        assert_eq!(est.index, 0);
        assert_eq!(est.ndof, 4);
    }

    #[test]
    fn non_positive_param_is_rejected() {
        let cfg = NdofConfig { param: 0.0, ..NdofConfig::default() };
        assert!(matches!(estimate_ndof(&low_rank(), &cfg), Err(IcaError::Config(_))));
    }
}

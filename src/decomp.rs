//! Temporal ICA estimation.
//!
//! The decomposition itself sits behind [`Decomposer`]; this module owns
//! what surrounds it: per-channel normalization before the call and the
//! restoration of physical units afterwards.
//!
//! ```text
//! sig [N, T] ──÷ scale──► Decomposer ──► (A, W, S)
//!                                          │
//!                 A *= scale[:, None] ◄────┤
//!                 W /= scale[None, :] ◄────┘
//! ```
use linfa::prelude::*;
use linfa_ica::fast_ica::{FastIca, GFunc};
use ndarray::{Array2, ArrayView2, Axis};

use crate::config::{Contrast, DecompConfig, FastIcaConfig};
use crate::error::{IcaError, Result};
use crate::ic::IndependentComponents;
use crate::normalize::{apply_scale, channel_scale, restore_units};
use crate::signal::Signal;
use crate::stats::invert;

/// Raw output of a decomposition backend, in the units it was given.
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// `[N, K]`
    pub mixing: Array2<f64>,
    /// `[K, N]`
    pub unmixing: Array2<f64>,
    /// `[K, T]`
    pub sources: Array2<f64>,
}

/// A temporal ICA capability: `[N, T]` signal in, `(A, W, S)` out.
pub trait Decomposer {
    fn decompose(&self, signal: ArrayView2<f64>) -> Result<Decomposition>;
}

/// FastICA through `linfa-ica`.
#[derive(Debug, Clone, Default)]
pub struct FastIcaDecomposer {
    pub params: FastIcaConfig,
}

impl FastIcaDecomposer {
    pub fn new(params: FastIcaConfig) -> Self {
        Self { params }
    }
}

impl Decomposer for FastIcaDecomposer {
    fn decompose(&self, signal: ArrayView2<f64>) -> Result<Decomposition> {
        let (n_ch, n_t) = signal.dim();
        let n_components = self.params.components_for(n_ch);
        if n_components == 0 || n_components > n_ch {
            return Err(IcaError::config(format!(
                "number of components ({n_components}) must be in 1..={n_ch}"
            )));
        }

        // linfa works on [samples, features].
        let data_matrix = center_columns(signal.t().to_owned());
        let dataset = DatasetBase::from(data_matrix.clone());

        let gfunc = match self.params.contrast {
            Contrast::Logcosh => GFunc::Logcosh(1.0),
            Contrast::Exp => GFunc::Exp,
            Contrast::Cube => GFunc::Cube,
        };
        let mut ica = FastIca::<f64>::params()
            .ncomponents(n_components)
            .gfunc(gfunc)
            .max_iter(self.params.max_iter)
            .tol(self.params.tol);
        if let Some(seed) = self.params.random_state {
            ica = ica.random_state(seed);
        }

        log::debug!(
            "FastICA: {n_components} components from {n_ch} channels x {n_t} samples \
             (max_iter={}, tol={})",
            self.params.max_iter,
            self.params.tol
        );
        let fitted = ica
            .fit(&dataset)
            .map_err(|e| IcaError::Decomposition(format!("FastICA failed: {e:?}")))?;
        let sources = fitted.predict(&data_matrix); // [T, K]

        let (mixing, unmixing) = mixing_unmixing(&data_matrix, &sources)?;
        Ok(Decomposition { mixing, unmixing, sources: sources.reversed_axes() })
    }
}

/// Subtract the mean of each column.
fn center_columns(mut data: Array2<f64>) -> Array2<f64> {
    if let Some(means) = data.mean_axis(Axis(0)) {
        data -= &means.insert_axis(Axis(0));
    }
    data
}

/// Least-squares mixing and its pseudo-inverse.
///
/// With `X = S Aᵀ` (`X` [T, N], `S` [T, K]):
/// `A = Xᵀ S (SᵀS)⁻¹` and `W = (AᵀA)⁻¹ Aᵀ`.
fn mixing_unmixing(data: &Array2<f64>, sources: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
    let sts_inv = invert(&sources.t().dot(sources))?;
    let mixing = data.t().dot(sources).dot(&sts_inv);

    let ata_inv = invert(&mixing.t().dot(&mixing))?;
    let unmixing = ata_inv.dot(&mixing.t());
    Ok((mixing, unmixing))
}

/// Normalize `sig` ([N, T]), decompose it, and return the IC record in
/// physical units.
pub fn decompose(
    sig: &Array2<f64>,
    cfg: &DecompConfig,
    decomposer: &dyn Decomposer,
) -> Result<IndependentComponents> {
    let (n_ch, n_t) = sig.dim();
    if n_ch == 0 || n_t == 0 {
        return Err(IcaError::shape(format!("empty signal matrix [{n_ch}, {n_t}]")));
    }

    log::info!("normalizing data units");
    let scale = channel_scale(sig, cfg.normalize.as_deref())?;
    let scaled = apply_scale(sig, &scale);

    log::info!("running temporal ICA on {n_ch} channels x {n_t} samples");
    let Decomposition { mut mixing, mut unmixing, sources } = decomposer.decompose(scaled.view())?;

    let n_ic = sources.nrows();
    if mixing.dim() != (n_ch, n_ic) || unmixing.dim() != (n_ic, n_ch) || sources.ncols() != n_t {
        return Err(IcaError::shape(format!(
            "decomposer returned A {:?}, W {:?}, S {:?} for a [{n_ch}, {n_t}] signal",
            mixing.shape(),
            unmixing.shape(),
            sources.shape()
        )));
    }

    log::info!("restoring original data units");
    restore_units(&mut mixing, &mut unmixing, &scale);

    IndependentComponents::new(mixing, unmixing, Signal::Continuous(sources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    /// Returns the (scaled) signal itself as sources with identity mixing.
    struct Identity;

    impl Decomposer for Identity {
        fn decompose(&self, signal: ArrayView2<f64>) -> Result<Decomposition> {
            let n = signal.nrows();
            Ok(Decomposition {
                mixing: Array2::eye(n),
                unmixing: Array2::eye(n),
                sources: signal.to_owned(),
            })
        }
    }

    #[test]
    fn units_are_restored_around_the_decomposition() {
        let sig = array![[2.0, -2.0, 2.0, -2.0], [10.0, 0.0, -10.0, 0.0]];
        let cfg = DecompConfig { normalize: Some(vec![2.0, 10.0]), ..Default::default() };
        let ic = decompose(&sig, &cfg, &Identity).unwrap();

        // Sources are in normalized units, A carries the scale back.
        assert_eq!(ic.a, array![[2.0, 0.0], [0.0, 10.0]]);
        assert_eq!(ic.w, array![[0.5, 0.0], [0.0, 0.1]]);
        let recon = ic.a.dot(&ic.s.epochs()[0]);
        assert_eq!(recon, sig);
    }

    #[test]
    fn mixing_unmixing_recovers_known_mixture() {
        let t = 400;
        let s = Array2::from_shape_fn((t, 2), |(i, k)| {
            if k == 0 { (i as f64 * 0.05).sin() } else { ((i % 17) as f64 / 8.5) - 1.0 }
        });
        let a_true = array![[1.0, 0.5], [0.3, 2.0], [0.7, -1.0]];
        let x = s.dot(&a_true.t());
        let (a, w) = mixing_unmixing(&x, &s).unwrap();
        for (got, exp) in a.iter().zip(a_true.iter()) {
            approx::assert_abs_diff_eq!(*got, *exp, epsilon = 1e-9);
        }
        let wa = w.dot(&a);
        approx::assert_abs_diff_eq!(wa[[0, 0]], 1.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(wa[[0, 1]], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn fastica_unmixes_sine_and_square_wave() {
        let n_t = 2000;
        let s_true = Array2::from_shape_fn((2, n_t), |(k, t)| {
            if k == 0 {
                (t as f64 * 0.05).sin()
            } else if (t / 37) % 2 == 0 {
                1.0
            } else {
                -1.0
            }
        });
        let x = array![[1.0, 0.6], [0.4, 1.0]].dot(&s_true);
        let dec = FastIcaDecomposer::new(FastIcaConfig { random_state: Some(0), ..Default::default() });
        let Decomposition { mixing, unmixing, sources } = dec.decompose(x.view()).unwrap();

        assert_eq!(mixing.dim(), (2, 2));
        assert_eq!(unmixing.dim(), (2, 2));
        assert_eq!(sources.dim(), (2, n_t));

        let wa = unmixing.dot(&mixing);
        for ((i, j), v) in wa.indexed_iter() {
            approx::assert_abs_diff_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-8);
        }

        let means = x.mean_axis(Axis(1)).unwrap();
        let centered = &x - &means.insert_axis(Axis(1));
        let rebuilt = mixing.dot(&sources);
        for (got, exp) in rebuilt.iter().zip(centered.iter()) {
            approx::assert_abs_diff_eq!(*got, *exp, epsilon = 1e-8);
        }
    }

    #[test]
    fn too_many_components_is_a_config_error() {
        let sig = Array2::from_shape_fn((2, 100), |(c, t)| ((c + 1) as f64 * t as f64 * 0.1).sin());
        let dec = FastIcaDecomposer::new(FastIcaConfig { n_components: Some(3), ..Default::default() });
        assert!(matches!(dec.decompose(sig.view()), Err(IcaError::Config(_))));
    }
}

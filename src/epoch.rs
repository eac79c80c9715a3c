//! Epoch concatenation and restoration.
//!
//! ICA works on a continuous `[N, T]` matrix, so trial-segmented data
//! `[K, N, T]` is baseline corrected per epoch and laid end to end along
//! time (`[N, K·T]`). [`restore_epochs`] is the inverse reshape.
use ndarray::{s, Array2, Array3};

use crate::error::{IcaError, Result};
use crate::normalize::baseline_correct_inplace;

/// `[K, N, T]` → `[N, K·T]`, removing each epoch's per-row mean first.
pub fn concat_epochs(epochs: &Array3<f64>) -> Array2<f64> {
    let mut corrected = epochs.clone();
    baseline_correct_inplace(&mut corrected);

    let (n_e, n_r, n_t) = corrected.dim();
    let mut out = Array2::<f64>::zeros((n_r, n_e * n_t));
    for e in 0..n_e {
        out.slice_mut(s![.., e * n_t..(e + 1) * n_t])
            .assign(&corrected.slice(s![e, .., ..]));
    }
    out
}

/// `[N, K·T]` → `[K, N, T]`.
///
/// Fails when the time axis is not a whole multiple of `n_epochs`.
pub fn restore_epochs(data: &Array2<f64>, n_epochs: usize) -> Result<Array3<f64>> {
    let (n_r, n_total) = data.dim();
    if n_epochs == 0 || n_total % n_epochs != 0 {
        return Err(IcaError::shape(format!(
            "cannot split {n_total} samples into {n_epochs} equal epochs"
        )));
    }
    let n_t = n_total / n_epochs;

    let mut out = Array3::<f64>::zeros((n_epochs, n_r, n_t));
    for e in 0..n_epochs {
        out.slice_mut(s![e, .., ..])
            .assign(&data.slice(s![.., e * n_t..(e + 1) * n_t]));
    }
    Ok(out)
}

/// Split a continuous recording into baseline-corrected trials of
/// `epoch_samples` each, `[N, T]` → `[⌊T / L⌋, N, L]`.
///
/// A tail shorter than one trial is dropped. A zero length, or one longer
/// than the recording, is a configuration error.
pub fn epoch(data: &Array2<f64>, epoch_samples: usize) -> Result<Array3<f64>> {
    let n_t = data.ncols();
    if epoch_samples == 0 || epoch_samples > n_t {
        return Err(IcaError::config(format!(
            "epoch length {epoch_samples} does not fit a recording of {n_t} samples"
        )));
    }
    let n_epochs = n_t / epoch_samples;
    let used = n_epochs * epoch_samples;
    if used < n_t {
        log::debug!("dropping {} trailing samples", n_t - used);
    }

    let mut trials = restore_epochs(&data.slice(s![.., ..used]).to_owned(), n_epochs)?;
    baseline_correct_inplace(&mut trials);
    Ok(trials)
}

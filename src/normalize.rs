//! Per-channel scaling around the decomposition, and epoch baseline correction.
//!
//! `channel_scale`: temporal standard deviation per channel (`ddof = 1`)
//!   unless the caller supplies strictly positive factors.
//! `apply_scale`: data / scale[:, None] before ICA.
//! `restore_units`: A *= scale[:, None], W /= scale[None, :] after ICA, so
//!   the mixing matrix is expressed in the recording's physical units.
//! `baseline_correct_inplace`: for each epoch and row: x -= mean(x).
use ndarray::{s, Array1, Array2, Array3, Axis};

use crate::error::{IcaError, Result};

/// Per-channel scale factors for `data` ([N, T]).
pub fn channel_scale(data: &Array2<f64>, supplied: Option<&[f64]>) -> Result<Array1<f64>> {
    let (n_ch, n_t) = data.dim();

    if let Some(scale) = supplied {
        if scale.len() != n_ch {
            return Err(IcaError::config(format!(
                "normalization vector has {} entries, data has {n_ch} channels",
                scale.len()
            )));
        }
        if let Some(i) = scale.iter().position(|&v| !(v.is_finite() && v > 0.0)) {
            return Err(IcaError::config(format!(
                "normalization factor {i} is {} (must be finite and > 0)",
                scale[i]
            )));
        }
        return Ok(Array1::from(scale.to_vec()));
    }

    if n_t < 2 {
        return Err(IcaError::shape(format!(
            "need at least 2 samples per channel to estimate a scale, got {n_t}"
        )));
    }

    log::debug!("using temporal standard deviation of data");
    let std = data.std_axis(Axis(1), 1.0);
    if let Some(i) = std.iter().position(|&v| !(v > 0.0)) {
        return Err(IcaError::config(format!(
            "channel {i} has zero variance; supply explicit normalization factors"
        )));
    }
    Ok(std)
}

/// `data / scale[:, None]`.
pub fn apply_scale(data: &Array2<f64>, scale: &Array1<f64>) -> Array2<f64> {
    data / &scale.view().insert_axis(Axis(1))
}

/// Bring a decomposition of scaled data back to physical units.
///
/// `a`: [N, K] mixing, `w`: [K, N] unmixing, `scale`: [N].
pub fn restore_units(a: &mut Array2<f64>, w: &mut Array2<f64>, scale: &Array1<f64>) {
    *a *= &scale.view().insert_axis(Axis(1));
    *w /= &scale.view().insert_axis(Axis(0));
}

/// Per-row, per-epoch baseline correction.
/// `epochs`: [E, R, T]  →  epoch[e, r, :] -= mean(epoch[e, r, :])
pub fn baseline_correct_inplace(epochs: &mut Array3<f64>) {
    let (n_e, n_r, _n_t) = epochs.dim();
    for e in 0..n_e {
        for r in 0..n_r {
            let m = epochs.slice(s![e, r, ..]).mean().unwrap_or(0.0);
            epochs.slice_mut(s![e, r, ..]).mapv_inplace(|v| v - m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2, Array3};

    #[test]
    fn std_uses_unbiased_denominator() {
        // Samples 1, 2, 3, 4: ddof=1 variance is 5/3.
        let data = array![[1.0, 2.0, 3.0, 4.0]];
        let scale = channel_scale(&data, None).unwrap();
        approx::assert_abs_diff_eq!(scale[0], (5.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn supplied_scale_is_validated() {
        let data = Array2::<f64>::ones((3, 10));
        assert!(matches!(
            channel_scale(&data, Some(&[1.0, 2.0])),
            Err(IcaError::Config(_))
        ));
        assert!(matches!(
            channel_scale(&data, Some(&[1.0, 0.0, 2.0])),
            Err(IcaError::Config(_))
        ));
        let ok = channel_scale(&data, Some(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(ok.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn flat_channel_is_a_config_error() {
        let data = Array2::from_elem((2, 64), 7.0_f64);
        assert!(matches!(channel_scale(&data, None), Err(IcaError::Config(_))));
    }

    #[test]
    fn baseline_removes_per_row_mean() {
        let mut epochs = Array3::from_shape_fn((3, 8, 128), |(e, c, t)| {
            e as f64 * 10.0 + c as f64 * 5.0 + (t as f64 * 0.3).sin()
        });
        baseline_correct_inplace(&mut epochs);
        for e in 0..3usize {
            for c in 0..8usize {
                let m = epochs.slice(s![e, c, ..]).mean().unwrap();
                approx::assert_abs_diff_eq!(m, 0.0, epsilon = 1e-12);
            }
        }
    }
}

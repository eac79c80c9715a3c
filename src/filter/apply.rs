//! Frequency-domain application of a [`CosineFilter`].
//!
//! Each row `x` becomes `real(ifft(fft(x · win) · F))`. The multiplier is
//! real and even, so the result is real up to rounding.
use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

use super::design::CosineFilter;
use crate::error::{IcaError, Result};

/// Filter every row of `data` ([R, T]) in place.
pub fn apply_cosine_filter(data: &mut Array2<f64>, filt: &CosineFilter) -> Result<()> {
    let n_t = data.ncols();
    if filt.window.len() != n_t || filt.response.len() != n_t {
        return Err(IcaError::shape(format!(
            "filter designed for {} samples applied to rows of {n_t}",
            filt.response.len()
        )));
    }
    if n_t == 0 {
        return Ok(());
    }

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(n_t);
    let fft_inv = planner.plan_fft_inverse(n_t);
    let inv_scale = 1.0 / n_t as f64;

    let mut buf = vec![Complex::<f64>::default(); n_t];
    for mut row in data.rows_mut() {
        for ((b, &v), &w) in buf.iter_mut().zip(row.iter()).zip(filt.window.iter()) {
            *b = Complex { re: v * w, im: 0.0 };
        }
        fft_fwd.process(&mut buf);
        for (b, &h) in buf.iter_mut().zip(filt.response.iter()) {
            *b *= h;
        }
        fft_inv.process(&mut buf);
        for (o, b) in row.iter_mut().zip(buf.iter()) {
            *o = b.re * inv_scale;
        }
    }
    Ok(())
}

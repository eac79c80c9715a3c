//! Welch-style averaged power spectrum of component time courses.
//!
//! A window of `L` samples slides along time with a hop of
//! `round(L / overlap)`; the squared FFT magnitude of every complete window
//! is averaged. Epoched data is averaged once more across epochs. Only the
//! first `L / 2` bins are kept, divided by `L`.
use ndarray::{s, Array1, Array2, ArrayView2};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::SpectrumConfig;
use crate::error::{IcaError, Result};
use crate::ic::IndependentComponents;
use crate::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// `[rows, L/2]`
    pub powspctrm: Array2<f64>,
    /// `[L/2]`, Hz.
    pub freq: Array1<f64>,
}

/// Window length and hop for a signal of `n_t` samples.
fn window_and_step(cfg: &SpectrumConfig, n_t: usize) -> Result<(usize, usize)> {
    if !(cfg.sfreq > 0.0) {
        return Err(IcaError::config(format!("sampling frequency must be positive, got {}", cfg.sfreq)));
    }
    if cfg.overlap == 0 {
        return Err(IcaError::config("overlap must be a positive integer"));
    }
    let len = cfg.epoch.unwrap_or(n_t);
    if len == 0 {
        return Err(IcaError::config("spectral window length must be a positive integer"));
    }
    if len > n_t {
        return Err(IcaError::config(format!(
            "spectral window of {len} samples is longer than the signal ({n_t} samples)"
        )));
    }
    let step = (len as f64 / cfg.overlap as f64).round_ties_even() as usize;
    if step == 0 {
        return Err(IcaError::config(format!(
            "overlap {} leaves a zero hop for a window of {len} samples",
            cfg.overlap
        )));
    }
    Ok((len, step))
}

/// Sum of `|FFT|²` over the complete windows of every row of `x`,
/// accumulated into `acc` ([rows, L/2]). Returns the window count.
fn accumulate_windows(
    x: ArrayView2<f64>,
    len: usize,
    step: usize,
    planner: &mut FftPlanner<f64>,
    acc: &mut Array2<f64>,
) -> usize {
    let fft = planner.plan_fft_forward(len);
    let n_t = x.ncols();
    let n_win = (n_t - len) / step + 1;
    let half = len / 2;

    let mut buf = vec![Complex::<f64>::default(); len];
    for (row, mut out) in x.rows().into_iter().zip(acc.rows_mut()) {
        for w in 0..n_win {
            let start = w * step;
            for (b, &v) in buf.iter_mut().zip(row.slice(s![start..start + len]).iter()) {
                *b = Complex { re: v, im: 0.0 };
            }
            fft.process(&mut buf);
            for (o, b) in out.iter_mut().zip(buf.iter().take(half)) {
                *o += b.norm_sqr();
            }
        }
    }
    n_win
}

/// Averaged one-sided power spectrum of every row of `signal`.
pub fn power_spectrum(signal: &Signal, cfg: &SpectrumConfig) -> Result<PowerSpectrum> {
    let (len, step) = window_and_step(cfg, signal.n_times())?;
    let half = len / 2;
    log::debug!("Welch estimate: window {len}, hop {step}, {half} bins");

    let mut planner = FftPlanner::new();
    let mut powspctrm = Array2::<f64>::zeros((signal.n_rows(), half));
    let epochs = signal.epochs();
    for ep in &epochs {
        let mut acc = Array2::<f64>::zeros((signal.n_rows(), half));
        let n_win = accumulate_windows(ep.view(), len, step, &mut planner, &mut acc);
        powspctrm += &(acc / n_win as f64);
    }
    powspctrm /= epochs.len() as f64 * len as f64;

    let freq = Array1::from_shape_fn(half, |k| cfg.sfreq * k as f64 / len as f64);
    Ok(PowerSpectrum { powspctrm, freq })
}

/// Estimate the spectrum of `ic.s` and attach it to the record.
pub fn spectral_density(ic: &mut IndependentComponents, cfg: &SpectrumConfig) -> Result<()> {
    log::info!("computing power spectra of {} components", ic.n_components());
    ic.spectrum = Some(power_spectrum(&ic.s, cfg)?);
    Ok(())
}

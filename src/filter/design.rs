//! Cosine-taper frequency-domain filter design.
//!
//! The filter is a time-domain window `win[T]` and a real frequency
//! multiplier `F[T]` over the full (two-sided) FFT grid, used as
//! `real(ifft(fft(x · win) · F))`.
//!
//! Each pass element has a cutoff `f` and a transition width `w`; the
//! transition is a raised cosine spanning `[f − w/2, f + w/2]`:
//!   • high: 0 below the transition, 1 above
//!   • low : 1 below the transition, 0 above
//!   • notch: 0 at `f`, rising to 1 at `f ± w/2`
//! The multiplier is the product of all elements.
use std::f64::consts::PI;

use serde::Deserialize;

use crate::config::FilterSpec;
use crate::error::{IcaError, Result};

/// Time-domain taper applied before the forward FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    #[default]
    Boxcar,
    #[serde(alias = "hanning")]
    Hann,
    Hamming,
}

impl Window {
    /// Window of length `n`.
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        if n <= 1 {
            return vec![1.0; n];
        }
        match self {
            Window::Boxcar => vec![1.0; n],
            Window::Hann => (0..n)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
                .collect(),
            Window::Hamming => hamming(n),
        }
    }
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Kind of a single pass element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    #[serde(alias = "highpass")]
    High,
    #[serde(alias = "lowpass")]
    Low,
    #[serde(alias = "bandstop")]
    Notch,
}

impl PassKind {
    /// Gain at absolute frequency `f` for cutoff `fc` and transition `width`.
    pub fn gain(self, f: f64, fc: f64, width: f64) -> f64 {
        let half = width / 2.0;
        match self {
            PassKind::High => rising_edge(f, fc - half, width),
            PassKind::Low => 1.0 - rising_edge(f, fc - half, width),
            PassKind::Notch => {
                let d = (f - fc).abs();
                if d >= half {
                    1.0
                } else {
                    0.5 * (1.0 - (PI * d / half).cos())
                }
            }
        }
    }
}

/// 0 below `start`, 1 above `start + width`, raised cosine in between.
fn rising_edge(f: f64, start: f64, width: f64) -> f64 {
    if f <= start {
        0.0
    } else if f >= start + width {
        1.0
    } else {
        0.5 * (1.0 - (PI * (f - start) / width).cos())
    }
}

/// A designed filter for signals of a fixed length.
#[derive(Debug, Clone)]
pub struct CosineFilter {
    /// Time-domain window, length `n`.
    pub window: Vec<f64>,
    /// Frequency multiplier on the full FFT grid, length `n`.
    pub response: Vec<f64>,
}

/// Design the filter described by `spec` for signals of `n` samples.
pub fn prepare_cosine_filter(spec: &FilterSpec, n: usize) -> Result<CosineFilter> {
    if !(spec.sfreq > 0.0) {
        return Err(IcaError::config(format!(
            "filter sampling frequency must be positive, got {}",
            spec.sfreq
        )));
    }
    if spec.par.len() != spec.freq.len() || spec.par.len() != spec.width.len() {
        return Err(IcaError::config(format!(
            "filter lists differ in length: {} pass types, {} cutoffs, {} widths",
            spec.par.len(),
            spec.freq.len(),
            spec.width.len()
        )));
    }
    if let Some(w) = spec.width.iter().find(|&&w| !(w > 0.0)) {
        return Err(IcaError::config(format!("transition width must be positive, got {w}")));
    }
    if let Some(f) = spec.freq.iter().find(|&&f| !(f >= 0.0)) {
        return Err(IcaError::config(format!("cutoff frequency must be non-negative, got {f}")));
    }

    let df = spec.sfreq / n.max(1) as f64;
    let response = (0..n)
        .map(|k| {
            let f = k.min(n - k) as f64 * df;
            spec.par
                .iter()
                .zip(spec.freq.iter().zip(spec.width.iter()))
                .map(|(kind, (&fc, &w))| kind.gain(f, fc, w))
                .product()
        })
        .collect();

    Ok(CosineFilter { window: spec.win.coefficients(n), response })
}

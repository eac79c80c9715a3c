/// Shared synthetic-signal generators and a deterministic decomposer.
use megica::decomp::{Decomposer, Decomposition};
use megica::stats::invert;
use ndarray::{Array2, ArrayView2};
use std::f64::consts::PI;

#[allow(unused)]
/// Deterministic uniform noise in [-1, 1) (64-bit LCG).
pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        })
        .collect()
}

#[allow(unused)]
pub fn sinusoid(n: usize, f0: f64, sfreq: f64, amp: f64) -> Vec<f64> {
    (0..n)
        .map(|t| amp * (2.0 * PI * f0 * t as f64 / sfreq).sin())
        .collect()
}

#[allow(unused)]
/// Zero except for `amp` every `period` samples.
pub fn spike_train(n: usize, period: usize, amp: f64) -> Vec<f64> {
    (0..n).map(|t| if t % period == 0 { amp } else { 0.0 }).collect()
}

#[allow(unused)]
/// Stack equal-length rows into a matrix.
pub fn rows(rows: &[Vec<f64>]) -> Array2<f64> {
    let n = rows.first().map_or(0, Vec::len);
    Array2::from_shape_fn((rows.len(), n), |(r, t)| rows[r][t])
}

#[allow(unused)]
/// Returns the configured sources and the least-squares mixing that
/// reproduces the (already normalized) input from them.
pub struct KnownSources(pub Array2<f64>);

impl Decomposer for KnownSources {
    fn decompose(&self, signal: ArrayView2<f64>) -> megica::Result<Decomposition> {
        let s = &self.0;
        let mixing = signal.dot(&s.t()).dot(&invert(&s.dot(&s.t()))?);
        let unmixing = invert(&mixing.t().dot(&mixing))?.dot(&mixing.t());
        Ok(Decomposition { mixing, unmixing, sources: s.clone() })
    }
}

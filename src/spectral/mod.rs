//! Spectral goodness-of-fit against parametric models.
//!
//! Each configured band gets a `linear` or `powlaw` model per component. A
//! component is kept only if every band fits well (`gof < t_gof[band]`);
//! failing any one band flags it.

pub mod fit;

use ndarray::{s, Array2};

use crate::config::SpectralConfig;
use crate::error::{IcaError, Result};
use crate::ic::IndependentComponents;
use crate::spectrum::PowerSpectrum;

pub use fit::{goodness_of_fit, levenberg_marquardt, FitKind, Model};

/// Default per-band rejection threshold.
pub const DEFAULT_T_GOF: f64 = 0.03;

/// A configured band resolved onto the frequency axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBand {
    pub kind: FitKind,
    /// Requested `[fmin, fmax]`, Hz.
    pub band: [f64; 2],
    /// Inclusive bin range `lo..=hi` into `freq`.
    pub lo: usize,
    pub hi: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectralResult {
    pub bands: Vec<ResolvedBand>,
    /// `models[component][band]`
    pub models: Vec<Vec<Model>>,
    /// `[components, bands]`
    pub gof: Array2<f64>,
    pub t_gof: Vec<f64>,
    /// Components failing at least one band, ascending.
    pub list: Vec<usize>,
}

/// First bin with `freq ≥ fmin` through the last with `freq ≤ fmax`.
pub fn resolve_band(freq: &[f64], fmin: f64, fmax: f64) -> Result<(usize, usize)> {
    let lo = freq.iter().position(|&f| f >= fmin);
    let hi = freq.iter().rposition(|&f| f <= fmax);
    match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => Ok((lo, hi)),
        _ => Err(IcaError::config(format!(
            "band [{fmin}, {fmax}] Hz covers fewer than two frequency bins"
        ))),
    }
}

fn thresholds(cfg: &SpectralConfig) -> Result<Vec<f64>> {
    match &cfg.t_gof {
        None => Ok(vec![DEFAULT_T_GOF; cfg.fit.len()]),
        Some(t) if t.len() == cfg.fit.len() => Ok(t.clone()),
        Some(t) => Err(IcaError::config(format!(
            "{} goodness-of-fit thresholds given for {} bands",
            t.len(),
            cfg.fit.len()
        ))),
    }
}

fn resolve_bands(spectrum: &PowerSpectrum, cfg: &SpectralConfig) -> Result<Vec<ResolvedBand>> {
    let freq = spectrum.freq.to_vec();
    cfg.fit
        .iter()
        .map(|b| {
            let kind: FitKind = b.kind.parse()?;
            let (lo, hi) = resolve_band(&freq, b.band[0], b.band[1])?;
            Ok(ResolvedBand { kind, band: b.band, lo, hi })
        })
        .collect()
}

/// Fit every configured band of `ic.spectrum` and flag poorly fitting
/// components.
pub fn spectral_analysis(ic: &mut IndependentComponents, cfg: &SpectralConfig) -> Result<()> {
    let spectrum = ic
        .spectrum
        .as_ref()
        .ok_or_else(|| IcaError::config("spectral analysis requires a power spectrum; run spectral_density first"))?;
    if cfg.fit.is_empty() {
        return Err(IcaError::config("spectral analysis needs at least one band in `fit`"));
    }
    let t_gof = thresholds(cfg)?;
    let bands = resolve_bands(spectrum, cfg)?;

    let n_ic = spectrum.powspctrm.nrows();
    log::info!("fitting {} spectral bands for {n_ic} components", bands.len());

    let mut gof = Array2::<f64>::zeros((n_ic, bands.len()));
    let mut models = Vec::with_capacity(n_ic);
    for k in 0..n_ic {
        let mut row_models = Vec::with_capacity(bands.len());
        for (j, band) in bands.iter().enumerate() {
            let f = spectrum.freq.slice(s![band.lo..=band.hi]).to_vec();
            let x = spectrum.powspctrm.slice(s![k, band.lo..=band.hi]).to_vec();
            let model = Model::fit(band.kind, &f, &x)?;
            let fitted: Vec<f64> = f.iter().map(|&fi| model.eval(fi)).collect();
            gof[[k, j]] = goodness_of_fit(&x, &fitted);
            row_models.push(model);
        }
        models.push(row_models);
    }

    // NaN (zero-power band) never passes.
    let list: Vec<usize> = (0..n_ic)
        .filter(|&k| gof.row(k).iter().zip(&t_gof).any(|(&g, &t)| !(g < t)))
        .collect();
    log::debug!("spectral criteria flag components {list:?}");

    ic.spectral = Some(SpectralResult { bands, models, gof, t_gof, list });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BandFit;
    use crate::signal::Signal;
    use ndarray::{Array1, Array2};

    fn record_with_spectrum(powspctrm: Array2<f64>, freq: Array1<f64>) -> IndependentComponents {
        let n = powspctrm.nrows();
        let mut ic = IndependentComponents::new(
            Array2::eye(n),
            Array2::eye(n),
            Signal::from(Array2::<f64>::zeros((n, 8))),
        )
        .unwrap();
        ic.spectrum = Some(PowerSpectrum { powspctrm, freq });
        ic
    }

    #[test]
    fn band_resolution_is_inclusive() {
        let freq = [0.0, 5.0, 10.0, 15.0, 20.0];
        assert_eq!(resolve_band(&freq, 4.0, 15.0).unwrap(), (1, 3));
        assert_eq!(resolve_band(&freq, 0.0, 20.0).unwrap(), (0, 4));
        assert!(resolve_band(&freq, 11.0, 14.0).is_err());
    }

    #[test]
    fn smooth_component_kept_peaky_component_flagged() {
        let freq = Array1::from_shape_fn(50, |k| k as f64);
        let powspctrm = Array2::from_shape_fn((2, 50), |(c, k)| {
            let f = k.max(1) as f64;
            let base = 2.0 * f.powf(-1.5);
            if c == 1 && k == 10 { base + 1.0 } else { base }
        });
        let mut ic = record_with_spectrum(powspctrm, freq);
        let cfg = SpectralConfig { fit: vec![BandFit::new("powlaw", 2.0, 40.0)], t_gof: None };
        spectral_analysis(&mut ic, &cfg).unwrap();

        let res = ic.spectral.unwrap();
        assert!(res.gof[[0, 0]] < 1e-6);
        assert_eq!(res.list, vec![1]);
        assert_eq!(res.t_gof, vec![DEFAULT_T_GOF]);
        assert_eq!(res.bands[0].kind, FitKind::Powlaw);
    }

    #[test]
    fn failing_any_band_rejects() {
        let freq = Array1::from_shape_fn(40, |k| k as f64);
        // Linear on 1..10 Hz, a sharp bump in 20..30 Hz.
        let powspctrm = Array2::from_shape_fn((1, 40), |(_, k)| {
            if (24..=26).contains(&k) { 50.0 } else { 10.0 - 0.1 * k as f64 }
        });
        let mut ic = record_with_spectrum(powspctrm, freq);
        let cfg = SpectralConfig {
            fit: vec![BandFit::new("linear", 1.0, 10.0), BandFit::new("linear", 20.0, 30.0)],
            t_gof: Some(vec![0.03, 0.03]),
        };
        spectral_analysis(&mut ic, &cfg).unwrap();
        let res = ic.spectral.unwrap();
        assert!(res.gof[[0, 0]] < 1e-12);
        assert!(res.gof[[0, 1]] > 0.03);
        assert_eq!(res.list, vec![0]);
    }

    #[test]
    fn configuration_errors() {
        let freq = Array1::from_shape_fn(20, |k| k as f64);
        let mut ic = record_with_spectrum(Array2::ones((1, 20)), freq);

        let unknown = SpectralConfig { fit: vec![BandFit::new("gauss", 1.0, 10.0)], t_gof: None };
        assert!(matches!(spectral_analysis(&mut ic, &unknown), Err(IcaError::UnsupportedFitType(_))));

        let wrong_len = SpectralConfig { fit: vec![BandFit::new("linear", 1.0, 10.0)], t_gof: Some(vec![]) };
        assert!(matches!(spectral_analysis(&mut ic, &wrong_len), Err(IcaError::Config(_))));

        ic.spectrum = None;
        let ok = SpectralConfig { fit: vec![BandFit::new("linear", 1.0, 10.0)], t_gof: None };
        assert!(matches!(spectral_analysis(&mut ic, &ok), Err(IcaError::Config(_))));
    }
}

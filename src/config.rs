//! Pipeline configuration.
//!
//! [`EstimateConfig`] nests one section per stage. Every field has a
//! documented default, so a caller can use struct-update syntax:
//!
//! ```
//! use megica::{EstimateConfig, config::CumulantConfig};
//!
//! let cfg = EstimateConfig {
//!     cumulant: CumulantConfig { t_skew: Some(2.0), ..CumulantConfig::default() },
//!     corr_analysis: true,
//!     ..EstimateConfig::default()
//! };
//! ```
//!
//! or load the same structure from JSON. Unknown keys are ignored and the
//! threshold names of the original analysis scripts (`Tskew`, `Tkurt`,
//! `Tsigcorr`, `Tpowcorr`, `Tgof`) are accepted as aliases:
//!
//! ```
//! use megica::EstimateConfig;
//!
//! let cfg = EstimateConfig::from_json_str(r#"{
//!     "cumulant": { "Tkurt": 10 },
//!     "spectralanalysis": true,
//!     "fft": { "sfreq": 600, "epoch": 1200 },
//!     "spectral": { "fit": [ { "kind": "powlaw", "band": [2, 40] } ] }
//! }"#).unwrap();
//! assert_eq!(cfg.cumulant.t_kurt, Some(10.0));
//! ```
use std::path::Path;

use serde::Deserialize;

use crate::error::{IcaError, Result};
use crate::filter::{PassKind, Window};

/// Configuration for the full estimation pipeline ([`crate::estimate`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    /// Normalization and decomposition settings.
    pub ica: DecompConfig,

    /// Non-Gaussianity thresholds.
    pub cumulant: CumulantConfig,

    /// Run the correlation stage against reference channels.
    ///
    /// Default: `false`.
    #[serde(alias = "corranalysis")]
    pub corr_analysis: bool,

    pub corr: CorrConfig,

    /// Run the power spectrum and spectral fit stages.
    ///
    /// Default: `false`.
    #[serde(alias = "spectralanalysis")]
    pub spectral_analysis: bool,

    /// Welch estimator settings.
    pub fft: SpectrumConfig,

    /// Band fits. Required when `spectral_analysis` is on.
    pub spectral: Option<SpectralConfig>,

    /// Channel count of the acquisition system the defaults were tuned for.
    /// A different count only logs a warning. `None` disables the check.
    ///
    /// Default: `Some(306)` (Neuromag/Elekta whole-head MEG).
    pub expected_channels: Option<usize>,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            ica: DecompConfig::default(),
            cumulant: CumulantConfig::default(),
            corr_analysis: false,
            corr: CorrConfig::default(),
            spectral_analysis: false,
            fft: SpectrumConfig::default(),
            spectral: None,
            expected_channels: Some(306),
        }
    }
}

impl EstimateConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| IcaError::config(format!("malformed configuration: {e}")))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Normalization and decomposition settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecompConfig {
    /// Per-channel scale factors (strictly positive, one per channel).
    ///
    /// Default: `None`, temporal standard deviation of each channel.
    pub normalize: Option<Vec<f64>>,

    pub fastica: FastIcaConfig,
}

/// FastICA contrast function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contrast {
    /// G(u) = log cosh(u), g(u) = tanh(u).
    #[default]
    #[serde(alias = "tanh")]
    Logcosh,
    /// G(u) = -exp(-u²/2).
    Exp,
    /// G(u) = u⁴/4.
    Cube,
}

/// Component count used when none is configured and the recording has
/// more channels than this.
pub const DEFAULT_MAX_COMPONENTS: usize = 30;

/// Parameters of the default FastICA backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FastIcaConfig {
    /// Default: [`Contrast::Logcosh`].
    #[serde(alias = "fun")]
    pub contrast: Contrast,

    /// Number of components to estimate.
    ///
    /// Default: `None`, one per channel up to [`DEFAULT_MAX_COMPONENTS`].
    pub n_components: Option<usize>,

    /// Default: `200`.
    pub max_iter: usize,

    /// Default: `1e-4`.
    pub tol: f64,

    /// Seed for the initial unmixing guess; `None` draws from entropy.
    ///
    /// Default: `Some(0)`.
    pub random_state: Option<usize>,
}

impl Default for FastIcaConfig {
    fn default() -> Self {
        Self {
            contrast: Contrast::Logcosh,
            n_components: None,
            max_iter: 200,
            tol: 1e-4,
            random_state: Some(0),
        }
    }
}

impl FastIcaConfig {
    /// Components to estimate from `n_channels` channels.
    pub fn components_for(&self, n_channels: usize) -> usize {
        self.n_components.unwrap_or(n_channels.min(DEFAULT_MAX_COMPONENTS))
    }
}

/// Thresholds of the cumulant test. `None` disables a criterion.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CumulantConfig {
    /// Reject when `|skew| > t_skew`.
    ///
    /// Default: `None` (skewness not used).
    #[serde(alias = "Tskew")]
    pub t_skew: Option<f64>,

    /// Reject when `kurt > t_kurt` (excess kurtosis).
    ///
    /// Default: `Some(15.0)`.
    #[serde(alias = "Tkurt")]
    pub t_kurt: Option<f64>,
}

impl Default for CumulantConfig {
    fn default() -> Self {
        Self { t_skew: None, t_kurt: Some(15.0) }
    }
}

/// Correlation stage settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrConfig {
    /// Reference channel labels.
    ///
    /// Default: `ext1`, `ext2`, …
    pub extname: Option<Vec<String>>,

    /// Band-pass components and references before correlating.
    ///
    /// Default: `true`.
    pub filter: bool,

    /// Cosine filter used when `filter` is on.
    pub filt: FilterSpec,

    /// Default: `0.1`.
    #[serde(alias = "Tsigcorr")]
    pub t_sigcorr: f64,

    /// Default: `0.2`.
    #[serde(alias = "Tpowcorr")]
    pub t_powcorr: f64,
}

impl Default for CorrConfig {
    fn default() -> Self {
        Self {
            extname: None,
            filter: true,
            filt: FilterSpec::default(),
            t_sigcorr: 0.1,
            t_powcorr: 0.2,
        }
    }
}

/// Frequency-domain cosine-taper filter description.
///
/// `par[i]` is applied at `freq[i]` Hz with a transition of `width[i]` Hz.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Default: `1000.0` Hz.
    pub sfreq: f64,
    /// Default: [`Window::Boxcar`].
    pub win: Window,
    /// Default: `[high, low]`.
    pub par: Vec<PassKind>,
    /// Default: `[1.0, 25.0]` Hz.
    pub freq: Vec<f64>,
    /// Default: `[0.5, 5.0]` Hz.
    pub width: Vec<f64>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            sfreq: 1000.0,
            win: Window::Boxcar,
            par: vec![PassKind::High, PassKind::Low],
            freq: vec![1.0, 25.0],
            width: vec![0.5, 5.0],
        }
    }
}

/// Welch power spectrum settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Sampling rate in Hz.
    ///
    /// Default: `1000.0`.
    pub sfreq: f64,

    /// Window length in samples.
    ///
    /// Default: `None`, the full signal length (one window).
    pub epoch: Option<usize>,

    /// Windows per window length; the hop is `round(epoch / overlap)`.
    ///
    /// Default: `2` (50 % overlap).
    pub overlap: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self { sfreq: 1000.0, epoch: None, overlap: 2 }
    }
}

/// One spectral band to model.
#[derive(Debug, Clone, Deserialize)]
pub struct BandFit {
    /// Model keyword, `linear` or `powlaw` (case-insensitive).
    pub kind: String,
    /// `[fmin, fmax]` in Hz.
    pub band: [f64; 2],
}

impl BandFit {
    pub fn new(kind: &str, fmin: f64, fmax: f64) -> Self {
        Self { kind: kind.to_string(), band: [fmin, fmax] }
    }
}

/// Spectral goodness-of-fit settings. `fit` has no default.
#[derive(Debug, Clone, Deserialize)]
pub struct SpectralConfig {
    pub fit: Vec<BandFit>,

    /// Per-band rejection thresholds.
    ///
    /// Default: `0.03` for every band.
    #[serde(default, alias = "Tgof")]
    pub t_gof: Option<Vec<f64>>,
}

/// Eigenvalue cutoff rule used by [`crate::ndof::estimate_ndof`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NdofMethod {
    /// First eigenvalue ≥ `param`.
    Abs,
    /// First eigenvalue ≥ `max / param`.
    Maxrel,
    /// Last jump `D[i+1] / D[i] ≥ param`.
    #[default]
    Rel,
}

impl std::str::FromStr for NdofMethod {
    type Err = IcaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abs" => Ok(NdofMethod::Abs),
            "maxrel" => Ok(NdofMethod::Maxrel),
            "rel" => Ok(NdofMethod::Rel),
            _ => Err(IcaError::config(format!("unknown eigenvalue cutoff method `{s}` (abs, maxrel, rel)"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NdofConfig {
    /// Same semantics as [`DecompConfig::normalize`].
    pub normalize: Option<Vec<f64>>,
    /// Default: [`NdofMethod::Rel`].
    pub method: NdofMethod,
    /// Default: `1e3`.
    pub param: f64,
}

impl Default for NdofConfig {
    fn default() -> Self {
        Self { normalize: None, method: NdofMethod::Rel, param: 1e3 }
    }
}

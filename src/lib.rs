//! # megica: temporal ICA artifact classification for MEG/EEG
//!
//! `megica` decomposes multichannel recordings into temporally independent
//! components, scores every component with independent statistical tests,
//! merges their votes into a keep/reject verdict and removes the rejected
//! components from the data.
//!
//! ## Pipeline overview
//!
//! ```text
//! data [N, T] or [K, N, T]
//!   │
//!   ├─ epoch::concat_epochs     baseline correct + lay epochs end to end
//!   ├─ normalize                ÷ per-channel std (or caller factors)
//!   ├─ decomp (FastICA)         A [N, C], W [C, N], S [C, K·T]
//!   ├─ restore units            A *= scale, W /= scale
//!   ├─ cumulant                 skew / kurtosis, sort by kurtosis
//!   ├─ corr        (optional)   |r| with reference channels, raw and squared
//!   ├─ epoch::restore_epochs    S back to [K, C, T]
//!   ├─ spectrum    (optional)   Welch power spectrum
//!   ├─ spectral    (optional)   per-band linear / power-law goodness of fit
//!   └─ verdict                  union of rejections + diagnostic panels
//!        │
//!        └─→ removal            data − A[:, reject] · S[reject, :]
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use megica::{estimate, remove_components, Collaborators, EstimateConfig, FastIcaDecomposer, MegHeader, Signal};
//! use ndarray::Array2;
//!
//! let data = Signal::from(Array2::<f64>::zeros((306, 60_000)));
//! let header = MegHeader::new(vec![], 1000.0);
//! let cfg = EstimateConfig::default();
//!
//! let decomposer = FastIcaDecomposer::new(cfg.ica.fastica.clone());
//! let est = estimate(&header, &data, None, &cfg, &decomposer, Collaborators::default()).unwrap();
//! let cleaned = remove_components(&data, &est.ic, &est.verdict.reject).unwrap();
//! ```

pub mod config;
pub mod corr;
pub mod cumulant;
pub mod decomp;
pub mod epoch;
pub mod error;
pub mod filter;
pub mod header;
pub mod ic;
pub mod io;
pub mod ndof;
pub mod normalize;
pub mod removal;
pub mod render;
pub mod signal;
pub mod spectral;
pub mod spectrum;
pub mod stats;
pub mod verdict;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use config::{EstimateConfig, NdofConfig};
pub use corr::corr_analysis;
pub use cumulant::cumulant_analysis;
pub use decomp::{decompose, Decomposer, FastIcaDecomposer};
pub use epoch::{concat_epochs, epoch, restore_epochs};
pub use error::{IcaError, Result};
pub use header::MegHeader;
pub use ic::IndependentComponents;
pub use ndof::estimate_ndof;
pub use removal::{comparison_traces, remove_components};
pub use render::{ComponentViewer, Renderer, SvgRenderer};
pub use signal::Signal;
pub use spectral::spectral_analysis;
pub use spectrum::{power_spectrum, spectral_density};
pub use verdict::{aggregate, merge_lists, Verdict};

/// Optional side-effect collaborators of [`estimate`].
#[derive(Default)]
pub struct Collaborators<'a> {
    pub renderer: Option<&'a mut dyn Renderer>,
    pub viewer: Option<&'a mut dyn ComponentViewer>,
}

/// Result of [`estimate`].
#[derive(Debug, Clone)]
pub struct Estimate {
    pub ic: IndependentComponents,
    pub verdict: Verdict,
}

fn check_reference_layout(data: &Signal, ext: &Signal) -> Result<()> {
    if data.is_epoched() != ext.is_epoched()
        || data.n_times() != ext.n_times()
        || data.n_epochs() != ext.n_epochs()
    {
        return Err(IcaError::Shape(format!(
            "reference data {:?} does not match data {:?}",
            ext.shape(),
            data.shape()
        )));
    }
    Ok(())
}

/// Run the **full estimation pipeline** on one recording.
///
/// 1. Validate the configuration and reference data layout.
/// 2. Baseline correct and concatenate epochs (epoched input only).
/// 3. Normalize, decompose with `decomposer`, restore physical units.
/// 4. Cumulant analysis; components are reordered by kurtosis here.
/// 5. Correlation analysis against `extdata` when `cfg.corr_analysis`.
/// 6. Restore the epoch layout of `S`.
/// 7. Power spectrum and spectral fits when `cfg.spectral_analysis`.
/// 8. Merge the rejection votes, then hand the verdict to the renderer and
///    the record to the viewer, if supplied.
///
/// # Errors
///
/// `Config` for a missing `spectral` section with spectral analysis on or
/// any invalid stage parameter; `Shape` when `extdata` does not match
/// `data`; whatever the decomposer reports.
pub fn estimate(
    header: &MegHeader,
    data: &Signal,
    extdata: Option<&Signal>,
    cfg: &EstimateConfig,
    decomposer: &dyn Decomposer,
    collab: Collaborators<'_>,
) -> Result<Estimate> {
    let spectral_cfg = match (cfg.spectral_analysis, &cfg.spectral) {
        (true, None) => {
            return Err(IcaError::Config("spectral analysis requested without a `spectral.fit` band list".into()))
        }
        (true, Some(s)) => Some(s),
        (false, _) => None,
    };
    if let Some(ext) = extdata {
        check_reference_layout(data, ext)?;
    }
    header.check_channel_count(data.n_rows(), cfg.expected_channels);

    if data.is_epoched() {
        log::info!("baseline correcting and concatenating epochs");
    }
    let sig = data.concatenated();
    let mut ic = decompose(&sig, &cfg.ica, decomposer)?;

    cumulant_analysis(&mut ic, &cfg.cumulant)?;

    if cfg.corr_analysis {
        let ext = extdata.map(|e| Signal::Continuous(e.concatenated()));
        corr_analysis(&mut ic, ext.as_ref(), &cfg.corr)?;
    }

    if let Some(n_epochs) = data.n_epochs() {
        if let Signal::Continuous(s) = &ic.s {
            log::info!("restoring epochs");
            let restored = restore_epochs(s, n_epochs)?;
            ic.s = Signal::Epoched(restored);
        }
    }

    if let Some(spectral_cfg) = spectral_cfg {
        spectral_density(&mut ic, &cfg.fft)?;
        spectral_analysis(&mut ic, spectral_cfg)?;
    }

    let verdict = aggregate(&ic);

    if let Some(renderer) = collab.renderer {
        renderer.render_verdict(&verdict, header)?;
    }
    if let Some(viewer) = collab.viewer {
        viewer.view(&ic, &verdict.reject, Some(header))?;
    }
    Ok(Estimate { ic, verdict })
}

//! The IC record threaded through every analysis stage.
use ndarray::{Array2, Axis};

use crate::corr::CorrResult;
use crate::cumulant::CumulantResult;
use crate::error::{IcaError, Result};
use crate::signal::Signal;
use crate::spectral::SpectralResult;
use crate::spectrum::PowerSpectrum;

/// Decomposition output plus everything the analysis stages attach to it.
///
/// Created by [`crate::decomp::decompose`]; each stage fills in its own
/// field. Component ordering changes at most once, in
/// [`crate::cumulant::cumulant_analysis`], and always through
/// [`IndependentComponents::permute`].
#[derive(Debug, Clone)]
pub struct IndependentComponents {
    /// Mixing matrix `[channels, components]`, physical units.
    pub a: Array2<f64>,
    /// Unmixing matrix `[components, channels]`.
    pub w: Array2<f64>,
    /// Component time courses, `[components, T]` or `[epochs, components, T]`.
    pub s: Signal,
    pub cumulant: Option<CumulantResult>,
    pub corr: Option<CorrResult>,
    pub spectrum: Option<PowerSpectrum>,
    pub spectral: Option<SpectralResult>,
}

impl IndependentComponents {
    /// Build a record, checking that `a`, `w` and `s` agree on the
    /// component and channel counts.
    pub fn new(a: Array2<f64>, w: Array2<f64>, s: Signal) -> Result<Self> {
        let ic = Self { a, w, s, cumulant: None, corr: None, spectrum: None, spectral: None };
        ic.check_consistency()?;
        Ok(ic)
    }

    pub fn n_components(&self) -> usize {
        self.a.ncols()
    }

    pub fn n_channels(&self) -> usize {
        self.a.nrows()
    }

    pub fn check_consistency(&self) -> Result<()> {
        let (n_ch, n_ic) = self.a.dim();
        if self.w.dim() != (n_ic, n_ch) {
            return Err(IcaError::shape(format!(
                "unmixing matrix is {:?}, expected [{n_ic}, {n_ch}] to match mixing [{n_ch}, {n_ic}]",
                self.w.shape()
            )));
        }
        if self.s.n_rows() != n_ic {
            return Err(IcaError::shape(format!(
                "sources have {} components, mixing matrix has {n_ic}",
                self.s.n_rows()
            )));
        }
        Ok(())
    }

    /// Reorder components: position `i` receives old component `order[i]`.
    ///
    /// `A` columns, `W` rows and the component axis of `S` move together.
    pub fn permute(&mut self, order: &[usize]) -> Result<()> {
        let n = self.n_components();
        let mut seen = vec![false; n];
        if order.len() != n || !order.iter().all(|&i| i < n && !std::mem::replace(&mut seen[i], true)) {
            return Err(IcaError::shape(format!(
                "ordering {order:?} is not a permutation of {n} components"
            )));
        }
        self.a = self.a.select(Axis(1), order);
        self.w = self.w.select(Axis(0), order);
        self.s = self.s.select_rows(order);
        Ok(())
    }
}

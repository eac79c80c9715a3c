//! Non-Gaussianity scoring by third and fourth cumulants.
//!
//! Components are sorted by descending excess kurtosis so super-Gaussian
//! sources (blinks, cardiac spikes, jumps) come first. The permutation is
//! applied to the whole IC record.
use std::cmp::Ordering;

use crate::config::CumulantConfig;
use crate::error::{IcaError, Result};
use crate::ic::IndependentComponents;
use crate::stats::{excess_kurtosis, skewness};

/// Cumulant statistics in post-sort component order.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulantResult {
    pub skew: Vec<f64>,
    /// Excess kurtosis, non-increasing (NaN entries last).
    pub kurt: Vec<f64>,
    pub t_skew: Option<f64>,
    pub t_kurt: Option<f64>,
    /// Flagged components, ascending.
    pub list: Vec<usize>,
}

/// Descending order with NaN placed after every number.
fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

fn exceeds(value: f64, threshold: Option<f64>) -> bool {
    matches!(threshold, Some(t) if !t.is_nan() && value > t)
}

/// Score, sort and flag the components of `ic`.
pub fn cumulant_analysis(ic: &mut IndependentComponents, cfg: &CumulantConfig) -> Result<()> {
    let sources = ic.s.concatenated();
    let n_t = sources.ncols();
    if n_t < 4 {
        return Err(IcaError::shape(format!(
            "unbiased kurtosis needs at least 4 samples per component, got {n_t}"
        )));
    }

    log::info!("computing skewness and kurtosis of {} components", sources.nrows());
    let skew: Vec<f64> = sources.rows().into_iter().map(skewness).collect();
    let kurt: Vec<f64> = sources.rows().into_iter().map(excess_kurtosis).collect();

    let mut order: Vec<usize> = (0..kurt.len()).collect();
    order.sort_by(|&i, &j| descending_nan_last(kurt[i], kurt[j]));
    ic.permute(&order)?;

    let skew: Vec<f64> = order.iter().map(|&i| skew[i]).collect();
    let kurt: Vec<f64> = order.iter().map(|&i| kurt[i]).collect();

    let list: Vec<usize> = (0..kurt.len())
        .filter(|&i| exceeds(skew[i].abs(), cfg.t_skew) || exceeds(kurt[i], cfg.t_kurt))
        .collect();
    log::debug!("cumulant criteria flag components {list:?}");

    ic.cumulant = Some(CumulantResult { skew, kurt, t_skew: cfg.t_skew, t_kurt: cfg.t_kurt, list });
    Ok(())
}

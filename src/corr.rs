//! Correlation of component time courses with reference channels
//! (EOG, ECG, ...).
//!
//! For each reference two coefficients are computed against every
//! component: one on the raw signals and one on the squared signals. The
//! second catches amplitude coupling, e.g. a component whose power follows
//! the heartbeat without being phase-locked to it.
use ndarray::Array2;

use crate::config::CorrConfig;
use crate::error::{IcaError, Result};
use crate::filter::{apply_cosine_filter, prepare_cosine_filter};
use crate::ic::IndependentComponents;
use crate::signal::Signal;
use crate::stats::cross_correlation;

/// Coefficients against one reference channel, indexed by component.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCorrelation {
    pub name: String,
    pub sig: Vec<f64>,
    pub pow: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrResult {
    pub references: Vec<ReferenceCorrelation>,
    pub t_sigcorr: f64,
    pub t_powcorr: f64,
    /// Components flagged by any reference, ascending.
    pub list: Vec<usize>,
}

fn check_layout(s: &Signal, ext: &Signal) -> Result<()> {
    if s.is_epoched() != ext.is_epoched() {
        return Err(IcaError::shape(format!(
            "reference data {:?} and sources {:?} differ in layout",
            ext.shape(),
            s.shape()
        )));
    }
    if s.n_times() != ext.n_times() || s.n_epochs() != ext.n_epochs() {
        return Err(IcaError::shape(format!(
            "reference data {:?} does not match sources {:?}",
            ext.shape(),
            s.shape()
        )));
    }
    if ext.n_rows() == 0 {
        return Err(IcaError::shape("reference data has no channels"));
    }
    Ok(())
}

fn reference_names(cfg: &CorrConfig, n: usize) -> Result<Vec<String>> {
    match &cfg.extname {
        Some(names) if names.len() != n => Err(IcaError::config(format!(
            "{} reference names given for {n} reference channels",
            names.len()
        ))),
        Some(names) => Ok(names.clone()),
        None => Ok((1..=n).map(|i| format!("ext{i}")).collect()),
    }
}

/// Correlate `ic.s` with `extdata` and flag coupled components.
///
/// Without reference data the stage is skipped with a warning.
pub fn corr_analysis(
    ic: &mut IndependentComponents,
    extdata: Option<&Signal>,
    cfg: &CorrConfig,
) -> Result<()> {
    let Some(ext) = extdata else {
        log::warn!("no reference channels supplied; skipping correlation analysis");
        return Ok(());
    };
    check_layout(&ic.s, ext)?;
    let names = reference_names(cfg, ext.n_rows())?;

    let mut comps = ic.s.concatenated();
    let mut refs = ext.concatenated();

    if cfg.filter {
        log::info!("filtering components and reference channels");
        let filt = prepare_cosine_filter(&cfg.filt, comps.ncols())?;
        apply_cosine_filter(&mut comps, &filt)?;
        apply_cosine_filter(&mut refs, &filt)?;
    }

    log::info!("correlating {} components with {} reference channels", comps.nrows(), refs.nrows());
    let sig = cross_correlation(refs.view(), comps.view());
    let pow = cross_correlation(squared(&refs).view(), squared(&comps).view());

    let mut flagged = vec![false; comps.nrows()];
    let references = names
        .into_iter()
        .enumerate()
        .map(|(k, name)| {
            let sig: Vec<f64> = sig.row(k).to_vec();
            let pow: Vec<f64> = pow.row(k).to_vec();
            for (i, flag) in flagged.iter_mut().enumerate() {
                if sig[i].abs() >= cfg.t_sigcorr || pow[i].abs() >= cfg.t_powcorr {
                    *flag = true;
                }
            }
            ReferenceCorrelation { name, sig, pow }
        })
        .collect();

    let list: Vec<usize> = flagged.iter().enumerate().filter_map(|(i, &f)| f.then_some(i)).collect();
    log::debug!("correlation criteria flag components {list:?}");

    ic.corr = Some(CorrResult { references, t_sigcorr: cfg.t_sigcorr, t_powcorr: cfg.t_powcorr, list });
    Ok(())
}

fn squared(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(|v| v * v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        // Small LCG: deterministic, roughly uniform in [-1, 1).
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
            })
            .collect()
    }

    fn record(n: usize) -> (IndependentComponents, Array2<f64>) {
        let ref_sig = noise(n, 1);
        let other = noise(n, 2);
        let s = Array2::from_shape_fn((2, n), |(k, t)| if k == 0 { other[t] } else { ref_sig[t] });
        let ic = IndependentComponents::new(Array2::eye(2), Array2::eye(2), Signal::from(s)).unwrap();
        let ext = Array2::from_shape_fn((1, n), |(_, t)| ref_sig[t]);
        (ic, ext)
    }

    #[test]
    fn flags_component_matching_reference() {
        let (mut ic, ext) = record(2000);
        let cfg = CorrConfig { filter: false, ..CorrConfig::default() };
        corr_analysis(&mut ic, Some(&Signal::from(ext)), &cfg).unwrap();

        let res = ic.corr.unwrap();
        assert_eq!(res.list, vec![1]);
        assert_eq!(res.references[0].name, "ext1");
        approx::assert_abs_diff_eq!(res.references[0].sig[1], 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(res.references[0].pow[1], 1.0, epsilon = 1e-12);
        assert!(res.references[0].sig[0].abs() < 0.1);
    }

    #[test]
    fn filtered_copies_leave_sources_untouched() {
        let (mut ic, ext) = record(2000);
        let before = ic.s.clone();
        corr_analysis(&mut ic, Some(&Signal::from(ext)), &CorrConfig::default()).unwrap();
        assert_eq!(ic.s, before);
        assert!(ic.corr.unwrap().list.contains(&1));
    }

    #[test]
    fn missing_reference_is_a_no_op() {
        let (mut ic, _) = record(100);
        corr_analysis(&mut ic, None, &CorrConfig::default()).unwrap();
        assert!(ic.corr.is_none());
    }

    #[test]
    fn layout_and_length_mismatch_are_shape_errors() {
        let (mut ic, _) = record(100);
        let cfg = CorrConfig::default();
        let short = Signal::from(Array2::<f64>::zeros((1, 50)));
        assert!(matches!(corr_analysis(&mut ic, Some(&short), &cfg), Err(IcaError::Shape(_))));
        let cube = Signal::from(Array3::<f64>::zeros((2, 1, 50)));
        assert!(matches!(corr_analysis(&mut ic, Some(&cube), &cfg), Err(IcaError::Shape(_))));
    }

    #[test]
    fn wrong_number_of_names_is_a_config_error() {
        let (mut ic, ext) = record(100);
        let cfg = CorrConfig { extname: Some(vec!["EOG".into(), "ECG".into()]), ..CorrConfig::default() };
        assert!(matches!(
            corr_analysis(&mut ic, Some(&Signal::from(ext)), &cfg),
            Err(IcaError::Config(_))
        ));
    }
}

//! Artifact removal: subtract the sensor-space contribution of rejected
//! components, `data − A[:, reject] · S[reject, :]`, per epoch when the
//! data is trial-segmented.
use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{IcaError, Result};
use crate::ic::IndependentComponents;
use crate::signal::Signal;
use crate::verdict::normalize_list;

/// Before/after trace of one channel for one removed component.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalTrace {
    pub component: usize,
    /// Channel with the largest absolute mixing weight for `component`.
    pub channel: usize,
    /// Trial with the largest change on `channel` (epoched data only).
    pub epoch: Option<usize>,
    pub original: Vec<f64>,
    pub cleaned: Vec<f64>,
}

fn check_shapes(data: &Signal, ic: &IndependentComponents) -> Result<()> {
    ic.check_consistency()?;
    if data.is_epoched() != ic.s.is_epoched() {
        return Err(IcaError::shape(format!(
            "data {:?} and sources {:?} differ in layout",
            data.shape(),
            ic.s.shape()
        )));
    }
    if data.n_rows() != ic.n_channels() {
        return Err(IcaError::shape(format!(
            "data has {} channels, mixing matrix has {}",
            data.n_rows(),
            ic.n_channels()
        )));
    }
    if data.n_times() != ic.s.n_times() || data.n_epochs() != ic.s.n_epochs() {
        return Err(IcaError::shape(format!(
            "data {:?} does not match sources {:?} in time or epochs",
            data.shape(),
            ic.s.shape()
        )));
    }
    Ok(())
}

fn check_indices(ic: &IndependentComponents, reject: &[usize]) -> Result<()> {
    let n_ic = ic.n_components();
    match reject.iter().find(|&&i| i >= n_ic) {
        Some(&bad) => Err(IcaError::config(format!("component {bad} out of range (have {n_ic})"))),
        None => Ok(()),
    }
}

fn subtract(data: ArrayView2<f64>, a_rej: &Array2<f64>, s: ArrayView2<f64>, reject: &[usize]) -> Array2<f64> {
    let s_rej = s.select(Axis(0), reject);
    &data - &a_rej.dot(&s_rej)
}

/// Remove the components listed in `reject` from `data`.
///
/// An empty list returns the data unchanged.
pub fn remove_components(data: &Signal, ic: &IndependentComponents, reject: &[usize]) -> Result<Signal> {
    check_shapes(data, ic)?;
    check_indices(ic, reject)?;
    let reject = normalize_list(reject);
    if reject.is_empty() {
        return Ok(data.clone());
    }

    log::info!("removing components {reject:?}");
    let a_rej = ic.a.select(Axis(1), &reject);
    let cleaned = data
        .epochs()
        .into_iter()
        .zip(ic.s.epochs())
        .map(|(d, s)| subtract(d, &a_rej, s, &reject))
        .collect::<Vec<_>>();

    Ok(match data {
        Signal::Continuous(_) => {
            let mut it = cleaned.into_iter();
            Signal::Continuous(it.next().unwrap_or_default())
        }
        Signal::Epoched(_) => {
            let views: Vec<_> = cleaned.iter().map(|e| e.view()).collect();
            let stacked = ndarray::stack(Axis(0), &views).map_err(|e| IcaError::shape(e.to_string()))?;
            Signal::Epoched(stacked)
        }
    })
}

fn argmax_by(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// One trace per removed component, for before/after plots.
pub fn comparison_traces(
    original: &Signal,
    cleaned: &Signal,
    ic: &IndependentComponents,
    reject: &[usize],
) -> Result<Vec<RemovalTrace>> {
    check_shapes(original, ic)?;
    if original.shape() != cleaned.shape() {
        return Err(IcaError::shape(format!(
            "cleaned data {:?} does not match original {:?}",
            cleaned.shape(),
            original.shape()
        )));
    }
    check_indices(ic, reject)?;

    let n_epochs = original.n_epochs().unwrap_or(1);
    normalize_list(reject)
        .into_iter()
        .map(|component| {
            let channel = argmax_by(ic.a.column(component).iter().map(|v| v.abs()))
                .ok_or_else(|| IcaError::shape("mixing matrix has no channels"))?;
            let epoch = argmax_by((0..n_epochs).map(|e| {
                original
                    .row(e, channel)
                    .iter()
                    .zip(cleaned.row(e, channel).iter())
                    .map(|(o, c)| (o - c).powi(2))
                    .sum::<f64>()
            }))
            .unwrap_or(0);
            Ok(RemovalTrace {
                component,
                channel,
                epoch: original.is_epoched().then_some(epoch),
                original: original.row(epoch, channel).to_vec(),
                cleaned: cleaned.row(epoch, channel).to_vec(),
            })
        })
        .collect()
}

/// Sensor-space reconstruction `A · S` of every component.
pub fn reconstruct(ic: &IndependentComponents) -> Signal {
    match &ic.s {
        Signal::Continuous(s) => Signal::Continuous(ic.a.dot(s)),
        Signal::Epoched(s) => {
            let (n_e, _, n_t) = s.dim();
            let mut out = Array3::<f64>::zeros((n_e, ic.n_channels(), n_t));
            for (mut o, se) in out.outer_iter_mut().zip(s.outer_iter()) {
                o.assign(&ic.a.dot(&se));
            }
            Signal::Epoched(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2, Array3};

    fn record() -> (Signal, IndependentComponents) {
        let a = array![[1.0, 0.5], [0.2, -2.0], [0.0, 1.0]];
        let s = Array3::from_shape_fn((3, 2, 20), |(e, k, t)| ((e + 1) * (k + 2)) as f64 * (t as f64 * 0.3).sin());
        let w = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let ic = IndependentComponents::new(a, w, Signal::from(s)).unwrap();
        let data = reconstruct(&ic);
        (data, ic)
    }

    #[test]
    fn removing_one_component_leaves_the_other() {
        let (data, ic) = record();
        let cleaned = remove_components(&data, &ic, &[1]).unwrap();
        let Signal::Epoched(x) = &cleaned else { panic!("layout changed") };
        let Signal::Epoched(s) = &ic.s else { unreachable!() };
        for e in 0..3 {
            for t in 0..20 {
                approx::assert_abs_diff_eq!(x[[e, 2, t]], 0.0, epsilon = 1e-12);
                approx::assert_abs_diff_eq!(x[[e, 0, t]], s[[e, 0, t]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn traces_pick_strongest_channel_and_trial() {
        let (data, ic) = record();
        let cleaned = remove_components(&data, &ic, &[1]).unwrap();
        let traces = comparison_traces(&data, &cleaned, &ic, &[1]).unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].channel, 1);
        // Source amplitude grows with the epoch index.
        assert_eq!(traces[0].epoch, Some(2));
    }

    #[test]
    fn out_of_range_and_shape_errors() {
        let (data, ic) = record();
        assert!(matches!(remove_components(&data, &ic, &[2]), Err(IcaError::Config(_))));
        let flat = Signal::from(Array2::<f64>::zeros((3, 20)));
        assert!(matches!(remove_components(&flat, &ic, &[0]), Err(IcaError::Shape(_))));
        let short = Signal::from(Array3::<f64>::zeros((3, 3, 19)));
        assert!(matches!(remove_components(&short, &ic, &[0]), Err(IcaError::Shape(_))));
    }

    #[test]
    fn traces_reject_out_of_range_component() {
        let (data, ic) = record();
        assert!(matches!(comparison_traces(&data, &data, &ic, &[5]), Err(IcaError::Config(_))));
        assert!(matches!(comparison_traces(&data, &data, &ic, &[0, 2]), Err(IcaError::Config(_))));
    }
}

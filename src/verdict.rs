//! Vote merging across the analysis stages, and the diagnostic panels
//! that go with it.
//!
//! A component is rejected as soon as any stage flags it. One panel is
//! produced per active criterion so a renderer can lay them out in a grid.
use crate::ic::IndependentComponents;

/// Sorted, deduplicated copy of `list`.
pub fn normalize_list(list: &[usize]) -> Vec<usize> {
    let mut out = list.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

/// Union of several rejection lists, sorted and deduplicated.
pub fn merge_lists(lists: &[&[usize]]) -> Vec<usize> {
    let all: Vec<usize> = lists.iter().flat_map(|l| l.iter().copied()).collect();
    normalize_list(&all)
}

/// One criterion's values across components.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub ylabel: String,
    /// One value per component, in IC order.
    pub values: Vec<f64>,
    /// Horizontal threshold lines.
    pub thresholds: Vec<f64>,
    /// Components this criterion flags.
    pub rejected: Vec<usize>,
    /// Components rejected by any criterion, drawn as hollow markers.
    pub merged: Vec<usize>,
}

/// `nrows × ncols` arrangement for `total` panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub nrows: usize,
    pub ncols: usize,
}

impl GridLayout {
    /// `ncols = floor(sqrt(total))`, `nrows = ceil(total / ncols)`.
    /// `None` when there is nothing to draw.
    pub fn for_panels(total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let mut ncols = (total as f64).sqrt().floor() as usize;
        // Guard against sqrt rounding just below an exact square.
        while (ncols + 1) * (ncols + 1) <= total {
            ncols += 1;
        }
        Some(Self { nrows: total.div_ceil(ncols), ncols })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub keep: Vec<usize>,
    pub reject: Vec<usize>,
    pub panels: Vec<Panel>,
    pub layout: Option<GridLayout>,
}

fn flagged(values: &[f64], pred: impl Fn(f64) -> bool) -> Vec<usize> {
    values.iter().enumerate().filter_map(|(i, &v)| pred(v).then_some(i)).collect()
}

fn panels(ic: &IndependentComponents, merged: &[usize]) -> Vec<Panel> {
    let mut out = Vec::new();

    if let Some(c) = &ic.cumulant {
        let t_skew: Vec<f64> = c.t_skew.filter(|t| !t.is_nan()).map(|t| vec![-t, t]).unwrap_or_default();
        out.push(Panel {
            merged: merged.to_vec(),
            title: "Skewness".into(),
            ylabel: "skew".into(),
            rejected: match c.t_skew.filter(|t| !t.is_nan()) {
                Some(t) => flagged(&c.skew, |v| v.abs() > t),
                None => Vec::new(),
            },
            values: c.skew.clone(),
            thresholds: t_skew,
        });
        let t_kurt = c.t_kurt.filter(|t| !t.is_nan());
        out.push(Panel {
            merged: merged.to_vec(),
            title: "Kurtosis".into(),
            ylabel: "excess kurtosis".into(),
            rejected: match t_kurt {
                Some(t) => flagged(&c.kurt, |v| v > t),
                None => Vec::new(),
            },
            values: c.kurt.clone(),
            thresholds: t_kurt.into_iter().collect(),
        });
    }

    if let Some(c) = &ic.corr {
        for r in &c.references {
            out.push(Panel {
                merged: merged.to_vec(),
                title: format!("Signal correlation with {}", r.name),
                ylabel: "r".into(),
                values: r.sig.clone(),
                thresholds: vec![-c.t_sigcorr, c.t_sigcorr],
                rejected: flagged(&r.sig, |v| v.abs() >= c.t_sigcorr),
            });
            out.push(Panel {
                merged: merged.to_vec(),
                title: format!("Power correlation with {}", r.name),
                ylabel: "r".into(),
                values: r.pow.clone(),
                thresholds: vec![-c.t_powcorr, c.t_powcorr],
                rejected: flagged(&r.pow, |v| v.abs() >= c.t_powcorr),
            });
        }
    }

    if let Some(sp) = &ic.spectral {
        for (j, (band, &t)) in sp.bands.iter().zip(&sp.t_gof).enumerate() {
            let values = sp.gof.column(j).to_vec();
            out.push(Panel {
                merged: merged.to_vec(),
                title: format!("{} fit {}-{} Hz", band.kind, band.band[0], band.band[1]),
                ylabel: "gof".into(),
                rejected: flagged(&values, |v| !(v < t)),
                values,
                thresholds: vec![t],
            });
        }
    }
    out
}

/// Merge the rejection lists present on `ic` and build the panel set.
pub fn aggregate(ic: &IndependentComponents) -> Verdict {
    let empty: &[usize] = &[];
    let reject = merge_lists(&[
        ic.cumulant.as_ref().map_or(empty, |c| c.list.as_slice()),
        ic.corr.as_ref().map_or(empty, |c| c.list.as_slice()),
        ic.spectral.as_ref().map_or(empty, |s| s.list.as_slice()),
    ]);
    let keep: Vec<usize> = (0..ic.n_components()).filter(|i| reject.binary_search(i).is_err()).collect();

    let panels = panels(ic, &reject);
    let layout = GridLayout::for_panels(panels.len());
    log::info!(
        "{} components kept, {} rejected: {reject:?}",
        keep.len(),
        reject.len()
    );
    Verdict { keep, reject, panels, layout }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_rules() {
        assert_eq!(GridLayout::for_panels(0), None);
        assert_eq!(GridLayout::for_panels(1), Some(GridLayout { nrows: 1, ncols: 1 }));
        assert_eq!(GridLayout::for_panels(2), Some(GridLayout { nrows: 2, ncols: 1 }));
        assert_eq!(GridLayout::for_panels(5), Some(GridLayout { nrows: 3, ncols: 2 }));
        assert_eq!(GridLayout::for_panels(9), Some(GridLayout { nrows: 3, ncols: 3 }));
    }

    #[test]
    fn normalize_sorts_and_dedups() {
        assert_eq!(normalize_list(&[4, 1, 4, 0]), vec![0, 1, 4]);
        assert_eq!(merge_lists(&[]), Vec::<usize>::new());
    }
}

//! Continuous vs. epoched signal layout.
//!
//! Every stage accepts either a continuous `[rows, T]` matrix or a
//! trial-segmented `[epochs, rows, T]` cube. `rows` is channels for sensor
//! data and components for IC time courses.
use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::epoch::concat_epochs;

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// `[rows, T]`
    Continuous(Array2<f64>),
    /// `[epochs, rows, T]`
    Epoched(Array3<f64>),
}

impl Signal {
    /// Number of channels (or components).
    pub fn n_rows(&self) -> usize {
        match self {
            Signal::Continuous(x) => x.nrows(),
            Signal::Epoched(x) => x.dim().1,
        }
    }

    /// Samples per row (per epoch for epoched data).
    pub fn n_times(&self) -> usize {
        match self {
            Signal::Continuous(x) => x.ncols(),
            Signal::Epoched(x) => x.dim().2,
        }
    }

    /// `None` for continuous data.
    pub fn n_epochs(&self) -> Option<usize> {
        match self {
            Signal::Continuous(_) => None,
            Signal::Epoched(x) => Some(x.dim().0),
        }
    }

    pub fn is_epoched(&self) -> bool {
        matches!(self, Signal::Epoched(_))
    }

    /// Shape as a slice-friendly vector, for error messages.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Signal::Continuous(x) => x.shape().to_vec(),
            Signal::Epoched(x) => x.shape().to_vec(),
        }
    }

    /// Continuous `[rows, K·T]` view of the data.
    ///
    /// Epoched data is baseline corrected per epoch before concatenation;
    /// continuous data is returned as-is.
    pub fn concatenated(&self) -> Array2<f64> {
        match self {
            Signal::Continuous(x) => x.clone(),
            Signal::Epoched(x) => concat_epochs(x),
        }
    }

    /// Reorder rows. `order[i]` is the old index that ends up at position `i`.
    pub fn select_rows(&self, order: &[usize]) -> Signal {
        match self {
            Signal::Continuous(x) => Signal::Continuous(x.select(Axis(0), order)),
            Signal::Epoched(x) => Signal::Epoched(x.select(Axis(1), order)),
        }
    }

    /// Row `r` of epoch `e` (epoch is ignored for continuous data).
    pub fn row(&self, epoch: usize, r: usize) -> ndarray::ArrayView1<'_, f64> {
        match self {
            Signal::Continuous(x) => x.row(r),
            Signal::Epoched(x) => x.index_axis(Axis(0), epoch).index_axis_move(Axis(0), r),
        }
    }

    /// Iterate `[rows, T]` views, one per epoch (a single view when continuous).
    pub fn epochs(&self) -> Vec<ArrayView2<'_, f64>> {
        match self {
            Signal::Continuous(x) => vec![x.view()],
            Signal::Epoched(x) => x.outer_iter().collect(),
        }
    }
}

impl From<Array2<f64>> for Signal {
    fn from(x: Array2<f64>) -> Self {
        Signal::Continuous(x)
    }
}

impl From<Array3<f64>> for Signal {
    fn from(x: Array3<f64>) -> Self {
        Signal::Epoched(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_for_both_layouts() {
        let c = Signal::from(Array2::<f64>::zeros((4, 100)));
        assert_eq!((c.n_rows(), c.n_times(), c.n_epochs()), (4, 100, None));

        let e = Signal::from(Array3::<f64>::zeros((3, 4, 50)));
        assert_eq!((e.n_rows(), e.n_times(), e.n_epochs()), (4, 50, Some(3)));
        assert!(e.is_epoched());
    }

    #[test]
    fn select_rows_permutes_component_axis() {
        let x = Array3::from_shape_fn((2, 3, 4), |(e, r, _)| (e * 10 + r) as f64);
        let s = Signal::from(x).select_rows(&[2, 0, 1]);
        assert_eq!(s.row(1, 0)[0], 12.0);
        assert_eq!(s.row(0, 1)[0], 0.0);
    }
}

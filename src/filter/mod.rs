//! Cosine-taper band filtering used by the correlation stage.
//!
//! - [`design`]: window + frequency multiplier from a [`crate::config::FilterSpec`].
//! - [`apply`]: FFT-domain application to each row of a matrix.

pub mod apply;
pub mod design;

pub use apply::apply_cosine_filter;
pub use design::{hamming, prepare_cosine_filter, CosineFilter, PassKind, Window};

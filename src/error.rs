//! Error taxonomy shared by every pipeline stage.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IcaError {
    /// Array dimensions are inconsistent with each other or with the IC record.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Malformed, missing or out-of-range configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unsupported fit type: {0}")]
    UnsupportedFitType(String),

    /// The decomposition backend refused or failed to converge.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    #[error("linear algebra failure: {0}")]
    Linalg(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IcaError>;

impl IcaError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

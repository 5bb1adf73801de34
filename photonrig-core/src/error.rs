//! Error types for photonrig-core.

use thiserror::Error;

/// Result type alias for photonrig operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for photonrig operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bin plan or analysis parameters are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file is missing or malformed.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A named histogram is absent from an engine result.
    #[error("missing channel histogram: {name}")]
    MissingChannel { name: String },

    /// A histogram does not have the expected number of bins.
    #[error("histogram {name} has {actual} bins, expected {expected}")]
    HistogramLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

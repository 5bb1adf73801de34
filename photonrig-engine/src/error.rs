//! Engine and scan error types.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine and scan error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Clip or run failure inside the correlation engine.
    #[error("engine error: {0}")]
    Engine(String),

    /// Recipe could not be loaded or the engine rejected it.
    #[error("recipe error: {0}")]
    Recipe(String),

    /// The scan was cancelled; its partial histograms are not valid.
    #[error("scan cancelled")]
    Cancelled,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] photonrig_core::Error),
}

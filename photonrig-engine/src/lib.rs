//! photonrig-engine: Resumable event-stream scanning.
//!
//! This crate drives a time-correlation engine over a time-tag file in
//! chunks, accumulating per-channel histograms across chunks, and wraps the
//! whole analysis chain in an [`AnalysisSession`].
//!
//! The engine itself is abstracted behind [`ClipSource`] and
//! [`HistogramEngine`]; [`ReplayEngine`] replays recorded engine output.

pub mod cancel;
pub mod engine;
mod error;
pub mod recipe;
pub mod replay;
pub mod scan;
pub mod session;

pub use cancel::{CancelCheck, CancellationToken};
pub use engine::{ClipSource, EngineRun, EventPosition, FormatCode, HistogramEngine, RunSettings};
pub use error::{Error, Result};
pub use recipe::Recipe;
pub use replay::{ReplayCapture, ReplayEngine};
pub use scan::{
    run_full_scan, scan_named, HistogramSelection, NamedScan, ScanOptions, ScanOutcome,
    ScanProgress, ScanResult,
};
pub use session::{AnalysisOutcome, AnalysisSession, PairResults};

pub use photonrig_core::RecipeParams;

//! photonrig-core: Core types for time-tagged spectrometer analysis.
//!
//! This crate provides the pure building blocks of the analysis chain:
//! detector channel identities, wavelength bin plans, additive histograms,
//! per-channel metrics, correlation pair merging and wavelength color mapping.
//!

pub mod bins;
pub mod channel;
pub mod color;
pub mod config;
pub mod correlation;
pub mod error;
pub mod histogram;
pub mod metrics;

pub use bins::BinPlan;
pub use channel::{Channel, ChannelId};
pub use color::{cie_rgb, simple_rgb, ColorModel, Rgb};
pub use config::{
    AnalysisConfig, AnalysisKind, RecipeParams, ScanSettings, SpectrometerConfig, TimingConfig,
    COUNTRATE_BINSIZE_PS,
};
pub use correlation::{delay_axis, merge_pair, merge_pairs, CorrelationPair, CorrelationPairSpec};
pub use error::{Error, Result};
pub use histogram::{time_axis, ChannelHistograms, Histogram, RawHistograms, TimeUnit};
pub use metrics::{summarize, summarize_with_model};

//! Analysis configuration.
//!
//! Configuration is plain serde data with builder setters, loadable from a
//! JSON file. Every field has a default so partial files are accepted:
//!
//! ```json
//! {
//!   "spectrometer": { "center_wavelength_nm": 729.1, "pixel_width_nm": 0.6,
//!                     "channels": ["h2", "h3", "h4"] },
//!   "timing": { "bins": 100, "binsize_ps": 100, "det_delay_ps": 0, "scan_time_s": 10.0 }
//! }
//! ```

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bins::BinPlan;
use crate::channel::ChannelId;
use crate::histogram::TimeUnit;
use crate::{Error, Result};

/// Fixed countrate bin width: 10 * 10^10 ps (0.1 s).
pub const COUNTRATE_BINSIZE_PS: u64 = 10 * 10_000_000_000;

/// Monochromator and detector array geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrometerConfig {
    /// Monochromator center wavelength (nm).
    pub center_wavelength_nm: f64,
    /// Spectral width of one detector pixel (nm).
    pub pixel_width_nm: f64,
    /// Detector channels in wavelength order; rank `i` gets bin center `i`.
    pub channels: Vec<ChannelId>,
}

impl Default for SpectrometerConfig {
    fn default() -> Self {
        Self {
            center_wavelength_nm: 729.1,
            pixel_width_nm: 0.6,
            channels: vec![ChannelId::H2, ChannelId::H3, ChannelId::H4],
        }
    }
}

/// Histogram timing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Number of time bins for lifetime and correlation histograms.
    pub bins: usize,
    /// Time bin width (ps).
    pub binsize_ps: u64,
    /// Detector delay applied by lifetime recipes (ps).
    pub det_delay_ps: i64,
    /// Countrate acquisition length (s).
    pub scan_time_s: f64,
    /// Unit of produced time axes.
    pub time_unit: TimeUnit,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bins: 100,
            binsize_ps: 100,
            det_delay_ps: 0,
            scan_time_s: 10.0,
            time_unit: TimeUnit::Nanoseconds,
        }
    }
}

/// Scan loop and engine invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Engine calls between cancellation checks.
    pub cancel_poll_interval: usize,
    /// Vendor event-file encoding handed to the engine.
    pub format_code: u8,
    /// Engine group whose histograms are read.
    pub group: String,
    /// Clips the engine may pull per run call.
    pub max_autofeed: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            cancel_poll_interval: 100,
            format_code: 1,
            group: "main".to_string(),
            max_autofeed: 1,
        }
    }
}

/// Which histogram an analysis run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// Counts per 0.1 s over the scan time.
    Countrate,
    /// Counts versus time since trigger.
    Lifetime,
    /// Photon-pair delay histograms.
    Correlation,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::Countrate => write!(f, "countrate"),
            AnalysisKind::Lifetime => write!(f, "lifetime"),
            AnalysisKind::Correlation => write!(f, "correlation"),
        }
    }
}

/// Keyword parameters handed to the engine alongside a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeParams {
    pub bins: usize,
    pub binsize_ps: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub det_delay_ps: Option<i64>,
}

/// Complete configuration of one analysis session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub spectrometer: SpectrometerConfig,
    pub timing: TimingConfig,
    pub scan: ScanSettings,
}

impl AnalysisConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the file cannot be read or parsed,
    /// or [`Error::InvalidConfiguration`] if the values fail validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// See [`Self::from_file`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the monochromator center wavelength.
    #[must_use]
    pub fn with_center_wavelength(mut self, nm: f64) -> Self {
        self.spectrometer.center_wavelength_nm = nm;
        self
    }

    /// Sets the pixel width.
    #[must_use]
    pub fn with_pixel_width(mut self, nm: f64) -> Self {
        self.spectrometer.pixel_width_nm = nm;
        self
    }

    /// Sets the channel order.
    #[must_use]
    pub fn with_channels(mut self, channels: Vec<ChannelId>) -> Self {
        self.spectrometer.channels = channels;
        self
    }

    /// Sets bin count and width for lifetime/correlation histograms.
    #[must_use]
    pub fn with_bins(mut self, bins: usize, binsize_ps: u64) -> Self {
        self.timing.bins = bins;
        self.timing.binsize_ps = binsize_ps;
        self
    }

    /// Sets the detector delay.
    #[must_use]
    pub fn with_det_delay(mut self, ps: i64) -> Self {
        self.timing.det_delay_ps = ps;
        self
    }

    /// Sets the countrate scan time.
    #[must_use]
    pub fn with_scan_time(mut self, seconds: f64) -> Self {
        self.timing.scan_time_s = seconds;
        self
    }

    /// Sets the unit of produced time axes.
    #[must_use]
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.timing.time_unit = unit;
        self
    }

    /// Sets the cancellation poll interval.
    #[must_use]
    pub fn with_cancel_poll_interval(mut self, interval: usize) -> Self {
        self.scan.cancel_poll_interval = interval;
        self
    }

    /// Number of channels in the detector array.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.spectrometer.channels.len()
    }

    /// Compute the wavelength bin plan for this configuration.
    ///
    /// # Errors
    /// Propagates [`BinPlan::compute`] errors.
    pub fn bin_plan(&self) -> Result<BinPlan> {
        BinPlan::compute(
            self.spectrometer.center_wavelength_nm,
            self.spectrometer.pixel_width_nm,
            self.channel_count(),
        )
    }

    /// Check every parameter the analysis depends on.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfiguration`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        self.bin_plan()?;

        let channels = &self.spectrometer.channels;
        for (i, id) in channels.iter().enumerate() {
            if channels[..i].contains(id) {
                return Err(Error::InvalidConfiguration(format!(
                    "channel {id} listed twice"
                )));
            }
        }
        if self.timing.bins == 0 {
            return Err(Error::InvalidConfiguration(
                "bins must be at least 1".to_string(),
            ));
        }
        if self.timing.binsize_ps == 0 {
            return Err(Error::InvalidConfiguration(
                "binsize_ps must be at least 1".to_string(),
            ));
        }
        if !self.timing.scan_time_s.is_finite() || self.timing.scan_time_s <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "scan_time_s must be positive, got {}",
                self.timing.scan_time_s
            )));
        }
        if self.scan.cancel_poll_interval == 0 {
            return Err(Error::InvalidConfiguration(
                "cancel_poll_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Engine parameters for the given analysis kind.
    ///
    /// Countrate uses a fixed 0.1 s bin and scales only the bin count with
    /// the scan time: `bins = scan_time * 0.1 * 100`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn recipe_params(&self, kind: AnalysisKind) -> RecipeParams {
        match kind {
            AnalysisKind::Countrate => RecipeParams {
                bins: ((self.timing.scan_time_s * 0.1 * 100.0).round() as usize).max(1),
                binsize_ps: COUNTRATE_BINSIZE_PS,
                det_delay_ps: None,
            },
            AnalysisKind::Lifetime => RecipeParams {
                bins: self.timing.bins,
                binsize_ps: self.timing.binsize_ps,
                det_delay_ps: Some(self.timing.det_delay_ps),
            },
            AnalysisKind::Correlation => RecipeParams {
                bins: self.timing.bins,
                binsize_ps: self.timing.binsize_ps,
                det_delay_ps: None,
            },
        }
    }
}

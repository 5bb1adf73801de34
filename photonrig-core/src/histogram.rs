//! Additive count histograms and time axes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::{Error, Result};

/// Histograms keyed by engine name (`"h2"`, `"h23"`), as produced by the
/// correlation engine for one chunk or one run.
pub type RawHistograms = BTreeMap<String, Vec<u64>>;

/// Accumulated histograms keyed by detector channel.
pub type ChannelHistograms = BTreeMap<ChannelId, Histogram>;

/// A fixed-length count histogram that accumulates chunk deltas.
///
/// All chunks folded into one histogram share its length and bin width;
/// folding is elementwise addition, so chunk order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    /// Create a zeroed histogram with `bins` bins.
    #[must_use]
    pub fn zeros(bins: usize) -> Self {
        Self {
            counts: vec![0; bins],
        }
    }

    /// Fold a chunk delta into this histogram.
    ///
    /// # Errors
    /// Returns [`Error::HistogramLength`] if `delta` has a different length;
    /// the histogram is left unchanged.
    pub fn accumulate(&mut self, name: &str, delta: &[u64]) -> Result<()> {
        if delta.len() != self.counts.len() {
            return Err(Error::HistogramLength {
                name: name.to_string(),
                expected: self.counts.len(),
                actual: delta.len(),
            });
        }
        for (acc, &d) in self.counts.iter_mut().zip(delta) {
            *acc = acc.saturating_add(d);
        }
        Ok(())
    }

    /// Sum of all bins.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Index of the first maximum; `None` for an empty histogram.
    #[must_use]
    pub fn peak_index(&self) -> Option<usize> {
        let max = *self.counts.iter().max()?;
        self.counts.iter().position(|&c| c == max)
    }

    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    #[must_use]
    pub fn into_counts(self) -> Vec<u64> {
        self.counts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl From<Vec<u64>> for Histogram {
    fn from(counts: Vec<u64>) -> Self {
        Self { counts }
    }
}

/// Display unit for time axes. Engine times are always picoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(rename = "ps")]
    Picoseconds,
    #[default]
    #[serde(rename = "ns")]
    Nanoseconds,
    #[serde(rename = "us")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
}

impl TimeUnit {
    /// Picoseconds per unit.
    #[must_use]
    pub fn ps_per_unit(self) -> f64 {
        match self {
            TimeUnit::Picoseconds => 1.0,
            TimeUnit::Nanoseconds => 1e3,
            TimeUnit::Microseconds => 1e6,
            TimeUnit::Milliseconds => 1e9,
            TimeUnit::Seconds => 1e12,
        }
    }

    /// Convert a picosecond value to this unit.
    #[must_use]
    pub fn from_ps(self, ps: f64) -> f64 {
        ps / self.ps_per_unit()
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Picoseconds => "ps",
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        };
        f.write_str(s)
    }
}

/// Time axis for `bins` bins of `binsize_ps`: `axis[i] = i * binsize`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn time_axis(bins: usize, binsize_ps: u64, unit: TimeUnit) -> Vec<f64> {
    let binsize = binsize_ps as f64;
    (0..bins)
        .map(|i| unit.from_ps(i as f64 * binsize))
        .collect()
}

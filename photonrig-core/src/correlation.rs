//! Photon-pair cross-correlation (g2) curve assembly.
//!
//! The engine produces one histogram per direction of a channel pair:
//! delays from `a` to `b` and delays from `b` to `a`, each `bins` long.
//! Merging concatenates them into a single curve over the signed delay
//! axis `[-bins, bins) * binsize`.
//!
//! Ordering: the *forward* histogram fills the negative half of the axis
//! and the *backward* histogram fills the non-negative half.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::histogram::{RawHistograms, TimeUnit};
use crate::{Error, Result};

/// Names of the two directional histograms that make up one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationPairSpec {
    /// Key of the merged curve in the output.
    pub label: String,
    /// Histogram placed on the negative delay half.
    pub forward: String,
    /// Histogram placed on the non-negative delay half.
    pub backward: String,
}

impl CorrelationPairSpec {
    /// Pair two detector channels using the engine's `h<a><b>` naming.
    ///
    /// The label is the forward name, e.g. `h23` for channels 2 and 3.
    #[must_use]
    pub fn between(a: ChannelId, b: ChannelId) -> Self {
        let forward = format!("h{}{}", a.number(), b.number());
        let backward = format!("h{}{}", b.number(), a.number());
        Self {
            label: forward.clone(),
            forward,
            backward,
        }
    }

    /// Pair two arbitrarily named histograms.
    #[must_use]
    pub fn named(
        label: impl Into<String>,
        forward: impl Into<String>,
        backward: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            forward: forward.into(),
            backward: backward.into(),
        }
    }
}

/// A merged g2 curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub label: String,
    /// Signed delays, `2 * bins` long.
    pub delay_axis: Vec<f64>,
    /// Forward then backward counts, same length as `delay_axis`.
    pub histogram: Vec<u64>,
}

/// Signed delay axis `[-bins, bins) * binsize_ps`, converted to `unit`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn delay_axis(bins: usize, binsize_ps: u64, unit: TimeUnit) -> Vec<f64> {
    let bins = bins as i64;
    let binsize = binsize_ps as f64;
    (-bins..bins)
        .map(|i| unit.from_ps(i as f64 * binsize))
        .collect()
}

fn directional<'a>(raw: &'a RawHistograms, name: &str, bins: usize) -> Result<&'a [u64]> {
    let hist = raw.get(name).ok_or_else(|| Error::MissingChannel {
        name: name.to_string(),
    })?;
    if hist.len() != bins {
        return Err(Error::HistogramLength {
            name: name.to_string(),
            expected: bins,
            actual: hist.len(),
        });
    }
    Ok(hist)
}

/// Merge one pair from an engine result.
///
/// # Errors
/// - [`Error::MissingChannel`] if either directional histogram is absent.
/// - [`Error::HistogramLength`] if either is not `bins` long.
pub fn merge_pair(
    raw: &RawHistograms,
    spec: &CorrelationPairSpec,
    bins: usize,
    binsize_ps: u64,
) -> Result<CorrelationPair> {
    let forward = directional(raw, &spec.forward, bins)?;
    let backward = directional(raw, &spec.backward, bins)?;

    let mut histogram = Vec::with_capacity(2 * bins);
    histogram.extend_from_slice(forward);
    histogram.extend_from_slice(backward);

    Ok(CorrelationPair {
        label: spec.label.clone(),
        delay_axis: delay_axis(bins, binsize_ps, TimeUnit::Nanoseconds),
        histogram,
    })
}

/// Merge every pair independently; a failing pair does not affect others.
#[must_use]
pub fn merge_pairs(
    raw: &RawHistograms,
    specs: &[CorrelationPairSpec],
    bins: usize,
    binsize_ps: u64,
) -> BTreeMap<String, Result<CorrelationPair>> {
    specs
        .par_iter()
        .map(|spec| (spec.label.clone(), merge_pair(raw, spec, bins, binsize_ps)))
        .collect()
}

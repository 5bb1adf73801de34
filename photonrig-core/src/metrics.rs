//! Per-channel metrics extraction.
//!
//! Turns the accumulated histograms of a completed scan into [`Channel`]
//! records: counts, peak, lifetime, wavelength and display color.

use rayon::prelude::*;

use crate::bins::BinPlan;
use crate::channel::{Channel, ChannelId};
use crate::color::ColorModel;
use crate::histogram::ChannelHistograms;
use crate::{Error, Result};

/// Summarize channels in `order` using the CIE color model.
///
/// The channel at position `rank` in `order` is assigned
/// `plan.centers()[rank]` as its wavelength.
///
/// # Errors
/// - [`Error::InvalidConfiguration`] if `order` is longer than the bin plan.
/// - [`Error::MissingChannel`] if a channel in `order` has no histogram.
/// - [`Error::HistogramLength`] if a histogram and `time_axis` differ in length.
pub fn summarize(
    histograms: &ChannelHistograms,
    order: &[ChannelId],
    time_axis: &[f64],
    plan: &BinPlan,
) -> Result<Vec<Channel>> {
    summarize_with_model(histograms, order, time_axis, plan, ColorModel::Cie)
}

/// Same as [`summarize`] with an explicit color model.
///
/// # Errors
/// See [`summarize`].
pub fn summarize_with_model(
    histograms: &ChannelHistograms,
    order: &[ChannelId],
    time_axis: &[f64],
    plan: &BinPlan,
    model: ColorModel,
) -> Result<Vec<Channel>> {
    if order.len() > plan.channel_count() {
        return Err(Error::InvalidConfiguration(format!(
            "{} channels but bin plan covers {}",
            order.len(),
            plan.channel_count()
        )));
    }

    // Collecting into Result<Vec<_>> keeps input order.
    order
        .par_iter()
        .enumerate()
        .map(|(rank, &id)| {
            let histogram = histograms.get(&id).ok_or_else(|| Error::MissingChannel {
                name: id.name(),
            })?;
            if histogram.len() != time_axis.len() {
                return Err(Error::HistogramLength {
                    name: id.name(),
                    expected: time_axis.len(),
                    actual: histogram.len(),
                });
            }

            let peak_bin_index = histogram.peak_index().unwrap_or(0);
            let lifetime_value = time_axis.get(peak_bin_index).copied().unwrap_or(0.0);
            let wavelength = plan.centers()[rank];

            Ok(Channel {
                id,
                histogram: histogram.counts().to_vec(),
                wavelength,
                color: model.apply(wavelength),
                total_counts: histogram.total(),
                peak_bin_index,
                lifetime_value,
            })
        })
        .collect()
}

//! Wavelength bin plan for the detector channel array.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Evenly spaced wavelength bins centered on the monochromator setting.
///
/// Channel `i` of the array covers `[edges[i], edges[i + 1])` and is
/// assigned the wavelength `centers[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinPlan {
    center_wavelength: f64,
    pixel_width: f64,
    edges: Vec<f64>,
    centers: Vec<f64>,
}

impl BinPlan {
    /// Compute bin edges and centers for `channel_count` pixels of
    /// `pixel_width` nm each, centered on `center` nm.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfiguration`] if `channel_count` is zero,
    /// `pixel_width` is not strictly positive, or either float is not finite.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(center: f64, pixel_width: f64, channel_count: usize) -> Result<Self> {
        if channel_count == 0 {
            return Err(Error::InvalidConfiguration(
                "channel_count must be at least 1".to_string(),
            ));
        }
        if !pixel_width.is_finite() || pixel_width <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "pixel_width must be positive, got {pixel_width}"
            )));
        }
        if !center.is_finite() {
            return Err(Error::InvalidConfiguration(format!(
                "center wavelength must be finite, got {center}"
            )));
        }

        let n = channel_count as f64;
        let half_span = n * pixel_width / 2.0;
        let left = center - half_span;
        let right = center + half_span;
        let step = (right - left) / n;

        let mut edges: Vec<f64> = (0..=channel_count)
            .map(|i| left + i as f64 * step)
            .collect();
        // Pin the last edge so the span is exact.
        edges[channel_count] = right;
        if !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InvalidConfiguration(format!(
                "pixel_width {pixel_width} is below float resolution at center {center}"
            )));
        }

        let centers = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();

        Ok(Self {
            center_wavelength: center,
            pixel_width,
            edges,
            centers,
        })
    }

    /// `channel_count + 1` strictly increasing bin edges (nm).
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// `channel_count` bin centers (nm).
    #[must_use]
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Wavelength assigned to the channel at `rank` in the channel order.
    #[must_use]
    pub fn center(&self, rank: usize) -> Option<f64> {
        self.centers.get(rank).copied()
    }

    /// Number of channels covered.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.centers.len()
    }

    #[must_use]
    pub fn center_wavelength(&self) -> f64 {
        self.center_wavelength
    }

    #[must_use]
    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }
}

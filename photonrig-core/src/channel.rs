//! Detector channel identities and per-channel summary records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::Error;

/// A detector channel unit of the time-correlation backend.
///
/// The backend names the histogram of channel `n` as `h<n>`; the
/// enumeration is closed over the inputs the hardware exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelId {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    H7,
    H8,
}

impl ChannelId {
    /// All channels in hardware order.
    pub const ALL: [ChannelId; 8] = [
        ChannelId::H1,
        ChannelId::H2,
        ChannelId::H3,
        ChannelId::H4,
        ChannelId::H5,
        ChannelId::H6,
        ChannelId::H7,
        ChannelId::H8,
    ];

    /// Hardware input number (1-based).
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            ChannelId::H1 => 1,
            ChannelId::H2 => 2,
            ChannelId::H3 => 3,
            ChannelId::H4 => 4,
            ChannelId::H5 => 5,
            ChannelId::H6 => 6,
            ChannelId::H7 => 7,
            ChannelId::H8 => 8,
        }
    }

    /// Histogram name used by the correlation engine recipe (`"h2"`).
    #[must_use]
    pub fn name(self) -> String {
        format!("h{}", self.number())
    }

    /// Look up a channel by hardware input number.
    #[must_use]
    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.number() == number)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.number())
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(['h', 'H']).unwrap_or(s);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| Error::InvalidConfiguration(format!("unknown channel: {s}")))
    }
}

/// Summary of one detector channel after a completed analysis run.
///
/// Records are built once per run and replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel identity.
    pub id: ChannelId,
    /// Accumulated counts per time bin.
    pub histogram: Vec<u64>,
    /// Wavelength assigned from the bin plan (nm).
    pub wavelength: f64,
    /// Display color for `wavelength`.
    pub color: Rgb,
    /// Sum of `histogram`.
    pub total_counts: u64,
    /// Index of the first maximum of `histogram`.
    pub peak_bin_index: usize,
    /// Time-axis value at `peak_bin_index`.
    pub lifetime_value: f64,
}

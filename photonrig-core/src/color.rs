//! Wavelength to display color mapping.
//!
//! Two independent models are provided:
//!
//! - [`cie_rgb`]: multi-lobe Gaussian fit of the CIE 1931 color matching
//!   functions, converted to sRGB with gamma companding.
//! - [`simple_rgb`]: piecewise-linear spectrum ramp with an intensity
//!   falloff near the edges of vision.
//!
//! Both are pure and return black outside the range where they carry color.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An 8-bit RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Black.
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Available wavelength color models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorModel {
    /// CIE 1931 approximation (perceptually correct).
    #[default]
    Cie,
    /// Piecewise-linear spectrum ramp.
    Simple,
}

impl fmt::Display for ColorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorModel::Cie => write!(f, "CIE 1931"),
            ColorModel::Simple => write!(f, "Simple"),
        }
    }
}

impl ColorModel {
    /// Map a wavelength in nanometers to a display color.
    #[must_use]
    pub fn apply(self, wavelength_nm: f64) -> Rgb {
        match self {
            ColorModel::Cie => cie_rgb(wavelength_nm),
            ColorModel::Simple => simple_rgb(wavelength_nm),
        }
    }
}

/// Convert f64 to u8 with clamping to [0, 255].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn f64_to_u8(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

/// One asymmetric Gaussian lobe: `amplitude * exp(-0.5 * ((x - center) * w)^2)`
/// with `w = left` below `center` and `w = right` at or above it.
#[inline]
fn lobe(x: f64, amplitude: f64, center: f64, left: f64, right: f64) -> f64 {
    let t = (x - center) * if x < center { left } else { right };
    amplitude * (-0.5 * t * t).exp()
}

fn tristimulus(wavelength_nm: f64) -> (f64, f64, f64) {
    let l = wavelength_nm;
    let x = lobe(l, 0.362, 442.0, 0.0624, 0.0374) + lobe(l, 1.056, 599.8, 0.0264, 0.0323)
        - lobe(l, 0.065, 501.1, 0.0490, 0.0382);
    let y = lobe(l, 0.821, 568.8, 0.0213, 0.0247) + lobe(l, 0.286, 530.9, 0.0613, 0.0322);
    let z = lobe(l, 1.217, 437.0, 0.0845, 0.0278) + lobe(l, 0.681, 459.0, 0.0385, 0.0725);
    (x, y, z)
}

/// sRGB gamma companding of a linear channel value to 0..=255.
fn compand(value: f64) -> u8 {
    if value <= 0.0 {
        0
    } else if value <= 0.003_130_8 {
        f64_to_u8(255.0 * value * 12.92)
    } else if value <= 1.0 {
        f64_to_u8(255.0 * (1.055 * value.powf(1.0 / 2.4) - 0.055))
    } else {
        255
    }
}

/// Map a wavelength to sRGB through a Gaussian fit of the CIE 1931 observer.
///
/// Non-finite input maps to black.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn cie_rgb(wavelength_nm: f64) -> Rgb {
    if !wavelength_nm.is_finite() {
        return Rgb::BLACK;
    }
    let (x, y, z) = tristimulus(wavelength_nm);

    let r = 3.240_625_5 * x - 1.537_208 * y - 0.498_628_6 * z;
    let g = -0.968_930_7 * x + 1.875_756_1 * y + 0.041_517_5 * z;
    let b = 0.055_710_1 * x - 0.204_021_1 * y + 1.056_995_9 * z;

    Rgb::new(compand(r), compand(g), compand(b))
}

/// Map a wavelength to RGB with a piecewise-linear ramp over 380..=780 nm.
///
/// Wavelengths outside the range (and non-finite input) map to black.
#[must_use]
pub fn simple_rgb(wavelength_nm: f64) -> Rgb {
    let l = wavelength_nm;
    if !(380.0..=780.0).contains(&l) {
        return Rgb::BLACK;
    }

    let (r, g, b) = if l < 440.0 {
        (-(l - 440.0) / (440.0 - 380.0), 0.0, 1.0)
    } else if l < 490.0 {
        (0.0, (l - 440.0) / (490.0 - 440.0), 1.0)
    } else if l < 510.0 {
        (0.0, 1.0, -(l - 510.0) / (510.0 - 490.0))
    } else if l < 580.0 {
        ((l - 510.0) / (580.0 - 510.0), 1.0, 0.0)
    } else if l < 645.0 {
        (1.0, -(l - 645.0) / (645.0 - 580.0), 0.0)
    } else {
        (1.0, 0.0, 0.0)
    };

    // Intensity falls off toward the limits of vision
    let factor = if l < 420.0 {
        0.3 + 0.7 * (l - 380.0) / (420.0 - 380.0)
    } else if l <= 700.0 {
        1.0
    } else {
        0.3 + 0.7 * (780.0 - l) / (780.0 - 700.0)
    };

    let channel = |c: f64| f64_to_u8(255.0 * (c * factor).powf(0.8));
    Rgb::new(channel(r), channel(g), channel(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_format() {
        assert_eq!(Rgb::new(255, 16, 0).to_hex(), "#ff1000");
        assert_eq!(Rgb::BLACK.to_string(), "#000000");
    }

    #[test]
    fn test_cie_visible_colors() {
        assert_eq!(cie_rgb(450.0), Rgb::new(116, 0, 255));
        assert_eq!(cie_rgb(500.0), Rgb::new(0, 207, 129));
        assert_eq!(cie_rgb(550.0), Rgb::new(0, 255, 0));
        assert_eq!(cie_rgb(600.0), Rgb::new(255, 113, 0));
        assert_eq!(cie_rgb(650.0), Rgb::new(225, 0, 0));
    }

    #[test]
    fn test_cie_fades_outside_visible() {
        assert_eq!(cie_rgb(300.0), Rgb::BLACK);
        assert_eq!(cie_rgb(900.0), Rgb::BLACK);
        assert_eq!(cie_rgb(1500.0), Rgb::BLACK);
        assert_eq!(cie_rgb(f64::NAN), Rgb::BLACK);
        assert_eq!(cie_rgb(f64::INFINITY), Rgb::BLACK);
    }

    #[test]
    fn test_cie_near_infrared_is_dim() {
        // The default spectrometer window sits at the red edge of vision.
        let c = cie_rgb(729.1);
        assert_eq!(c.r, 0);
        assert!(c.g <= 2);
        assert_eq!(c.b, 0);
    }

    #[test]
    fn test_simple_band_transitions() {
        assert_eq!(simple_rgb(380.0), Rgb::new(97, 0, 97));
        assert_eq!(simple_rgb(420.0), Rgb::new(106, 0, 255));
        assert_eq!(simple_rgb(490.0), Rgb::new(0, 255, 255));
        assert_eq!(simple_rgb(510.0), Rgb::new(0, 255, 0));
        assert_eq!(simple_rgb(580.0), Rgb::new(255, 255, 0));
        assert_eq!(simple_rgb(645.0), Rgb::new(255, 0, 0));
        assert_eq!(simple_rgb(700.0), Rgb::new(255, 0, 0));
        assert_eq!(simple_rgb(780.0), Rgb::new(97, 0, 0));
    }

    #[test]
    fn test_simple_outside_range_is_black() {
        assert_eq!(simple_rgb(379.9), Rgb::BLACK);
        assert_eq!(simple_rgb(780.1), Rgb::BLACK);
        assert_eq!(simple_rgb(-5.0), Rgb::BLACK);
        assert_eq!(simple_rgb(f64::NAN), Rgb::BLACK);
    }

    #[test]
    fn test_models_are_pure() {
        for l in [380.0, 455.5, 532.0, 633.0, 729.1, 780.0] {
            assert_eq!(cie_rgb(l), cie_rgb(l));
            assert_eq!(simple_rgb(l), simple_rgb(l));
            assert_eq!(ColorModel::Cie.apply(l), cie_rgb(l));
            assert_eq!(ColorModel::Simple.apply(l), simple_rgb(l));
        }
    }
}

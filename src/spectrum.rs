//! Discretised visible spectrum with per-wavelength refractive index

use serde::Serialize;

/// Red end of the sampled spectrum (nm)
pub const WAVELENGTH_RED: f64 = 700.0;

/// Violet end of the sampled spectrum (nm)
pub const WAVELENGTH_VIOLET: f64 = 380.0;

/// Abbe numbers are clamped to at least this value
pub const MIN_ABBE: f64 = 1.0;

/// Abbe number at which dispersion vanishes
const ABBE_NEUTRAL: f64 = 70.0;

const GAMMA: f64 = 0.8;

/// 8-bit sRGB colour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One wavelength sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralBand {
    pub wavelength_nm: f64,
    pub refractive_index: f64,
    pub color: Rgb,
    /// Perceived brightness at this wavelength, in (0, 1]
    pub display_weight: f64,
}

/// Material dispersion description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersionParams {
    pub samples: usize,
    pub ior_base: f64,
    pub abbe_number: f64,
    pub dispersion_strength: f64,
}

impl Default for DispersionParams {
    fn default() -> Self {
        Self {
            samples: crate::DEFAULT_SPECTRAL_SAMPLES,
            ior_base: 1.52,
            abbe_number: 40.0,
            dispersion_strength: 1.0,
        }
    }
}

/// Sample the spectrum from red (band 0) to violet (band S-1)
pub fn spectral_bands(params: &DispersionParams) -> Vec<SpectralBand> {
    let s = params.samples;
    let abbe = if params.abbe_number.is_finite() {
        params.abbe_number.max(MIN_ABBE)
    } else {
        MIN_ABBE
    };
    let spread = (ABBE_NEUTRAL - abbe) / ABBE_NEUTRAL * params.dispersion_strength;

    (0..s)
        .map(|i| {
            let t = if s > 1 { i as f64 / (s - 1) as f64 } else { 0.0 };
            let wavelength_nm = WAVELENGTH_RED - t * (WAVELENGTH_RED - WAVELENGTH_VIOLET);
            let (color, display_weight) = wavelength_to_rgb(wavelength_nm);
            SpectralBand {
                wavelength_nm,
                refractive_index: params.ior_base + t * spread,
                color,
                display_weight,
            }
        })
        .collect()
}

/// Approximate sRGB colour of a visible wavelength.
///
/// Returns the colour and the edge-of-vision intensity factor applied to it.
/// Wavelengths outside 380-780 nm are black with zero weight.
pub fn wavelength_to_rgb(wavelength_nm: f64) -> (Rgb, f64) {
    let w = wavelength_nm;
    let (r, g, b) = match w {
        w if (380.0..440.0).contains(&w) => (-(w - 440.0) / (440.0 - 380.0), 0.0, 1.0),
        w if (440.0..490.0).contains(&w) => (0.0, (w - 440.0) / (490.0 - 440.0), 1.0),
        w if (490.0..510.0).contains(&w) => (0.0, 1.0, -(w - 510.0) / (510.0 - 490.0)),
        w if (510.0..580.0).contains(&w) => ((w - 510.0) / (580.0 - 510.0), 1.0, 0.0),
        w if (580.0..645.0).contains(&w) => (1.0, -(w - 645.0) / (645.0 - 580.0), 0.0),
        w if (645.0..=780.0).contains(&w) => (1.0, 0.0, 0.0),
        _ => return (Rgb::default(), 0.0),
    };

    let factor = if w < 420.0 {
        0.3 + 0.7 * (w - 380.0) / (420.0 - 380.0)
    } else if w > 645.0 {
        0.3 + 0.7 * (780.0 - w) / (780.0 - 645.0)
    } else {
        1.0
    };

    let channel = |c: f64| -> u8 {
        if c <= 0.0 {
            0
        } else {
            (255.0 * (c * factor).powf(GAMMA)).round().clamp(0.0, 255.0) as u8
        }
    };

    (Rgb::new(channel(r), channel(g), channel(b)), factor)
}

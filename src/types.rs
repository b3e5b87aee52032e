use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// One spectrum, dimensioned over instrument bands or source wavelengths
pub type Spectrum = Array1<f64>;

/// Scene plane of spectra (pixel x band)
pub type SpectrumPlane = Array2<f64>;

/// Pixel validity flags supplied by the tiled-image collaborator
pub mod pixel_flags {
    /// Detector saturation
    pub const SATURATED: u8 = 0x01;
    /// Transmission dropout
    pub const DROPOUT: u8 = 0x02;
    /// Cloud (from the external screening step)
    pub const CLOUD: u8 = 0x04;

    /// Any flag that excludes a pixel from retrieval
    pub const INVALID: u8 = SATURATED | DROPOUT | CLOUD;
}

/// Spectral band of the target instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralBand {
    /// Band center wavelength in nm
    pub wavelength: f64,
    /// Band width (FWHM) in nm
    pub bandwidth: f64,
}

impl SpectralBand {
    pub fn new(wavelength: f64, bandwidth: f64) -> Self {
        Self {
            wavelength,
            bandwidth,
        }
    }
}

/// Per-scene acquisition and illumination geometry
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewGeometry {
    /// View zenith angle in degrees
    pub vza: f64,
    /// Solar zenith angle in degrees
    pub sza: f64,
    /// View azimuth angle in degrees
    pub vaa: f64,
    /// Solar azimuth angle in degrees
    pub saa: f64,
    /// Target elevation in km above sea level
    pub elevation: f64,
    /// Acquisition day of year (1-366), for the Sun-Earth distance correction
    pub day_of_year: u32,
}

impl ViewGeometry {
    /// Relative azimuth between view and sun directions, folded into [0, 180] degrees
    pub fn relative_azimuth(&self) -> f64 {
        let mut raa = (self.vaa - self.saa).abs() % 360.0;
        if raa > 180.0 {
            raa = 360.0 - raa;
        }
        raa
    }
}

/// Error types for atmospheric correction
#[derive(Debug, thiserror::Error)]
pub enum AcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed resource: {0}")]
    Resource(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for atmospheric-correction operations
pub type AcResult<T> = Result<T, AcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_azimuth_folding() {
        let mut geom = ViewGeometry {
            vza: 20.0,
            sza: 35.0,
            vaa: 100.0,
            saa: 150.0,
            elevation: 0.5,
            day_of_year: 120,
        };
        assert_eq!(geom.relative_azimuth(), 50.0);

        geom.vaa = 350.0;
        geom.saa = 10.0;
        assert_eq!(geom.relative_azimuth(), 20.0);
    }
}

use crate::core::resample::Resampler;
use crate::types::{AcError, AcResult};

/// Extraterrestrial solar irradiance tabulated on its own wavelength grid.
///
/// Loaded once per processing run and passed by reference wherever the
/// TOA scaling factor is needed; never a process-wide global, so unit tests
/// can substitute synthetic tables.
#[derive(Debug, Clone)]
pub struct SolarFlux {
    wavelengths: Vec<f64>,
    irradiance: Vec<f64>,
}

impl SolarFlux {
    pub fn new(wavelengths: Vec<f64>, irradiance: Vec<f64>) -> AcResult<Self> {
        if wavelengths.len() != irradiance.len() || wavelengths.is_empty() {
            return Err(AcError::InvalidInput(format!(
                "Solar flux table needs matching non-empty vectors, got {} wavelengths and {} values",
                wavelengths.len(),
                irradiance.len()
            )));
        }
        Ok(Self {
            wavelengths,
            irradiance,
        })
    }

    /// Tabulation wavelength grid in nm
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Irradiance values, W/(m^2 um)
    pub fn irradiance(&self) -> &[f64] {
        &self.irradiance
    }

    /// Resample the irradiance onto the target instrument bands.
    pub fn resample(&self, resampler: &Resampler) -> AcResult<Vec<f64>> {
        resampler.resample(&self.irradiance)
    }
}

/// Squared inverse of the Sun-Earth distance correction for the given day
/// of year: `1 / (1 - 0.01673 * cos(0.9856 * (day - 4) deg))^2`.
///
/// Multiplies the solar irradiance to account for orbital eccentricity.
pub fn eccentricity_correction(day_of_year: u32) -> f64 {
    let angle = (0.9856 * (f64::from(day_of_year) - 4.0)).to_radians();
    1.0 / (1.0 - 0.01673 * angle.cos()).powi(2)
}

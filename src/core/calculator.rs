use crate::core::lut::RtcTable;
use crate::core::resample::Resampler;
use crate::types::{AcError, AcResult};
use std::f64::consts::PI;

/// Per-band radiative-transfer coefficients resampled onto the target
/// instrument bands.
#[derive(Debug, Clone)]
pub struct BandCoefficients {
    pub lpw: Vec<f64>,
    pub egl: Vec<f64>,
    pub sab: Vec<f64>,
    pub rat: Vec<f64>,
}

impl BandCoefficients {
    /// Resample all four parameter vectors of an RTC table onto the target
    /// bands of `resampler`.
    pub fn resample_from(resampler: &Resampler, table: &RtcTable) -> AcResult<Self> {
        Ok(Self {
            lpw: resampler.resample(&table.lpw)?,
            egl: resampler.resample(&table.egl)?,
            sab: resampler.resample(&table.sab)?,
            rat: resampler.resample(&table.rat)?,
        })
    }

    pub fn band_count(&self) -> usize {
        self.lpw.len()
    }
}

/// Converts TOA radiance to BOA reflectance and back for one fixed set of
/// per-band coefficients and one TOA scaling factor.
///
/// Immutable after construction. Instances are cheap and short-lived: the
/// water-vapour retrieval builds one per trial cwv value.
#[derive(Debug, Clone)]
pub struct Calculator {
    coefficients: BandCoefficients,
    toa_scaling: f64,
}

impl Calculator {
    pub fn new(coefficients: BandCoefficients, toa_scaling: f64) -> Self {
        Self {
            coefficients,
            toa_scaling,
        }
    }

    pub fn band_count(&self) -> usize {
        self.coefficients.band_count()
    }

    /// BOA reflectance from TOA radiance for band `band`.
    pub fn boa_from_toa_band(&self, band: usize, toa: f64) -> f64 {
        let c = &self.coefficients;
        let a = PI * (toa * self.toa_scaling - c.lpw[band]) / c.egl[band];
        a / (1.0 + a * c.sab[band])
    }

    /// TOA radiance from BOA reflectance for band `band`. Exact algebraic
    /// inverse of [`Self::boa_from_toa_band`].
    pub fn toa_from_boa_band(&self, band: usize, boa: f64) -> f64 {
        let c = &self.coefficients;
        (c.lpw[band] + boa * c.egl[band] / (PI * (1.0 - c.sab[band] * boa))) / self.toa_scaling
    }

    /// BOA reflectance spectrum from a TOA radiance spectrum.
    pub fn boa_from_toa(&self, toa: &[f64]) -> AcResult<Vec<f64>> {
        self.check_len(toa.len())?;
        Ok(toa
            .iter()
            .enumerate()
            .map(|(band, &radiance)| self.boa_from_toa_band(band, radiance))
            .collect())
    }

    /// TOA radiance spectrum from a BOA reflectance spectrum.
    pub fn toa_from_boa(&self, boa: &[f64]) -> AcResult<Vec<f64>> {
        self.check_len(boa.len())?;
        Ok(boa
            .iter()
            .enumerate()
            .map(|(band, &reflectance)| self.toa_from_boa_band(band, reflectance))
            .collect())
    }

    /// Adjacency-correction delta per band: `(rho - rho_mean) * rat`, where
    /// `rho_mean` is the locally averaged reflectance supplied by the
    /// spatial-smoothing collaborator.
    pub fn adjacency_delta(&self, boa: &[f64], boa_mean: &[f64]) -> AcResult<Vec<f64>> {
        self.check_len(boa.len())?;
        self.check_len(boa_mean.len())?;
        Ok(boa
            .iter()
            .zip(boa_mean)
            .zip(&self.coefficients.rat)
            .map(|((&rho, &rho_mean), &rat)| (rho - rho_mean) * rat)
            .collect())
    }

    fn check_len(&self, len: usize) -> AcResult<()> {
        if len != self.band_count() {
            return Err(AcError::InvalidInput(format!(
                "Calculator holds {} bands, got a spectrum of length {}",
                self.band_count(),
                len
            )));
        }
        Ok(())
    }
}

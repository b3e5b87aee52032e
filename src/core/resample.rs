use crate::types::{AcError, AcResult, SpectralBand};
use ndarray::Array2;

/// Widest-band kernel shape exponent (near-boxcar)
const EXPONENT_MAX: f64 = 6.0;
/// Narrowest-band kernel shape exponent (Gaussian)
const EXPONENT_MIN: f64 = 2.0;
/// Kernel support cutoff in units of the band width
const SUPPORT_FACTOR: f64 = 2.0;

/// Spectral resampler mapping values tabulated on a source wavelength grid
/// onto the target instrument bands.
///
/// Each target band gets a generalized-Gaussian kernel centred on its
/// wavelength whose half-width matches the band width. The kernel shape
/// exponent varies linearly from 6 for the widest band down to 2 for the
/// narrowest, so wide bands integrate nearly boxcar-like while narrow bands
/// stay Gaussian. Weights are precomputed once per (source grid, band set,
/// shift) combination; resampling is then a matrix-vector product.
#[derive(Debug, Clone)]
pub struct Resampler {
    weights: Array2<f64>,
    source_len: usize,
    target_len: usize,
}

impl Resampler {
    /// Build the weight matrix for the given source wavelengths and target
    /// bands, with an optional wavelength shift (nm) applied to the source
    /// grid (used for smile-corrected columns).
    pub fn new(
        source_wavelengths: &[f64],
        bands: &[SpectralBand],
        shift: f64,
    ) -> AcResult<Self> {
        if source_wavelengths.is_empty() || bands.is_empty() {
            return Err(AcError::InvalidInput(
                "Resampler needs non-empty source and target grids".to_string(),
            ));
        }

        let mut min_width = f64::INFINITY;
        let mut max_width = f64::NEG_INFINITY;
        for band in bands {
            if band.bandwidth <= 0.0 {
                return Err(AcError::InvalidInput(format!(
                    "Band at {} nm has non-positive bandwidth {}",
                    band.wavelength, band.bandwidth
                )));
            }
            min_width = min_width.min(band.bandwidth);
            max_width = max_width.max(band.bandwidth);
        }

        let mut weights = Array2::zeros((bands.len(), source_wavelengths.len()));

        for (i, band) in bands.iter().enumerate() {
            // Shape exponent interpolated by band width within this band set
            let exponent = if max_width > min_width {
                EXPONENT_MIN
                    + (EXPONENT_MAX - EXPONENT_MIN) * (band.bandwidth - min_width)
                        / (max_width - min_width)
            } else {
                EXPONENT_MIN
            };
            // Scale constant making the kernel half-width equal the band width
            let scale = (1.0 / (2.0_f64.powf(exponent) * 2.0_f64.ln())).powf(1.0 / exponent);

            let mut row_sum = 0.0;
            for (k, &wavelength) in source_wavelengths.iter().enumerate() {
                let distance = (band.wavelength - (wavelength + shift)).abs();
                if distance <= SUPPORT_FACTOR * band.bandwidth {
                    let w = (-(distance / (band.bandwidth * scale)).powf(exponent)).exp();
                    weights[[i, k]] = w;
                    row_sum += w;
                }
            }

            // Rows with no source support are left all-zero rather than
            // rejected: the resampled output for that band is simply 0.
            if row_sum > 0.0 {
                for k in 0..source_wavelengths.len() {
                    weights[[i, k]] /= row_sum;
                }
            } else {
                log::debug!(
                    "No source wavelength within {} nm of band at {} nm",
                    SUPPORT_FACTOR * band.bandwidth,
                    band.wavelength
                );
            }
        }

        Ok(Self {
            weights,
            source_len: source_wavelengths.len(),
            target_len: bands.len(),
        })
    }

    /// Number of source wavelengths the weight matrix was built for
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Number of target bands
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Weight applied to source sample `k` for target band `i`
    pub fn weight(&self, i: usize, k: usize) -> f64 {
        self.weights[[i, k]]
    }

    /// Resample one spectrum from the source grid onto the target bands.
    pub fn resample(&self, values: &[f64]) -> AcResult<Vec<f64>> {
        if values.len() != self.source_len {
            return Err(AcError::InvalidInput(format!(
                "Resampler built for {} source samples, got {}",
                self.source_len,
                values.len()
            )));
        }
        let mut resampled = vec![0.0; self.target_len];
        for (i, out) in resampled.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, &v) in values.iter().enumerate() {
                acc += self.weights[[i, k]] * v;
            }
            *out = acc;
        }
        Ok(resampled)
    }
}

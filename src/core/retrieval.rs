use crate::core::calculator::{BandCoefficients, Calculator};
use crate::core::lut::ModtranLut;
use crate::core::resample::Resampler;
use crate::core::roots::{solve_brent, Bracket};
use crate::types::{pixel_flags, AcError, AcResult, SpectralBand, ViewGeometry};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Water-vapour retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Absorption-shoulder wavelength window in nm, used to fit the
    /// reflectance regression (bands outside the water feature)
    pub shoulder_window: (f64, f64),
    /// Absorption-trough wavelength window in nm, where the regression line
    /// predicts the unabsorbed reflectance
    pub absorption_window: (f64, f64),
    /// Initial water-vapour column guess in g/cm^2
    pub initial_cwv: f64,
    /// Root-finder iteration budget
    pub max_iterations: usize,
    /// Absolute tolerance on the water-vapour root in g/cm^2
    pub tolerance: f64,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            // Shoulder and trough of the 940 nm water-vapour feature
            shoulder_window: (855.0, 890.0),
            absorption_window: (895.0, 985.0),
            initial_cwv: 2.0,
            max_iterations: 10_000,
            tolerance: 1e-4,
        }
    }
}

/// Result of one pixel's retrieval
#[derive(Debug, Clone)]
pub struct PixelRetrieval {
    /// Converged water-vapour column in g/cm^2
    pub cwv: f64,
    /// BOA reflectance per instrument band
    pub reflectance: Vec<f64>,
    /// `false` when the root search spent its budget; the estimate stands
    pub converged: bool,
    /// Root-finder iterations spent
    pub iterations: usize,
}

/// Result of a scene-level retrieval. Masked pixels carry NaN.
#[derive(Debug)]
pub struct SceneRetrieval {
    /// BOA reflectance (pixel x band)
    pub reflectance: Array2<f64>,
    /// Water-vapour column per pixel in g/cm^2
    pub cwv: Array1<f64>,
    /// Per-pixel convergence flags (masked pixels are `false`)
    pub converged: Vec<bool>,
}

/// Per-pixel water-vapour and reflectance retrieval driver.
///
/// Holds everything that is constant across a scene: the lookup table, the
/// resampler for the instrument bands, the acquisition geometry, the
/// aerosol optical thickness and the TOA scaling factor. Instances are
/// immutable and safe to share across worker threads.
pub struct WaterVapourRetrieval<'a> {
    lut: &'a ModtranLut,
    resampler: Resampler,
    geometry: ViewGeometry,
    aot: f64,
    toa_scaling: f64,
    params: RetrievalParams,
    band_count: usize,
    band_wavelengths: Vec<f64>,
    shoulder_bands: Vec<usize>,
    absorption_bands: Vec<usize>,
}

impl<'a> WaterVapourRetrieval<'a> {
    /// Set up a retrieval for one scene.
    ///
    /// Fails with `InvalidInput` when the configured shoulder or absorption
    /// window selects no instrument band, which would otherwise surface as
    /// an empty regression deep inside the per-pixel loop.
    pub fn new(
        lut: &'a ModtranLut,
        bands: &[SpectralBand],
        geometry: ViewGeometry,
        aot: f64,
        toa_scaling: f64,
        params: RetrievalParams,
    ) -> AcResult<Self> {
        let resampler = Resampler::new(lut.wavelengths(), bands, 0.0)?;

        let bands_in = |window: (f64, f64)| -> Vec<usize> {
            bands
                .iter()
                .enumerate()
                .filter(|(_, band)| band.wavelength >= window.0 && band.wavelength <= window.1)
                .map(|(i, _)| i)
                .collect()
        };
        let shoulder_bands = bands_in(params.shoulder_window);
        let absorption_bands = bands_in(params.absorption_window);

        if shoulder_bands.len() < 2 {
            return Err(AcError::InvalidInput(format!(
                "Shoulder window {:?} nm selects {} bands, need at least 2 for the regression",
                params.shoulder_window,
                shoulder_bands.len()
            )));
        }
        if absorption_bands.is_empty() {
            return Err(AcError::InvalidInput(format!(
                "Absorption window {:?} nm selects no instrument band",
                params.absorption_window
            )));
        }

        log::info!(
            "Water-vapour retrieval over {} bands ({} shoulder, {} absorption), cwv axis {:?} g/cm^2",
            bands.len(),
            shoulder_bands.len(),
            absorption_bands.len(),
            lut.cwv_range()
        );

        Ok(Self {
            lut,
            resampler,
            geometry,
            aot,
            toa_scaling,
            params,
            band_count: bands.len(),
            band_wavelengths: bands.iter().map(|b| b.wavelength).collect(),
            shoulder_bands,
            absorption_bands,
        })
    }

    /// BOA reflectance at a fixed water-vapour column (non-iterative mode).
    pub fn reflectance_at(&self, toa: &[f64], cwv: f64) -> AcResult<Vec<f64>> {
        self.check_len(toa.len())?;
        let table = self.lut.get_rtc_table(
            self.geometry.vza,
            self.geometry.sza,
            self.geometry.relative_azimuth(),
            self.geometry.elevation,
            self.aot,
            cwv,
        );
        let coefficients = BandCoefficients::resample_from(&self.resampler, &table)?;
        Calculator::new(coefficients, self.toa_scaling).boa_from_toa(toa)
    }

    /// Run the full retrieval state machine for one pixel spectrum.
    pub fn retrieve_pixel(&self, toa: &[f64]) -> AcResult<PixelRetrieval> {
        self.check_len(toa.len())?;

        // The five non-cwv lookup coordinates are pixel-invariant, so the
        // N-linear interpolation and the band resampling are paid once per
        // pixel; each root-finder trial only blends two coefficient sets.
        let cache = self.lut.prepare_cwv_cache(
            self.geometry.vza,
            self.geometry.sza,
            self.geometry.relative_azimuth(),
            self.geometry.elevation,
            self.aot,
        );
        let node_coefficients: Vec<BandCoefficients> = cache
            .node_tables()
            .iter()
            .map(|table| BandCoefficients::resample_from(&self.resampler, table))
            .collect::<AcResult<_>>()?;

        let calculator_at = |cwv: f64| -> Calculator {
            let position = cache.position(cwv);
            let blended = blend_coefficients(
                &node_coefficients[position.index],
                &node_coefficients[position.index + 1],
                position.fraction,
            );
            Calculator::new(blended, self.toa_scaling)
        };

        // Seed: reflectance at the initial guess, regression over the
        // absorption shoulder, extrapolation across the trough
        let seed = calculator_at(self.params.initial_cwv);
        let boa = seed.boa_from_toa(toa)?;
        let (slope, intercept) = self.shoulder_regression(&boa);
        let extrapolated: Vec<f64> = self
            .absorption_bands
            .iter()
            .map(|&band| intercept + slope * self.band_wavelengths[band])
            .collect();

        // Radiance-closure functional: measured minus simulated TOA summed
        // over the absorption feature
        let closure = |cwv: f64| -> f64 {
            let calculator = calculator_at(cwv);
            self.absorption_bands
                .iter()
                .zip(&extrapolated)
                .map(|(&band, &rho)| toa[band] - calculator.toa_from_boa_band(band, rho))
                .sum()
        };

        let (cwv_min, cwv_max) = cache.cwv_range();
        let closure_min = closure(cwv_min);
        let closure_max = closure(cwv_max);
        let (cwv, converged, iterations) = if closure_min == 0.0 {
            (cwv_min, true, 0)
        } else if closure_max == 0.0 {
            (cwv_max, true, 0)
        } else if closure_min.signum() == closure_max.signum() {
            // No sign change over the tabulated range: the pixel is drier
            // or wetter than the table covers. Degrade to the closer edge,
            // matching the edge-clamp policy elsewhere.
            let edge = if closure_min.abs() <= closure_max.abs() {
                cwv_min
            } else {
                cwv_max
            };
            log::debug!("Closure functional does not change sign, clamping cwv to {edge}");
            (edge, false, 0)
        } else {
            let mut bracket = Bracket::new(cwv_min, cwv_max);
            let status = solve_brent(
                &closure,
                &mut bracket,
                self.params.tolerance,
                0.0,
                self.params.max_iterations,
            )?;
            (status.root, status.converged, status.iterations)
        };

        // Finalize: full-spectrum reflectance at the converged column
        let reflectance = calculator_at(cwv).boa_from_toa(toa)?;

        Ok(PixelRetrieval {
            cwv,
            reflectance,
            converged,
            iterations,
        })
    }

    /// Retrieve every valid pixel of a scene in parallel.
    ///
    /// `toa` is (pixel x band); `mask` carries the per-pixel validity flags.
    /// Pixels with any [`pixel_flags::INVALID`] bit are skipped and output
    /// NaN reflectance and NaN cwv.
    pub fn process_scene(
        &self,
        toa: ArrayView2<'_, f64>,
        mask: ArrayView1<'_, u8>,
    ) -> AcResult<SceneRetrieval> {
        if toa.ncols() != self.band_count {
            return Err(AcError::InvalidInput(format!(
                "Scene has {} bands, retrieval was set up for {}",
                toa.ncols(),
                self.band_count
            )));
        }
        if toa.nrows() != mask.len() {
            return Err(AcError::InvalidInput(format!(
                "Scene has {} pixels but the mask covers {}",
                toa.nrows(),
                mask.len()
            )));
        }

        let num_pixels = toa.nrows();
        log::info!("Retrieving water vapour for {num_pixels} pixels");
        let completed = AtomicUsize::new(0);

        let results: Vec<Option<PixelRetrieval>> = toa
            .axis_iter(Axis(0))
            .into_par_iter()
            .zip(mask.axis_iter(Axis(0)).into_par_iter())
            .map(|(spectrum, flags)| -> AcResult<Option<PixelRetrieval>> {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 100_000 == 0 {
                    log::debug!("Retrieved {done}/{num_pixels} pixels");
                }
                if flags[()] & pixel_flags::INVALID != 0 {
                    return Ok(None);
                }
                let spectrum = spectrum.to_vec();
                Ok(Some(self.retrieve_pixel(&spectrum)?))
            })
            .collect::<AcResult<_>>()?;

        let mut reflectance = Array2::from_elem((num_pixels, self.band_count), f64::NAN);
        let mut cwv = Array1::from_elem(num_pixels, f64::NAN);
        let mut converged = vec![false; num_pixels];
        for (pixel, result) in results.into_iter().enumerate() {
            if let Some(retrieval) = result {
                reflectance
                    .row_mut(pixel)
                    .assign(&Array1::from_vec(retrieval.reflectance));
                cwv[pixel] = retrieval.cwv;
                converged[pixel] = retrieval.converged;
            }
        }

        let converged_count = converged.iter().filter(|&&c| c).count();
        log::info!("Scene retrieval finished, {converged_count}/{num_pixels} pixels converged");

        Ok(SceneRetrieval {
            reflectance,
            cwv,
            converged,
        })
    }

    /// Least-squares line of reflectance against wavelength over the
    /// shoulder bands.
    fn shoulder_regression(&self, boa: &[f64]) -> (f64, f64) {
        let n = self.shoulder_bands.len() as f64;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_xx = 0.0;
        let mut sum_xy = 0.0;
        for &band in &self.shoulder_bands {
            let x = self.band_wavelengths[band];
            let y = boa[band];
            sum_x += x;
            sum_y += y;
            sum_xx += x * x;
            sum_xy += x * y;
        }
        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
        let intercept = (sum_y - slope * sum_x) / n;
        (slope, intercept)
    }

    fn check_len(&self, len: usize) -> AcResult<()> {
        if len != self.band_count {
            return Err(AcError::InvalidInput(format!(
                "Retrieval set up for {} bands, got a spectrum of length {}",
                self.band_count, len
            )));
        }
        Ok(())
    }
}

/// Linear blend of two coefficient sets: `(1 - t) * a + t * b` per band.
fn blend_coefficients(a: &BandCoefficients, b: &BandCoefficients, t: f64) -> BandCoefficients {
    let mix = |x: &[f64], y: &[f64]| -> Vec<f64> {
        x.iter()
            .zip(y)
            .map(|(&xv, &yv)| xv * (1.0 - t) + yv * t)
            .collect()
    };
    BandCoefficients {
        lpw: mix(&a.lpw, &b.lpw),
        egl: mix(&a.egl, &b.egl),
        sab: mix(&a.sab, &b.sab),
        rat: mix(&a.rat, &b.rat),
    }
}

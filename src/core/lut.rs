use crate::core::interval::{GridPosition, IntervalPartition};
use crate::types::{AcError, AcResult};
use std::sync::Arc;

/// Number of tabulated radiative-transfer parameters per wavelength
pub const RTC_PARAM_COUNT: usize = 4;

/// Radiative-transfer parameters at one point of the atmosphere/geometry
/// space, per source wavelength: path radiance, total downward irradiance,
/// spherical albedo and diffuse-to-direct transmittance ratio.
///
/// Produced fresh by each interpolation query and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RtcTable {
    /// Source wavelength grid in nm, shared with the lookup table
    pub wavelengths: Arc<[f64]>,
    /// Atmospheric path radiance per wavelength
    pub lpw: Vec<f64>,
    /// Direct plus diffuse downward irradiance per wavelength
    pub egl: Vec<f64>,
    /// Atmospheric spherical albedo per wavelength
    pub sab: Vec<f64>,
    /// Diffuse-to-direct transmittance ratio per wavelength
    pub rat: Vec<f64>,
}

impl RtcTable {
    /// Linear blend of two tables: `(1 - t) * a + t * b`, per wavelength.
    fn blend(a: &RtcTable, b: &RtcTable, t: f64) -> RtcTable {
        let mix = |x: &[f64], y: &[f64]| -> Vec<f64> {
            x.iter()
                .zip(y)
                .map(|(&xv, &yv)| xv * (1.0 - t) + yv * t)
                .collect()
        };
        RtcTable {
            wavelengths: Arc::clone(&a.wavelengths),
            lpw: mix(&a.lpw, &b.lpw),
            egl: mix(&a.egl, &b.egl),
            sab: mix(&a.sab, &b.sab),
            rat: mix(&a.rat, &b.rat),
        }
    }
}

/// Tabulated MODTRAN radiative-transfer dataset.
///
/// Two physically distinct parameter blocks are tabulated on their own axis
/// sets: block 1 (azimuth-dependent path-radiance geometry) over
/// {vza, sza, elevation, aot, relative azimuth}, block 2 (water-vapour
/// dependent absorption) over {vza, sza, elevation, aot, cwv}. Interpolated
/// parameters are concatenated per wavelength into an [`RtcTable`].
///
/// Built once at load time, immutable afterwards, safe for concurrent
/// read-only use across worker threads. Queries outside any axis extent are
/// silently clamped to the nearest edge; callers must treat out-of-range
/// geometry as degrading to edge values rather than failing.
#[derive(Debug)]
pub struct ModtranLut {
    wavelengths: Arc<[f64]>,
    vza: IntervalPartition,
    sza: IntervalPartition,
    elevation: IntervalPartition,
    aot: IntervalPartition,
    azimuth: IntervalPartition,
    cwv: IntervalPartition,
    /// Azimuth-block parameter count (leading RTC parameters)
    param_count1: usize,
    /// Water-vapour-block parameter count (trailing RTC parameters)
    param_count2: usize,
    /// Flat values, shape [vza][sza][elevation][aot][azimuth][wavelength][param]
    block1: Vec<f64>,
    /// Flat values, shape [vza][sza][elevation][aot][cwv][wavelength][param]
    block2: Vec<f64>,
}

/// Raw inputs for building a [`ModtranLut`], typically decoded from the
/// binary resource stream by [`crate::io::read_modtran_lut`].
#[derive(Debug)]
pub struct ModtranLutData {
    pub wavelengths: Vec<f64>,
    pub vza: Vec<f64>,
    pub sza: Vec<f64>,
    pub elevation: Vec<f64>,
    pub aot: Vec<f64>,
    pub azimuth: Vec<f64>,
    pub cwv: Vec<f64>,
    pub param_count1: usize,
    pub param_count2: usize,
    pub block1: Vec<f64>,
    pub block2: Vec<f64>,
}

impl ModtranLut {
    /// Validate and assemble a lookup table from raw decoded data.
    pub fn new(data: ModtranLutData) -> AcResult<Self> {
        if data.param_count1 + data.param_count2 != RTC_PARAM_COUNT {
            return Err(AcError::Resource(format!(
                "Lookup table parameter counts {} + {} do not total {}",
                data.param_count1, data.param_count2, RTC_PARAM_COUNT
            )));
        }

        let vza = IntervalPartition::new(data.vza)?;
        let sza = IntervalPartition::new(data.sza)?;
        let elevation = IntervalPartition::new(data.elevation)?;
        let aot = IntervalPartition::new(data.aot)?;
        let azimuth = IntervalPartition::new(data.azimuth)?;
        let cwv = IntervalPartition::new(data.cwv)?;

        let geometry_len = vza.len() * sza.len() * elevation.len() * aot.len();
        let expected1 = geometry_len * azimuth.len() * data.wavelengths.len() * data.param_count1;
        let expected2 = geometry_len * cwv.len() * data.wavelengths.len() * data.param_count2;
        if data.block1.len() != expected1 {
            return Err(AcError::Resource(format!(
                "Lookup table block 1 holds {} values, expected {}",
                data.block1.len(),
                expected1
            )));
        }
        if data.block2.len() != expected2 {
            return Err(AcError::Resource(format!(
                "Lookup table block 2 holds {} values, expected {}",
                data.block2.len(),
                expected2
            )));
        }

        log::debug!(
            "Assembled MODTRAN lookup table: {} wavelengths, axes {}x{}x{}x{}, {} azimuths, {} cwv nodes",
            data.wavelengths.len(),
            vza.len(),
            sza.len(),
            elevation.len(),
            aot.len(),
            azimuth.len(),
            cwv.len()
        );

        Ok(Self {
            wavelengths: data.wavelengths.into(),
            vza,
            sza,
            elevation,
            aot,
            azimuth,
            cwv,
            param_count1: data.param_count1,
            param_count2: data.param_count2,
            block1: data.block1,
            block2: data.block2,
        })
    }

    /// Source wavelength grid in nm
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Extent of the water-vapour column axis in g/cm^2
    pub fn cwv_range(&self) -> (f64, f64) {
        (self.cwv.min(), self.cwv.max())
    }

    /// Extent of the aerosol-optical-thickness axis
    pub fn aot_range(&self) -> (f64, f64) {
        (self.aot.min(), self.aot.max())
    }

    /// Interpolate the full parameter set at an arbitrary point of the
    /// atmosphere/geometry space. Out-of-range coordinates clamp to the
    /// table edge.
    pub fn get_rtc_table(
        &self,
        vza: f64,
        sza: f64,
        relative_azimuth: f64,
        elevation: f64,
        aot: f64,
        cwv: f64,
    ) -> RtcTable {
        let geometry = [
            self.vza.locate(vza),
            self.sza.locate(sza),
            self.elevation.locate(elevation),
            self.aot.locate(aot),
        ];

        let mut positions1 = [GridPosition { index: 0, fraction: 0.0 }; 5];
        positions1[..4].copy_from_slice(&geometry);
        positions1[4] = self.azimuth.locate(relative_azimuth);

        let mut positions2 = positions1;
        positions2[4] = self.cwv.locate_log(cwv);

        let values1 = self.interpolate_block(
            &self.block1,
            &positions1,
            self.azimuth.len(),
            self.param_count1,
        );
        let values2 = self.interpolate_block(
            &self.block2,
            &positions2,
            self.cwv.len(),
            self.param_count2,
        );

        self.assemble_table(&values1, &values2)
    }

    /// Precompute one table per water-vapour node at fixed geometry.
    ///
    /// Within one pixel's retrieval the five non-cwv coordinates never
    /// change, so the expensive N-linear step is paid once here instead of
    /// once per root-finder iteration; [`CwvTableCache::table_for`] then
    /// only blends two precomputed tables.
    pub fn prepare_cwv_cache(
        &self,
        vza: f64,
        sza: f64,
        relative_azimuth: f64,
        elevation: f64,
        aot: f64,
    ) -> CwvTableCache<'_> {
        let tables = self
            .cwv
            .samples()
            .iter()
            .map(|&node| self.get_rtc_table(vza, sza, relative_azimuth, elevation, aot, node))
            .collect();
        CwvTableCache { lut: self, tables }
    }

    /// Multi-linear interpolation of one value block over its five axes:
    /// 2^5 corner lookups weighted by the product of per-axis fractions.
    /// Returns `wavelengths * params` values, parameter-major per wavelength.
    fn interpolate_block(
        &self,
        block: &[f64],
        positions: &[GridPosition; 5],
        last_axis_len: usize,
        param_count: usize,
    ) -> Vec<f64> {
        let slice_len = self.wavelengths.len() * param_count;
        let axis_lens = [
            self.vza.len(),
            self.sza.len(),
            self.elevation.len(),
            self.aot.len(),
            last_axis_len,
        ];

        // Strides in units of one [wavelength][param] slice
        let mut strides = [0usize; 5];
        let mut stride = 1;
        for axis in (0..5).rev() {
            strides[axis] = stride;
            stride *= axis_lens[axis];
        }

        let mut values = vec![0.0; slice_len];
        for corner in 0..(1usize << 5) {
            let mut weight = 1.0;
            let mut offset = 0;
            for axis in 0..5 {
                let upper = corner & (1 << axis) != 0;
                let position = &positions[axis];
                weight *= if upper {
                    position.fraction
                } else {
                    1.0 - position.fraction
                };
                offset += (position.index + usize::from(upper)) * strides[axis];
            }
            if weight == 0.0 {
                continue;
            }
            let slice = &block[offset * slice_len..(offset + 1) * slice_len];
            for (value, &corner_value) in values.iter_mut().zip(slice) {
                *value += weight * corner_value;
            }
        }
        values
    }

    /// Concatenate the two interpolated parameter blocks into Lpw, Egl, Sab
    /// and Rat vectors. Block 1 supplies the leading parameters, block 2
    /// the trailing ones.
    fn assemble_table(&self, values1: &[f64], values2: &[f64]) -> RtcTable {
        let n = self.wavelengths.len();
        let mut params = [
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        ];
        for w in 0..n {
            for p in 0..self.param_count1 {
                params[p].push(values1[w * self.param_count1 + p]);
            }
            for p in 0..self.param_count2 {
                params[self.param_count1 + p].push(values2[w * self.param_count2 + p]);
            }
        }
        let [lpw, egl, sab, rat] = params;
        RtcTable {
            wavelengths: Arc::clone(&self.wavelengths),
            lpw,
            egl,
            sab,
            rat,
        }
    }
}

/// Per-pixel cache of RTC tables precomputed at every water-vapour node of
/// the lookup table, at fixed viewing geometry. Thread-confined.
#[derive(Debug)]
pub struct CwvTableCache<'a> {
    lut: &'a ModtranLut,
    tables: Vec<RtcTable>,
}

impl CwvTableCache<'_> {
    /// Blend the two precomputed tables bracketing `cwv`, using the
    /// logarithmic fractional index along the water-vapour axis.
    pub fn table_for(&self, cwv: f64) -> RtcTable {
        let position = self.lut.cwv.locate_log(cwv);
        RtcTable::blend(
            &self.tables[position.index],
            &self.tables[position.index + 1],
            position.fraction,
        )
    }

    /// Extent of the water-vapour axis covered by the cache
    pub fn cwv_range(&self) -> (f64, f64) {
        self.lut.cwv_range()
    }

    /// Precomputed tables, one per water-vapour node
    pub fn node_tables(&self) -> &[RtcTable] {
        &self.tables
    }

    /// Log-fractional position of `cwv` along the water-vapour axis
    pub fn position(&self, cwv: f64) -> GridPosition {
        self.lut.cwv.locate_log(cwv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Minimal synthetic table: 2 nodes per axis, 2 wavelengths, block 1
    /// carrying Lpw and block 2 carrying Egl/Sab/Rat.
    pub(crate) fn synthetic_lut() -> ModtranLut {
        let wavelengths = vec![800.0, 900.0];
        let vza = vec![0.0, 40.0];
        let sza = vec![10.0, 50.0];
        let elevation = vec![0.0, 2.0];
        let aot = vec![0.1, 0.4];
        let azimuth = vec![0.0, 180.0];
        let cwv = vec![0.5, 4.0];

        // Lpw varies linearly with every block-1 coordinate and wavelength
        let mut block1 = Vec::new();
        for &v in &vza {
            for &s in &sza {
                for &e in &elevation {
                    for &a in &aot {
                        for &az in &azimuth {
                            for w in 0..wavelengths.len() {
                                block1.push(
                                    0.05 + 1e-4 * (v + s) + 0.01 * e + 0.1 * a
                                        + 1e-5 * az
                                        + 0.01 * w as f64,
                                );
                            }
                        }
                    }
                }
            }
        }

        // Egl/Sab/Rat: Egl decreasing in cwv, Sab and Rat held simple
        let mut block2 = Vec::new();
        for &v in &vza {
            for &s in &sza {
                for &e in &elevation {
                    for &a in &aot {
                        for &c in &cwv {
                            for w in 0..wavelengths.len() {
                                block2.push(
                                    1.2 - 0.05 * c + 1e-4 * (v + s + e + a) + 0.1 * w as f64,
                                );
                                block2.push(0.1 + 0.01 * c);
                                block2.push(0.2);
                            }
                        }
                    }
                }
            }
        }

        ModtranLut::new(ModtranLutData {
            wavelengths,
            vza,
            sza,
            elevation,
            aot,
            azimuth,
            cwv,
            param_count1: 1,
            param_count2: 3,
            block1,
            block2,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_parameter_total() {
        let data = ModtranLutData {
            wavelengths: vec![800.0],
            vza: vec![0.0, 40.0],
            sza: vec![10.0, 50.0],
            elevation: vec![0.0, 2.0],
            aot: vec![0.1, 0.4],
            azimuth: vec![0.0, 180.0],
            cwv: vec![0.5, 4.0],
            param_count1: 2,
            param_count2: 3,
            block1: vec![],
            block2: vec![],
        };
        assert!(matches!(ModtranLut::new(data), Err(AcError::Resource(_))));
    }

    #[test]
    fn test_interpolation_exact_at_nodes() {
        let lut = synthetic_lut();
        let table = lut.get_rtc_table(40.0, 10.0, 180.0, 2.0, 0.1, 0.5);
        // Node values reproduced exactly (no interpolation error at nodes)
        assert_relative_eq!(
            table.lpw[0],
            0.05 + 1e-4 * 50.0 + 0.01 * 2.0 + 0.1 * 0.1 + 1e-5 * 180.0,
            max_relative = 1e-12
        );
        assert_relative_eq!(table.egl[0], 1.2 - 0.05 * 0.5 + 1e-4 * 52.1, max_relative = 1e-12);
        assert_relative_eq!(table.sab[0], 0.1 + 0.01 * 0.5, max_relative = 1e-12);
        assert_relative_eq!(table.rat[0], 0.2, max_relative = 1e-12);
    }

    #[test]
    fn test_out_of_range_aot_clamps_to_edge() {
        let lut = synthetic_lut();
        let below = lut.get_rtc_table(20.0, 30.0, 90.0, 1.0, 0.0, 2.0);
        let at_min = lut.get_rtc_table(20.0, 30.0, 90.0, 1.0, 0.1, 2.0);
        for w in 0..lut.wavelengths().len() {
            assert_eq!(below.lpw[w], at_min.lpw[w]);
            assert_eq!(below.egl[w], at_min.egl[w]);
            assert_eq!(below.sab[w], at_min.sab[w]);
            assert_eq!(below.rat[w], at_min.rat[w]);
        }
    }

    #[test]
    fn test_cwv_cache_matches_direct_interpolation() {
        let lut = synthetic_lut();
        let cache = lut.prepare_cwv_cache(20.0, 30.0, 90.0, 1.0, 0.2);
        for &cwv in &[0.5, 1.0, 2.5, 4.0] {
            let cached = cache.table_for(cwv);
            let direct = lut.get_rtc_table(20.0, 30.0, 90.0, 1.0, 0.2, cwv);
            for w in 0..lut.wavelengths().len() {
                assert_relative_eq!(cached.lpw[w], direct.lpw[w], max_relative = 1e-12);
                assert_relative_eq!(cached.egl[w], direct.egl[w], max_relative = 1e-12);
                assert_relative_eq!(cached.sab[w], direct.sab[w], max_relative = 1e-12);
                assert_relative_eq!(cached.rat[w], direct.rat[w], max_relative = 1e-12);
            }
        }
    }
}

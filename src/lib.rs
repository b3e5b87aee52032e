//! vaporetto: A Fast, Modular Hyperspectral Atmospheric Correction Engine
//!
//! This library derives bottom-of-atmosphere (surface) reflectance from
//! top-of-atmosphere radiance measured by hyperspectral imaging
//! spectrometers, using a precomputed MODTRAN radiative-transfer lookup
//! table. Its centerpiece is the per-pixel iterative water-vapour column
//! retrieval: multi-axis lookup-table interpolation, spectral resampling of
//! the tabulated atmospheric parameters onto the instrument bands, the
//! Lambertian forward/inverse radiative-transfer relation, and a bracketed
//! root search closing measured against simulated radiance in the 940 nm
//! water absorption feature.
//!
//! The lookup table is loaded once and shared read-only across worker
//! threads; everything per-pixel is thread-confined, so scenes parallelize
//! over pixels with no locking.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{AcError, AcResult, SpectralBand, Spectrum, SpectrumPlane, ViewGeometry};

pub use crate::core::{
    eccentricity_correction, BandCoefficients, Calculator, IntervalPartition, ModtranLut,
    ModtranLutData, Resampler, RetrievalParams, RtcTable, SceneRetrieval, SolarFlux,
    WaterVapourRetrieval,
};

pub use io::{read_modtran_lut, read_solar_flux};

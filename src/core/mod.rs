//! Core atmospheric-correction modules

pub mod calculator;
pub mod interval;
pub mod lut;
pub mod minimize;
pub mod resample;
pub mod retrieval;
pub mod roots;
pub mod solar;

// Re-export main types
pub use calculator::{BandCoefficients, Calculator};
pub use interval::{GridPosition, IntervalPartition};
pub use lut::{CwvTableCache, ModtranLut, ModtranLutData, RtcTable};
pub use minimize::{bracket_minimum, minimize_brent, minimize_powell, MinBracket, MinStatus, PowellStatus};
pub use resample::Resampler;
pub use retrieval::{PixelRetrieval, RetrievalParams, SceneRetrieval, WaterVapourRetrieval};
pub use roots::{solve_brent, Bracket, RootStatus};
pub use solar::{eccentricity_correction, SolarFlux};

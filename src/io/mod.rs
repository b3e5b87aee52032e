//! Binary resource loading

pub mod lut_reader;

pub use lut_reader::{read_modtran_lut, read_solar_flux};

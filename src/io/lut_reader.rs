use crate::core::lut::{ModtranLut, ModtranLutData};
use crate::core::solar::SolarFlux;
use crate::types::{AcError, AcResult};
use std::io::Read;

/// Decode a MODTRAN lookup table from its little-endian binary resource
/// stream.
///
/// Layout: for each axis (wavelength, vza, sza, elevation, aot, azimuth,
/// water vapour) an `int16` length followed by that many `float32` values;
/// then two `int16` parameter counts; then the two flat `float32` value
/// blocks sized `paramCount * wavelengthCount * product(axis lengths)`.
///
/// A malformed or truncated stream is fatal: the engine cannot run without
/// a valid table and does not degrade.
pub fn read_modtran_lut<R: Read>(mut reader: R) -> AcResult<ModtranLut> {
    let wavelengths = read_axis(&mut reader, "wavelength")?;
    let vza = read_axis(&mut reader, "view zenith")?;
    let sza = read_axis(&mut reader, "solar zenith")?;
    let elevation = read_axis(&mut reader, "elevation")?;
    let aot = read_axis(&mut reader, "aerosol optical thickness")?;
    let azimuth = read_axis(&mut reader, "relative azimuth")?;
    let cwv = read_axis(&mut reader, "water vapour")?;

    let param_count1 = read_count(&mut reader, "block 1 parameter count")?;
    let param_count2 = read_count(&mut reader, "block 2 parameter count")?;

    let geometry = [vza.len(), sza.len(), elevation.len(), aot.len()];
    let block1_len = checked_len(
        &[param_count1, wavelengths.len(), azimuth.len()],
        &geometry,
        "block 1",
    )?;
    let block2_len = checked_len(
        &[param_count2, wavelengths.len(), cwv.len()],
        &geometry,
        "block 2",
    )?;

    let block1 = read_f64_values(&mut reader, block1_len, "block 1 values")?;
    let block2 = read_f64_values(&mut reader, block2_len, "block 2 values")?;

    log::info!(
        "Read MODTRAN lookup table resource: {} wavelengths, {} + {} parameters, {} + {} values",
        wavelengths.len(),
        param_count1,
        param_count2,
        block1.len(),
        block2.len()
    );

    ModtranLut::new(ModtranLutData {
        wavelengths,
        vza,
        sza,
        elevation,
        aot,
        azimuth,
        cwv,
        param_count1,
        param_count2,
        block1,
        block2,
    })
}

/// Decode a solar-irradiance table: an `int16` length followed by the
/// `float32` wavelength vector and the `float32` irradiance vector.
pub fn read_solar_flux<R: Read>(mut reader: R) -> AcResult<SolarFlux> {
    let len = read_count(&mut reader, "solar flux length")?;
    let wavelengths = read_f64_values(&mut reader, len, "solar flux wavelengths")?;
    let irradiance = read_f64_values(&mut reader, len, "solar flux irradiance")?;
    SolarFlux::new(wavelengths, irradiance)
}

/// Read an axis: `int16` length then `float32` samples, widened to f64.
fn read_axis<R: Read>(reader: &mut R, name: &str) -> AcResult<Vec<f64>> {
    let len = read_count(reader, name)?;
    read_f64_values(reader, len, name)
}

/// Multiply header fields into a block size, rejecting headers whose
/// product does not fit in memory arithmetic.
fn checked_len(factors: &[usize], geometry: &[usize], name: &str) -> AcResult<usize> {
    factors
        .iter()
        .chain(geometry)
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .ok_or_else(|| {
            AcError::Resource(format!(
                "Lookup table resource header overflows the size of {name}"
            ))
        })
}

fn read_count<R: Read>(reader: &mut R, name: &str) -> AcResult<usize> {
    let mut buf = [0u8; 2];
    read_field(reader, &mut buf, name)?;
    let count = i16::from_le_bytes(buf);
    usize::try_from(count).map_err(|_| {
        AcError::Resource(format!("Negative length {count} for {name} in lookup table resource"))
    })
}

fn read_f64_values<R: Read>(reader: &mut R, len: usize, name: &str) -> AcResult<Vec<f64>> {
    let byte_len = len.checked_mul(4).ok_or_else(|| {
        AcError::Resource(format!(
            "Lookup table resource header overflows the size of {name}"
        ))
    })?;
    let mut bytes = vec![0u8; byte_len];
    read_field(reader, &mut bytes, name)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f64::from(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])))
        .collect())
}

fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], name: &str) -> AcResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            AcError::Resource(format!("Lookup table resource truncated while reading {name}"))
        } else {
            AcError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_axis(stream: &mut Vec<u8>, values: &[f32]) {
        stream.extend_from_slice(&(values.len() as i16).to_le_bytes());
        for v in values {
            stream.extend_from_slice(&v.to_le_bytes());
        }
    }

    #[test]
    fn test_truncated_stream_is_resource_error() {
        let mut stream = Vec::new();
        push_axis(&mut stream, &[800.0, 900.0]);
        // Announce a 4-sample axis but supply only one value
        stream.extend_from_slice(&4i16.to_le_bytes());
        stream.extend_from_slice(&0.0f32.to_le_bytes());

        let result = read_modtran_lut(stream.as_slice());
        match result {
            Err(AcError::Resource(message)) => assert!(message.contains("view zenith")),
            other => panic!("Expected a resource error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_length_is_resource_error() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&(-3i16).to_le_bytes());
        let result = read_modtran_lut(stream.as_slice());
        assert!(matches!(result, Err(AcError::Resource(_))));
    }

    #[test]
    fn test_oversized_header_is_resource_error() {
        // Seven axes announcing the maximum length overflow the block-size
        // product long before any value could be read
        let mut stream = Vec::new();
        for _ in 0..7 {
            stream.extend_from_slice(&i16::MAX.to_le_bytes());
            stream.extend(std::iter::repeat(0u8).take(i16::MAX as usize * 4));
        }
        stream.extend_from_slice(&1i16.to_le_bytes());
        stream.extend_from_slice(&3i16.to_le_bytes());

        let result = read_modtran_lut(stream.as_slice());
        match result {
            Err(AcError::Resource(message)) => assert!(message.contains("block 1")),
            other => panic!("Expected a resource error, got {other:?}"),
        }
    }

    #[test]
    fn test_solar_flux_round_trip() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&3i16.to_le_bytes());
        for v in [400.0f32, 500.0, 600.0, 1.9, 1.8, 1.7] {
            stream.extend_from_slice(&v.to_le_bytes());
        }
        let flux = read_solar_flux(stream.as_slice()).unwrap();
        assert_eq!(flux.wavelengths(), &[400.0, 500.0, 600.0]);
        assert_eq!(flux.irradiance().len(), 3);
        assert!((flux.irradiance()[0] - 1.9).abs() < 1e-6);
    }
}

use vaporetto::{read_modtran_lut, AcError};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Encode one axis as the resource stream lays it out: int16 length, then
/// float32 samples.
fn push_axis(stream: &mut Vec<u8>, values: &[f32]) {
    stream.extend_from_slice(&(values.len() as i16).to_le_bytes());
    for v in values {
        stream.extend_from_slice(&v.to_le_bytes());
    }
}

fn push_values(stream: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        stream.extend_from_slice(&v.to_le_bytes());
    }
}

/// Full synthetic resource stream: 2 wavelengths, 2 nodes per axis,
/// 1 azimuth-block parameter and 3 water-vapour-block parameters.
fn synthetic_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    push_axis(&mut stream, &[800.0, 900.0]); // wavelength
    push_axis(&mut stream, &[0.0, 40.0]); // vza
    push_axis(&mut stream, &[10.0, 50.0]); // sza
    push_axis(&mut stream, &[0.0, 2.0]); // elevation
    push_axis(&mut stream, &[0.1, 0.4]); // aot
    push_axis(&mut stream, &[0.0, 180.0]); // azimuth
    push_axis(&mut stream, &[0.5, 4.0]); // cwv

    stream.extend_from_slice(&1i16.to_le_bytes());
    stream.extend_from_slice(&3i16.to_le_bytes());

    // Block 1: Lpw = 0.05 everywhere, over 2^5 axis combinations and
    // 2 wavelengths
    push_values(&mut stream, &[0.05; 32 * 2]);

    // Block 2: (Egl, Sab, Rat) = (1.25, 0.08, 0.2) per wavelength
    let mut block2 = Vec::new();
    for _ in 0..32 {
        for _ in 0..2 {
            block2.extend_from_slice(&[1.25, 0.08, 0.2]);
        }
    }
    push_values(&mut stream, &block2);

    stream
}

#[test]
fn test_stream_decodes_into_working_lut() {
    init_logging();
    let lut = read_modtran_lut(synthetic_stream().as_slice()).unwrap();

    assert_eq!(lut.wavelengths(), &[800.0, 900.0]);
    assert_eq!(lut.cwv_range(), (0.5, 4.0));

    // Constant tables interpolate to the constants at any interior point
    let table = lut.get_rtc_table(17.0, 33.0, 45.0, 1.2, 0.3, 1.7);
    for w in 0..2 {
        assert!((table.lpw[w] - 0.05).abs() < 1e-7);
        assert!((table.egl[w] - 1.25).abs() < 1e-7);
        assert!((table.sab[w] - 0.08).abs() < 1e-7);
        assert!((table.rat[w] - 0.2).abs() < 1e-7);
    }
}

#[test]
fn test_out_of_range_query_clamps_to_edge() {
    let lut = read_modtran_lut(synthetic_stream().as_slice()).unwrap();

    // AOT below the table minimum behaves exactly like the minimum
    let below = lut.get_rtc_table(20.0, 30.0, 90.0, 1.0, 0.0, 2.0);
    let at_min = lut.get_rtc_table(20.0, 30.0, 90.0, 1.0, 0.1, 2.0);
    for w in 0..2 {
        assert_eq!(below.lpw[w], at_min.lpw[w]);
        assert_eq!(below.egl[w], at_min.egl[w]);
    }
}

#[test]
fn test_truncated_stream_fails_with_descriptive_error() {
    let mut stream = synthetic_stream();
    stream.truncate(stream.len() - 10);

    match read_modtran_lut(stream.as_slice()) {
        Err(AcError::Resource(message)) => {
            println!("Resource error: {message}");
            assert!(message.contains("block 2"));
        }
        other => panic!("Expected a resource error, got {other:?}"),
    }
}

#[test]
fn test_inconsistent_parameter_counts_rejected() {
    // Rebuild the header with parameter counts totalling 5 instead of 4
    let mut stream = Vec::new();
    push_axis(&mut stream, &[800.0, 900.0]);
    push_axis(&mut stream, &[0.0, 40.0]);
    push_axis(&mut stream, &[10.0, 50.0]);
    push_axis(&mut stream, &[0.0, 2.0]);
    push_axis(&mut stream, &[0.1, 0.4]);
    push_axis(&mut stream, &[0.0, 180.0]);
    push_axis(&mut stream, &[0.5, 4.0]);
    stream.extend_from_slice(&2i16.to_le_bytes());
    stream.extend_from_slice(&3i16.to_le_bytes());
    push_values(&mut stream, &vec![0.0; 32 * 2 * 2]);
    push_values(&mut stream, &vec![0.0; 32 * 2 * 3]);

    assert!(matches!(
        read_modtran_lut(stream.as_slice()),
        Err(AcError::Resource(_))
    ));
}

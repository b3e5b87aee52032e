use vaporetto::core::{bracket_minimum, minimize_brent, minimize_powell, solve_brent, Bracket};
use vaporetto::{Resampler, SpectralBand};

fn source_grid() -> Vec<f64> {
    (0..101).map(|k| 760.0 + k as f64).collect()
}

/// Spectrum with one absorption line, evaluated on the source grid
fn line_spectrum(grid: &[f64]) -> Vec<f64> {
    grid.iter()
        .map(|&w| 1.0 - 0.6 * (-((w - 812.0) / 4.0).powi(2)).exp())
        .collect()
}

fn bands() -> Vec<SpectralBand> {
    (0..20)
        .map(|i| SpectralBand::new(780.0 + 3.0 * i as f64, 3.0))
        .collect()
}

/// Sum of squared differences between the spectrum resampled at `shift`
/// and a reference band spectrum
fn mismatch(shift: f64, reference: &[f64]) -> f64 {
    let resampler = Resampler::new(&source_grid(), &bands(), shift).unwrap();
    let resampled = resampler.resample(&line_spectrum(&source_grid())).unwrap();
    resampled
        .iter()
        .zip(reference)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

#[test]
fn test_wavelength_shift_recovered_by_brent_minimizer() {
    // Reference observed with a 1.5 nm calibration shift
    let shift_true = 1.5;
    let resampler = Resampler::new(&source_grid(), &bands(), shift_true).unwrap();
    let reference = resampler.resample(&line_spectrum(&source_grid())).unwrap();

    let f = |shift: f64| mismatch(shift, &reference);
    let bracket = bracket_minimum(f, -1.0, 0.0);
    let status = minimize_brent(f, &bracket, 1e-10, 1e-10, 200).unwrap();

    println!(
        "Estimated shift {} nm after {} iterations",
        status.x, status.iterations
    );
    assert!(status.converged);
    assert!((status.x - shift_true).abs() < 1e-3);
}

#[test]
fn test_shift_and_gain_recovered_by_powell() {
    let shift_true = -0.8;
    let gain_true = 1.12;
    let resampler = Resampler::new(&source_grid(), &bands(), shift_true).unwrap();
    let reference: Vec<f64> = resampler
        .resample(&line_spectrum(&source_grid()))
        .unwrap()
        .into_iter()
        .map(|v| v * gain_true)
        .collect();

    let f = |p: &[f64]| -> f64 {
        let resampler = Resampler::new(&source_grid(), &bands(), p[0]).unwrap();
        let resampled = resampler.resample(&line_spectrum(&source_grid())).unwrap();
        resampled
            .iter()
            .zip(&reference)
            .map(|(a, b)| (p[1] * a - b) * (p[1] * a - b))
            .sum()
    };

    let status = minimize_powell(f, &[0.0, 1.0], 1e-12, 200).unwrap();
    println!(
        "Powell estimated shift {} nm, gain {} (f = {})",
        status.point[0], status.point[1], status.f
    );
    assert!(status.converged);
    assert!((status.point[0] - shift_true).abs() < 1e-3);
    assert!((status.point[1] - gain_true).abs() < 1e-3);
}

#[test]
fn test_root_finder_on_radiance_closure_shape() {
    // Monotone closure-like functional with a known root
    let f = |x: f64| 0.4 * (x - 2.3) + 0.05 * (x - 2.3).powi(3);
    let mut bracket = Bracket::new(0.5, 5.0);
    let status = solve_brent(f, &mut bracket, 1e-10, 0.0, 100).unwrap();
    assert!(status.converged);
    assert!((status.root - 2.3).abs() < 1e-8);
    assert!(bracket.lower_x <= status.root && status.root <= bracket.upper_x);
}

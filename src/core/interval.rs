use crate::types::{AcError, AcResult};

/// Position of a query value within a grid: the lower bounding sample index
/// and the fractional distance towards the next sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPosition {
    /// Index of the lower bounding grid sample
    pub index: usize,
    /// Fractional position in [0, 1] between `index` and `index + 1`
    pub fraction: f64,
}

/// Immutable, strictly increasing 1-D sample grid with binary-search lookup.
///
/// Queries outside the grid extent are clamped to the nearest edge: the
/// returned fraction saturates at 0 or 1 and never leaves [0, 1]. Callers
/// relying on extrapolation must expect edge-value degradation.
#[derive(Debug, Clone)]
pub struct IntervalPartition {
    samples: Vec<f64>,
}

impl IntervalPartition {
    /// Build a partition from a strictly increasing sequence of at least
    /// two samples.
    pub fn new(samples: Vec<f64>) -> AcResult<Self> {
        if samples.len() < 2 {
            return Err(AcError::InvalidInput(format!(
                "Interval partition needs at least 2 samples, got {}",
                samples.len()
            )));
        }
        for window in samples.windows(2) {
            if window[1] <= window[0] {
                return Err(AcError::InvalidInput(format!(
                    "Interval partition samples must be strictly increasing: {} !< {}",
                    window[0], window[1]
                )));
            }
        }
        Ok(Self { samples })
    }

    /// Number of grid samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: construction requires at least two samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Grid sample at `index`
    pub fn get(&self, index: usize) -> f64 {
        self.samples[index]
    }

    /// Smallest grid sample
    pub fn min(&self) -> f64 {
        self.samples[0]
    }

    /// Largest grid sample
    pub fn max(&self) -> f64 {
        self.samples[self.samples.len() - 1]
    }

    /// All grid samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Locate `x` with a linear fractional index.
    pub fn locate(&self, x: f64) -> GridPosition {
        let (lo, hi) = self.bracket_of(x);
        let fraction = (x - self.samples[lo]) / (self.samples[hi] - self.samples[lo]);
        GridPosition {
            index: lo,
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Locate `x` with a logarithmic fractional index, used for axes whose
    /// samples span decades (the water-vapour column axis).
    ///
    /// `x` and the grid samples must be positive; the log ratio is otherwise
    /// undefined and the clamp will saturate the fraction.
    pub fn locate_log(&self, x: f64) -> GridPosition {
        let (lo, hi) = self.bracket_of(x);
        let fraction =
            (x / self.samples[lo]).ln() / (self.samples[hi] / self.samples[lo]).ln();
        GridPosition {
            index: lo,
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Binary search for the pair of adjacent samples bracketing `x`.
    /// Terminates with `hi == lo + 1`.
    fn bracket_of(&self, x: f64) -> (usize, usize) {
        let mut lo = 0;
        let mut hi = self.samples.len() - 1;
        while hi > lo + 1 {
            let mid = (lo + hi) / 2;
            if x < self.samples[mid] {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn partition() -> IntervalPartition {
        IntervalPartition::new(vec![1.0, 2.0, 4.0, 8.0]).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_grids() {
        assert!(IntervalPartition::new(vec![1.0]).is_err());
        assert!(IntervalPartition::new(vec![1.0, 1.0]).is_err());
        assert!(IntervalPartition::new(vec![2.0, 1.0, 3.0]).is_err());
        assert!(!partition().is_empty());
    }

    #[test]
    fn test_locate_at_nodes_is_exact() {
        let p = partition();
        for &x in p.samples() {
            let pos = p.locate(x);
            let value =
                p.get(pos.index) * (1.0 - pos.fraction) + p.get(pos.index + 1) * pos.fraction;
            assert_relative_eq!(value, x, max_relative = 1e-15);
        }
        // Top node resolves onto the last interval with fraction 1
        let top = p.locate(8.0);
        assert_eq!(top.index, 2);
        assert_eq!(top.fraction, 1.0);
    }

    #[test]
    fn test_linear_fraction() {
        let p = partition();
        let pos = p.locate(3.0);
        assert_eq!(pos.index, 1);
        assert_relative_eq!(pos.fraction, 0.5);
    }

    #[test]
    fn test_log_fraction() {
        let p = partition();
        // Geometric midpoint of [2, 4] is 2*sqrt(2)
        let pos = p.locate_log(2.0 * std::f64::consts::SQRT_2);
        assert_eq!(pos.index, 1);
        assert_relative_eq!(pos.fraction, 0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let p = partition();
        let below = p.locate(0.5);
        assert_eq!(below.index, 0);
        assert_eq!(below.fraction, 0.0);

        let above = p.locate(100.0);
        assert_eq!(above.index, p.len() - 2);
        assert_eq!(above.fraction, 1.0);

        let below_log = p.locate_log(0.5);
        assert_eq!(below_log.fraction, 0.0);
        let above_log = p.locate_log(100.0);
        assert_eq!(above_log.fraction, 1.0);
    }
}

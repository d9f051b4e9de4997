use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::SpectralError;

/// Frequency band evaluated as one output value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBin {
    /// Hz
    pub lower: f64,
    /// Hz
    pub upper: f64,
    /// Spectral points sampled inside the band.
    pub evaluations: usize,
}

impl FrequencyBin {
    pub fn new(lower: f64, upper: f64, evaluations: usize) -> Self {
        Self { lower, upper, evaluations }
    }

    pub fn validate(&self) -> Result<(), SpectralError> {
        let ordered = self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper;
        if !ordered || self.lower < 0.0 || self.evaluations == 0 {
            return Err(SpectralError::InvalidBin {
                lower: self.lower,
                upper: self.upper,
                evaluations: self.evaluations,
            });
        }
        Ok(())
    }

    /// Centres of `evaluations` equal sub-bands.
    pub fn frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        let step = (self.upper - self.lower) / self.evaluations as f64;
        (0..self.evaluations).map(move |j| self.lower + (j as f64 + 0.5) * step)
    }
}

/// Unit-circle points `e^{-iω}` with `ω = 2π·f/fs`, grouped per bin.
/// Built once per configuration.
#[derive(Debug, Clone)]
pub struct LookupTable {
    points: Vec<Vec<Complex64>>,
}

impl LookupTable {
    pub fn new(bins: &[FrequencyBin], sample_rate: f64) -> Self {
        let points = bins
            .iter()
            .map(|bin| {
                bin.frequencies()
                    .map(|f| {
                        let omega = 2.0 * PI * f / sample_rate;
                        Complex64::from_polar(1.0, -omega)
                    })
                    .collect()
            })
            .collect();
        Self { points }
    }

    pub fn bins(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self, bin: usize) -> &[Complex64] {
        &self.points[bin]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_frequencies_are_centred() {
        let bin = FrequencyBin::new(8.0, 12.0, 4);
        let f: Vec<f64> = bin.frequencies().collect();
        assert_eq!(f, vec![8.5, 9.5, 10.5, 11.5]);
    }

    #[test]
    fn test_invalid_bins_rejected() {
        assert!(FrequencyBin::new(12.0, 8.0, 4).validate().is_err());
        assert!(FrequencyBin::new(8.0, 12.0, 0).validate().is_err());
        assert!(FrequencyBin::new(-1.0, 12.0, 2).validate().is_err());
        assert!(FrequencyBin::new(8.0, 12.0, 2).validate().is_ok());
    }

    #[test]
    fn test_lookup_points_on_unit_circle() {
        let table = LookupTable::new(&[FrequencyBin::new(0.0, 64.0, 8)], 256.0);
        assert_eq!(table.bins(), 1);
        for p in table.points(0) {
            assert!((p.norm() - 1.0).abs() < 1e-12);
        }
    }
}

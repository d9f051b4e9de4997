use rustfft::num_complex::Complex64;
use std::f64::consts::SQRT_2;

use super::bins::LookupTable;
use super::burg::{ArModel, BurgWorkspace};
use super::{SpectralConfig, SpectralError};

/// Maximum Entropy Method band-power estimator for one channel.
#[derive(Debug, Clone)]
pub struct SpectralEstimator {
    order: usize,
    evaluations: Vec<usize>,
    lookup: LookupTable,
    workspace: BurgWorkspace,
    model: Option<ArModel>,
}

impl SpectralEstimator {
    pub fn new(config: &SpectralConfig, sample_rate: f64) -> Result<Self, SpectralError> {
        config.validate()?;
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SpectralError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            order: config.order,
            evaluations: config.bins.iter().map(|b| b.evaluations).collect(),
            lookup: LookupTable::new(&config.bins, sample_rate),
            workspace: BurgWorkspace::new(),
            model: None,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn bins(&self) -> usize {
        self.evaluations.len()
    }

    pub fn model(&self) -> Option<&ArModel> {
        self.model.as_ref()
    }

    /// Replace the model with one fitted to `window`. The previous model is
    /// invalidated even when fitting fails.
    pub fn fit_model(&mut self, window: &[f64]) -> Result<&ArModel, SpectralError> {
        self.model = None;
        let model = self.workspace.fit(window, self.order)?;
        Ok(&*self.model.insert(model))
    }

    /// Mean power per bin of the current model.
    pub fn estimate_power_spectrum(&self) -> Result<Vec<f64>, SpectralError> {
        let model = self.model.as_ref().ok_or(SpectralError::NoModel)?;
        // fold negative frequencies onto the positive half
        let gain = model.gain * SQRT_2;

        let powers = (0..self.lookup.bins())
            .map(|bin| {
                let total: f64 = self
                    .lookup
                    .points(bin)
                    .iter()
                    .map(|&w| {
                        let h = gain / evaluate(&model.coefficients, w);
                        h.norm_sqr()
                    })
                    .sum();
                total / self.evaluations[bin] as f64
            })
            .collect();

        Ok(powers)
    }

    /// Fit then evaluate.
    pub fn process(&mut self, window: &[f64]) -> Result<Vec<f64>, SpectralError> {
        self.fit_model(window)?;
        self.estimate_power_spectrum()
    }
}

/// `Σ c_k w^k` by Horner's rule, `w = e^{-iω}`.
fn evaluate(coefficients: &[f64], w: Complex64) -> Complex64 {
    coefficients
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * w + c)
}

//! Autoregressive (Maximum Entropy Method) band-power estimation.

pub mod bins;
pub mod burg;
pub mod estimator;

pub use bins::{FrequencyBin, LookupTable};
pub use burg::{ArModel, BurgWorkspace};
pub use estimator::SpectralEstimator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpectralError {
    #[error("model order must be at least 1, got {0}")]
    InvalidOrder(usize),

    #[error("at least one frequency bin is required")]
    NoBins,

    #[error("invalid bin {lower}..{upper} Hz with {evaluations} evaluations")]
    InvalidBin {
        lower: f64,
        upper: f64,
        evaluations: usize,
    },

    #[error("window of {len} samples does not exceed model order {order}")]
    WindowTooShort { len: usize, order: usize },

    #[error("invalid sample rate {0}")]
    InvalidSampleRate(f64),

    #[error("no model fitted for the current window")]
    NoModel,
}

/// Per-channel estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    pub order: usize,
    /// Samples handed to each fit.
    pub window: usize,
    pub bins: Vec<FrequencyBin>,
}

impl SpectralConfig {
    pub fn validate(&self) -> Result<(), SpectralError> {
        if self.order == 0 {
            return Err(SpectralError::InvalidOrder(self.order));
        }
        if self.window <= self.order {
            return Err(SpectralError::WindowTooShort {
                len: self.window,
                order: self.order,
            });
        }
        if self.bins.is_empty() {
            return Err(SpectralError::NoBins);
        }
        self.bins.iter().try_for_each(FrequencyBin::validate)
    }
}

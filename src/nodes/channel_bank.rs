use crate::buffers::SampleRing;
use crate::core::{SamplePackage, SourceConfig};
use crate::spectral::SpectralEstimator;
use anyhow::{Context, Result};

/// Per-channel history and package assembly shared by all acquisition nodes.
///
/// Frames (one value per channel) are collected until a package holds
/// `samples_per_package` of them. With spectral estimation configured the
/// package instead carries one band power per channel and bin, laid out as
/// `channels * bins` rows of a single sample.
pub struct ChannelBank {
    channels: usize,
    samples_per_package: usize,
    rate: f64,
    history: Vec<SampleRing>,
    estimators: Vec<SpectralEstimator>,
    window: usize,
    pending: Vec<f64>,
    filled: usize,
    /// Set while windows are too short; cleared on the first full window.
    short_window: bool,
}

impl ChannelBank {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let channels = config.channels;
        let (estimators, window) = match &config.spectral {
            Some(spectral) => {
                let estimators = (0..channels)
                    .map(|_| SpectralEstimator::new(spectral, config.sample_rate()))
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("Cannot build estimators for {}", config.name))?;
                (estimators, spectral.window)
            }
            None => (Vec::new(), 0),
        };

        Ok(Self {
            channels,
            samples_per_package: config.samples_per_package,
            rate: config.package_rate,
            history: (0..channels).map(|_| SampleRing::new(config.history)).collect(),
            estimators,
            window,
            pending: Vec::with_capacity(channels * config.samples_per_package),
            filled: 0,
            short_window: false,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn history(&self, channel: usize) -> Option<&SampleRing> {
        self.history.get(channel)
    }

    pub fn is_spectral(&self) -> bool {
        !self.estimators.is_empty()
    }

    /// A full package is waiting in `take_package`.
    pub fn is_ready(&self) -> bool {
        self.filled >= self.samples_per_package
    }

    /// Append one frame. Missing channels count as zero, extra values are
    /// ignored.
    pub fn push_frame(&mut self, values: &[f64]) {
        for ch in 0..self.channels {
            let value = values.get(ch).copied().unwrap_or(0.0);
            self.history[ch].put(value);
            self.pending.push(value);
        }
        self.filled += 1;
    }

    /// Assemble the package from the collected frames and start a new one.
    pub fn take_package(&mut self) -> SamplePackage {
        let samples = self.filled;
        let values = std::mem::take(&mut self.pending);
        self.filled = 0;

        if self.is_spectral() {
            if let Some(package) = self.spectral_package() {
                return package;
            }
        }

        // push_frame appends exactly `channels` values per frame
        SamplePackage::sample_major_unchecked(self.channels, samples, self.rate, values)
    }

    fn spectral_package(&mut self) -> Option<SamplePackage> {
        let fill = self.history.first().map(|ring| ring.fill()).unwrap_or(0);
        if fill < self.window {
            if !self.short_window {
                log::warn!(
                    "Only {} of {} samples buffered, emitting raw values until the window fills",
                    fill,
                    self.window
                );
                self.short_window = true;
            }
            return None;
        }
        if self.short_window {
            log::info!("Spectral window filled, emitting band powers");
            self.short_window = false;
        }

        let bins = self.estimators.first().map(|e| e.bins()).unwrap_or(0);
        let mut powers = Vec::with_capacity(self.channels * bins);
        for (ring, estimator) in self.history.iter().zip(self.estimators.iter_mut()) {
            match estimator.process(&ring.latest(self.window)) {
                Ok(band) => powers.extend(band),
                Err(e) => {
                    log::warn!("Skipping spectral estimate: {}", e);
                    return None;
                }
            }
        }

        let package = SamplePackage::band_powers(self.channels, bins, self.rate, powers);
        if package.is_none() {
            log::error!("Band powers do not match {} channels x {} bins, skipping estimate", self.channels, bins);
        }
        package
    }

    pub fn reset(&mut self) {
        for ring in &mut self.history {
            ring.clear();
        }
        self.pending.clear();
        self.filled = 0;
        self.short_window = false;
    }
}

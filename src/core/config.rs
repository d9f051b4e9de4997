use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::engine::TimingMode;
use crate::protocol::{DecoderConfig, ProtocolVariant};
use crate::spectral::SpectralConfig;

fn default_samples_per_package() -> usize {
    1
}

fn default_history() -> usize {
    512
}

fn default_receive_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

/// Per-source parameters, passed explicitly to each source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub channels: usize,
    /// Packages per second
    pub package_rate: f64,
    #[serde(default = "default_samples_per_package")]
    pub samples_per_package: usize,
    pub protocol: ProtocolVariant,
    /// Busy-wait timing even below the automatic threshold.
    #[serde(default)]
    pub high_precision: bool,
    /// Samples of history kept per channel.
    #[serde(default = "default_history")]
    pub history: usize,
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    /// Drop packets that were buffered before the link went live.
    #[serde(default = "default_true")]
    pub discard_cached: bool,
    #[serde(default)]
    pub spectral: Option<SpectralConfig>,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, protocol: ProtocolVariant, package_rate: f64) -> Self {
        Self {
            name: name.into(),
            channels: protocol.channels(),
            package_rate,
            samples_per_package: default_samples_per_package(),
            protocol,
            high_precision: false,
            history: default_history(),
            receive_timeout_ms: default_receive_timeout_ms(),
            discard_cached: true,
            spectral: None,
        }
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value).context("Invalid source configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Self::from_json(value)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            bail!("Source {} needs at least one channel", self.name);
        }
        if !(self.package_rate.is_finite() && self.package_rate > 0.0) {
            bail!("Package rate must be positive, got {}", self.package_rate);
        }
        if Duration::try_from_secs_f64(1.0 / self.package_rate).is_err() {
            bail!("Package rate {} gives an unrepresentable interval", self.package_rate);
        }
        if self.samples_per_package == 0 {
            bail!("Samples per package must be at least 1");
        }
        if self.history == 0 {
            bail!("History must hold at least one sample");
        }
        if self.receive_timeout_ms == 0 {
            bail!("Receive timeout must be non-zero");
        }
        if let Some(spectral) = &self.spectral {
            spectral
                .validate()
                .with_context(|| format!("Invalid spectral settings for {}", self.name))?;
            if self.history < spectral.window {
                bail!(
                    "History of {} samples cannot hold a {} sample window",
                    self.history,
                    spectral.window
                );
            }
        }
        Ok(())
    }

    /// Time between packages. Saturates for rates `validate` rejects.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.package_rate).unwrap_or(Duration::MAX)
    }

    /// Samples per second per channel.
    pub fn sample_rate(&self) -> f64 {
        self.package_rate * self.samples_per_package as f64
    }

    pub fn timing_mode(&self) -> TimingMode {
        TimingMode::for_rate(self.package_rate, self.high_precision)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            variant: self.protocol,
            receive_timeout: self.receive_timeout(),
            discard_cached: self.discard_cached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_json() {
        let config = SourceConfig::from_json(json!({
            "name": "eeg",
            "channels": 5,
            "package_rate": 5.0,
            "protocol": "power"
        }))
        .unwrap();
        assert_eq!(config.samples_per_package, 1);
        assert_eq!(config.history, 512);
        assert_eq!(config.receive_timeout(), Duration::from_millis(3000));
        assert!(config.discard_cached);
        assert!(config.spectral.is_none());
    }

    #[test]
    fn test_timing_mode_follows_rate() {
        let slow = SourceConfig::new("a", ProtocolVariant::Raw, 256.0);
        assert_eq!(slow.timing_mode(), TimingMode::LowPrecision);
        let fast = SourceConfig::new("b", ProtocolVariant::Raw, 2048.0);
        assert_eq!(fast.timing_mode(), TimingMode::HighPrecision);
    }

    #[test]
    fn test_window_larger_than_history_rejected() {
        let mut config = SourceConfig::new("a", ProtocolVariant::Raw, 256.0);
        config.history = 32;
        config.spectral = Some(SpectralConfig {
            order: 8,
            window: 64,
            bins: vec![crate::spectral::FrequencyBin::new(8.0, 12.0, 4)],
        });
        assert!(config.validate().is_err());
    }
}

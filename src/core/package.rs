use serde::{Deserialize, Serialize};

/// Ordering of the flat value array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// All channels of sample 0, then all channels of sample 1, ...
    SampleMajor,
    /// All samples of channel 0, then all samples of channel 1, ...
    ChannelMajor,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::SampleMajor
    }
}

/// What a package's values are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PackageKind {
    /// Raw samples, one row per channel.
    #[default]
    Samples,
    /// One band power per channel and bin, rows ordered channel by channel,
    /// each row holding a single value.
    BandPowers { bins: usize },
}

/// One acquisition cycle's output: `channels × samples` values.
///
/// Built by the acquisition step and handed to the sink by value; nothing
/// mutates it after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePackage {
    /// Sequential package number for ordering
    sequence: u64,

    /// Microseconds since the source was started
    timestamp_us: u64,

    /// Nominal packages per second
    rate: f64,

    channels: usize,
    samples: usize,
    layout: Layout,
    #[serde(default)]
    kind: PackageKind,
    values: Vec<f64>,
}

impl SamplePackage {
    /// Zero-filled, sample-major package.
    pub fn new(channels: usize, samples: usize, rate: f64) -> Self {
        Self {
            sequence: 0,
            timestamp_us: 0,
            rate,
            channels,
            samples,
            layout: Layout::SampleMajor,
            kind: PackageKind::Samples,
            values: vec![0.0; channels * samples],
        }
    }

    /// Wrap sample-major values; `values.len()` must be `channels * samples`.
    pub fn from_sample_major(channels: usize, samples: usize, rate: f64, values: Vec<f64>) -> Option<Self> {
        if values.len() != channels * samples {
            return None;
        }
        Some(Self::sample_major_unchecked(channels, samples, rate, values))
    }

    /// Band powers for `channels` channels with `bins` bins each.
    pub fn band_powers(channels: usize, bins: usize, rate: f64, powers: Vec<f64>) -> Option<Self> {
        let mut package = Self::from_sample_major(channels * bins, 1, rate, powers)?;
        package.kind = PackageKind::BandPowers { bins };
        Some(package)
    }

    /// Caller guarantees `values.len() == channels * samples`.
    pub(crate) fn sample_major_unchecked(channels: usize, samples: usize, rate: f64, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), channels * samples);
        Self {
            sequence: 0,
            timestamp_us: 0,
            rate,
            channels,
            samples,
            layout: Layout::SampleMajor,
            kind: PackageKind::Samples,
            values,
        }
    }

    pub fn with_sequence(mut self, sequence: u64, timestamp_us: u64) -> Self {
        self.sequence = sequence;
        self.timestamp_us = timestamp_us;
        self
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn index(&self, channel: usize, sample: usize) -> usize {
        match self.layout {
            Layout::SampleMajor => sample * self.channels + channel,
            Layout::ChannelMajor => channel * self.samples + sample,
        }
    }

    pub fn get(&self, channel: usize, sample: usize) -> Option<f64> {
        if channel >= self.channels || sample >= self.samples {
            return None;
        }
        Some(self.values[self.index(channel, sample)])
    }

    /// Write one value; out-of-range coordinates are ignored.
    pub fn set(&mut self, channel: usize, sample: usize, value: f64) {
        if channel < self.channels && sample < self.samples {
            let idx = self.index(channel, sample);
            self.values[idx] = value;
        }
    }

    /// Copy of one channel's samples in time order.
    pub fn channel(&self, channel: usize) -> Vec<f64> {
        (0..self.samples)
            .filter_map(|s| self.get(channel, s))
            .collect()
    }

    /// Same data rearranged into `layout`.
    pub fn to_layout(&self, layout: Layout) -> Self {
        if layout == self.layout {
            return self.clone();
        }
        let mut out = Self {
            layout,
            values: vec![0.0; self.values.len()],
            ..self.clone()
        };
        for ch in 0..self.channels {
            for s in 0..self.samples {
                let idx = out.index(ch, s);
                out.values[idx] = self.values[self.index(ch, s)];
            }
        }
        out
    }
}

use crate::hal::SampleProvider;
use anyhow::{bail, Result};
use std::f64::consts::PI;

/// Block-delivering device producing one sine per channel.
///
/// Channel `c` runs at `frequency * (c + 1)` so channels can be told apart.
pub struct SineProvider {
    open: bool,
    channels: usize,
    block_size: usize,
    sample_rate: f64,
    frequency: f64,
    amplitude: f64,
    phase: f64,
    blocks: u64,
}

impl SineProvider {
    pub fn new(channels: usize, block_size: usize, sample_rate: f64) -> Self {
        Self {
            open: false,
            channels,
            block_size,
            sample_rate,
            frequency: 10.0,
            amplitude: 1.0,
            phase: 0.0,
            blocks: 0,
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Blocks delivered since the last `open`.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    fn generate_block(&mut self) -> Vec<Vec<f64>> {
        let mut block = vec![Vec::with_capacity(self.block_size); self.channels];
        let delta_phase = 2.0 * PI * self.frequency / self.sample_rate;

        for _ in 0..self.block_size {
            for (ch, samples) in block.iter_mut().enumerate() {
                let harmonic = (ch + 1) as f64;
                samples.push(self.amplitude * (self.phase * harmonic).sin());
            }
            self.phase += delta_phase;
            if self.phase > 2.0 * PI {
                self.phase -= 2.0 * PI;
            }
        }

        block
    }
}

impl SampleProvider for SineProvider {
    fn describe(&self) -> String {
        format!("sine {} Hz x{}", self.frequency, self.channels)
    }

    fn open(&mut self) -> Result<()> {
        if self.sample_rate <= 0.0 {
            bail!("Sample rate must be positive, got {}", self.sample_rate);
        }
        self.open = true;
        self.phase = 0.0; // Reset phase on open
        self.blocks = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn fetch_block(&mut self) -> Result<Option<Vec<Vec<f64>>>> {
        if !self.open {
            bail!("Device not open");
        }
        self.blocks += 1;
        Ok(Some(self.generate_block()))
    }
}

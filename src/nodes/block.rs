use crate::core::{AcquisitionNode, CycleContext, SamplePackage, SourceConfig};
use crate::hal::SampleProvider;
use anyhow::{bail, Result};
use std::collections::VecDeque;

use super::ChannelBank;

/// Acquisition from a device that delivers ready-made per-channel blocks.
///
/// Block sizes need not match `samples_per_package`; surplus frames are kept
/// for the next cycle.
pub struct BlockNode {
    provider: Box<dyn SampleProvider>,
    bank: Option<ChannelBank>,
    backlog: VecDeque<Vec<f64>>,
    open: bool,
}

impl BlockNode {
    pub fn new(provider: Box<dyn SampleProvider>) -> Self {
        Self {
            provider,
            bank: None,
            backlog: VecDeque::new(),
            open: false,
        }
    }

    pub fn bank(&self) -> Option<&ChannelBank> {
        self.bank.as_ref()
    }

    /// Transpose a channel-major block into frames.
    fn queue_block(&mut self, block: Vec<Vec<f64>>, channels: usize) -> Result<()> {
        if block.len() < channels {
            bail!("Block has {} channels, expected {}", block.len(), channels);
        }
        let samples = block.iter().take(channels).map(Vec::len).min().unwrap_or(0);
        if block.iter().take(channels).any(|ch| ch.len() != samples) {
            log::warn!("Ragged block from {}, truncating to {} samples", self.provider.describe(), samples);
        }
        for s in 0..samples {
            self.backlog.push_back(block.iter().take(channels).map(|ch| ch[s]).collect());
        }
        Ok(())
    }
}

impl AcquisitionNode for BlockNode {
    fn configure(&mut self, config: &SourceConfig) -> Result<()> {
        self.bank = Some(ChannelBank::new(config)?);
        self.backlog.clear();
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.bank.is_none() {
            bail!("Block node opened before configuration");
        }
        self.provider.open()?;
        self.open = true;
        log::info!("Opened {}", self.provider.describe());
        Ok(())
    }

    fn acquire(&mut self, ctx: &CycleContext<'_>) -> Result<Option<SamplePackage>> {
        let channels = match self.bank.as_ref() {
            Some(bank) => bank.channels(),
            None => bail!("Block node is not configured"),
        };

        loop {
            if ctx.is_cancelled() {
                return Ok(None);
            }

            if let Some(bank) = self.bank.as_mut() {
                while !bank.is_ready() {
                    match self.backlog.pop_front() {
                        Some(frame) => bank.push_frame(&frame),
                        None => break,
                    }
                }
                if bank.is_ready() {
                    return Ok(Some(bank.take_package()));
                }
            }

            match self.provider.fetch_block()? {
                Some(block) => self.queue_block(block, channels)?,
                // Partial frames stay in the bank until the next cycle
                None => return Ok(None),
            }
        }
    }

    fn reset(&mut self) {
        if let Some(bank) = self.bank.as_mut() {
            bank.reset();
        }
        self.backlog.clear();
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.provider.close()?;
            self.open = false;
            log::info!("Closed {}", self.provider.describe());
        }
        Ok(())
    }
}

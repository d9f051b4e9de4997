use crate::core::{AcquisitionNode, CycleContext, SamplePackage, SourceConfig};
use crate::hal::ByteTransport;
use crate::observability::SourceEvent;
use crate::protocol::{DecodeError, Discard, PacketDecoder, PAIR_THRESHOLD};
use anyhow::{anyhow, bail, Result};
use std::time::Instant;

use super::ChannelBank;

/// Acquisition over a framed telemetry byte stream.
///
/// Each cycle decodes `samples_per_package` packets. For variants that send
/// packets in close pairs the second packet of a pair is held back until half
/// the pairing interval after the first, spreading output evenly.
pub struct TelemetryNode {
    transport: Box<dyn ByteTransport>,
    decoder: Option<PacketDecoder>,
    bank: Option<ChannelBank>,
    /// Set by a timeout, cleared by the next good packet.
    link_lost: bool,
}

impl TelemetryNode {
    pub fn new(transport: Box<dyn ByteTransport>) -> Self {
        Self {
            transport,
            decoder: None,
            bank: None,
            link_lost: false,
        }
    }

    pub fn decoder(&self) -> Option<&PacketDecoder> {
        self.decoder.as_ref()
    }

    pub fn bank(&self) -> Option<&ChannelBank> {
        self.bank.as_ref()
    }

    fn report_discards(decoder: &mut PacketDecoder, ctx: &CycleContext<'_>) {
        for discard in decoder.take_discards() {
            match discard {
                Discard::Corrupt { expected, received } => {
                    ctx.metrics().record_corrupt_packet();
                    ctx.publish(SourceEvent::CorruptPacket { expected, received });
                }
                Discard::Stale => {
                    ctx.metrics().record_stale_packet();
                    ctx.publish(SourceEvent::StalePacket);
                }
            }
        }
    }

    /// Hold a tightly paired packet back until half the pairing interval after
    /// its predecessor. Returns false if the wait was interrupted.
    fn spread_pair(decoder: &PacketDecoder, ctx: &CycleContext<'_>) -> bool {
        let Some(interval) = decoder.variant().paired_interval() else {
            return true;
        };
        let Some(gap) = decoder.arrival_gap() else {
            return true;
        };
        if gap.is_zero() || gap >= PAIR_THRESHOLD {
            return true;
        }
        let Some(previous) = decoder.packet().previous_arrival() else {
            return true;
        };

        let due = previous + interval / 2;
        let remaining = due.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        log::trace!("Paired packet {:?} after previous, holding for {:?}", gap, remaining);
        ctx.pause(remaining)
    }
}

impl AcquisitionNode for TelemetryNode {
    fn configure(&mut self, config: &SourceConfig) -> Result<()> {
        let variant = config.protocol;
        if config.channels > variant.channels() {
            bail!(
                "{} frames carry {} channels, {} requested",
                variant,
                variant.channels(),
                config.channels
            );
        }
        self.bank = Some(ChannelBank::new(config)?);
        self.decoder = Some(PacketDecoder::with_config(config.decoder_config()));
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.decoder.is_none() {
            bail!("Telemetry node opened before configuration");
        }
        self.transport.open()?;
        log::info!("Opened {}", self.transport.describe());
        Ok(())
    }

    fn acquire(&mut self, ctx: &CycleContext<'_>) -> Result<Option<SamplePackage>> {
        let (decoder, bank) = match (self.decoder.as_mut(), self.bank.as_mut()) {
            (Some(decoder), Some(bank)) => (decoder, bank),
            _ => bail!("Telemetry node is not configured"),
        };

        while !bank.is_ready() {
            let result = decoder.next_packet(self.transport.as_mut(), ctx.cancel_check());
            Self::report_discards(decoder, ctx);

            match result {
                Ok(()) => {
                    if self.link_lost {
                        log::info!("Connection to {} restored", self.transport.describe());
                        self.link_lost = false;
                        ctx.publish(SourceEvent::ConnectionRestored);
                    }
                    if !Self::spread_pair(decoder, ctx) {
                        return Ok(None);
                    }
                    bank.push_frame(&decoder.values());
                }
                Err(DecodeError::Timeout { elapsed_ms }) => {
                    ctx.metrics().record_timeout();
                    ctx.publish(SourceEvent::PacketTimeout { elapsed_ms });
                    if !self.link_lost {
                        log::warn!(
                            "No data from {} for {} ms, connection lost",
                            self.transport.describe(),
                            elapsed_ms
                        );
                        self.link_lost = true;
                        ctx.publish(SourceEvent::ConnectionLost);
                    }
                    return Ok(None);
                }
                Err(DecodeError::Cancelled) => return Ok(None),
                Err(DecodeError::Io(e)) => {
                    return Err(anyhow!("Read from {} failed: {}", self.transport.describe(), e));
                }
            }
        }

        Ok(Some(bank.take_package()))
    }

    fn reset(&mut self) {
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.restart();
        }
        if let Some(bank) = self.bank.as_mut() {
            bank.reset();
        }
        self.link_lost = false;
    }

    fn close(&mut self) -> Result<()> {
        if self.transport.is_open() {
            self.transport.close()?;
            log::info!("Closed {}", self.transport.describe());
        }
        Ok(())
    }
}

use super::crc::crc16;
use super::packet::{ReadState, TelemetryPacket};
use super::variant::{Field, ProtocolVariant};
use crate::hal::ByteTransport;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Pause between polls of an empty transport.
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no packet data for {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("packet read cancelled")]
    Cancelled,
}

/// Result of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Pending,
    Complete,
    Corrupt { expected: u16, received: u16 },
}

/// A completed packet that was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    Corrupt { expected: u16, received: u16 },
    /// Completed from bytes buffered before the link went live.
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub packets: u64,
    pub corrupt: u64,
    pub stale: u64,
    pub timeouts: u64,
}

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub variant: ProtocolVariant,
    pub receive_timeout: Duration,
    /// Drop packets completed before the transport ever reported empty.
    pub discard_cached: bool,
}

impl DecoderConfig {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self {
            variant,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            discard_cached: true,
        }
    }
}

/// Byte-at-a-time state machine for one protocol variant.
pub struct PacketDecoder {
    config: DecoderConfig,
    packet: TelemetryPacket,
    live: bool,
    seen_empty_read: bool,
    /// Last byte that advanced a packet. `None` until the first read after a
    /// restart, so idle time before acquisition does not count.
    last_progress: Option<Instant>,
    discards: Vec<Discard>,
    stats: DecoderStats,
}

impl PacketDecoder {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self::with_config(DecoderConfig::new(variant))
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            packet: TelemetryPacket::new(),
            live: false,
            seen_empty_read: false,
            last_progress: None,
            discards: Vec::new(),
            stats: DecoderStats::default(),
        }
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.config.variant
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn packet(&self) -> &TelemetryPacket {
        &self.packet
    }

    pub fn state(&self) -> ReadState {
        self.packet.state()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Decoded values of the current packet.
    pub fn values(&self) -> Vec<f64> {
        let variant = self.config.variant;
        self.packet.values(variant.channels(), variant.encoding())
    }

    /// Time between the current and the previous packet's sync byte.
    pub fn arrival_gap(&self) -> Option<Duration> {
        match (self.packet.arrival(), self.packet.previous_arrival()) {
            (Some(current), Some(previous)) => Some(current.saturating_duration_since(previous)),
            _ => None,
        }
    }

    /// Discards recorded since the last call.
    pub fn take_discards(&mut self) -> Vec<Discard> {
        std::mem::take(&mut self.discards)
    }

    /// Drop the in-flight packet and resume at `Start`.
    pub fn reset(&mut self) {
        self.packet.reset();
    }

    /// Forget everything tied to the previous connection.
    pub fn restart(&mut self) {
        self.packet.reset();
        self.packet.reset_timing();
        self.live = false;
        self.seen_empty_read = false;
        self.last_progress = None;
        self.discards.clear();
    }

    pub fn push_byte(&mut self, byte: u8, now: Instant) -> Feed {
        let variant = self.config.variant;

        if matches!(self.packet.state, ReadState::Start | ReadState::Finished) {
            self.packet.reset();
            self.packet.state = ReadState::Syncing;
        }

        let pos = match self.packet.state {
            ReadState::Syncing => {
                if variant.is_sync(byte) {
                    self.packet.sync = byte;
                    self.packet.mark_arrival(now);
                    self.packet.state = ReadState::Extracting { pos: 0 };
                }
                return Feed::Pending;
            }
            ReadState::Extracting { pos } => pos,
            ReadState::Start | ReadState::Finished => return Feed::Pending,
        };

        match variant.field_at(pos) {
            Some(Field::High(ch)) => {
                self.packet.raw[ch] = ((byte as u16) << 8) | (self.packet.raw[ch] & 0x00FF);
                self.packet.payload.push(byte);
            }
            Some(Field::Low(ch)) => {
                self.packet.raw[ch] = (self.packet.raw[ch] & 0xFF00) | byte as u16;
                self.packet.payload.push(byte);
            }
            Some(Field::Status) => {
                self.packet.status = byte;
                self.packet.payload.push(byte);
            }
            Some(Field::CrcHigh) => {
                self.packet.received_crc = ((byte as u16) << 8) | (self.packet.received_crc & 0x00FF);
            }
            Some(Field::CrcLow) => {
                self.packet.received_crc = (self.packet.received_crc & 0xFF00) | byte as u16;
            }
            None => {}
        }

        let next = pos + 1;
        if next < variant.payload_len() {
            self.packet.state = ReadState::Extracting { pos: next };
            return Feed::Pending;
        }

        self.packet.state = ReadState::Finished;
        self.verify()
    }

    fn verify(&mut self) -> Feed {
        if !self.config.variant.has_checksum() {
            return Feed::Complete;
        }

        let expected = crc16(&self.packet.payload);
        let received = self.packet.received_crc;
        if expected == received {
            return Feed::Complete;
        }

        self.packet.corrupt = true;
        self.packet.zero_values();
        self.stats.corrupt += 1;
        log::warn!(
            "{} packet failed checksum (expected {:#06x}, received {:#06x}), discarding",
            self.config.variant,
            expected,
            received
        );
        Feed::Corrupt { expected, received }
    }

    /// Pull bytes until one valid packet is complete.
    ///
    /// Corrupt and stale packets are discarded and scanning continues. Fails
    /// with `Timeout` when no byte advanced a packet within the receive
    /// timeout, so a line carrying only noise times out like a silent one.
    /// Fails with `Cancelled` as soon as `cancel` returns true.
    pub fn next_packet(
        &mut self,
        transport: &mut dyn ByteTransport,
        cancel: &dyn Fn() -> bool,
    ) -> Result<(), DecodeError> {
        let mut byte = [0u8; 1];

        loop {
            if cancel() {
                return Err(DecodeError::Cancelled);
            }

            let read = match transport.read(&mut byte) {
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => 0,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::Io(e)),
            };

            let now = Instant::now();
            let last_progress = *self.last_progress.get_or_insert(now);

            if read == 0 {
                self.seen_empty_read = true;
            } else {
                let feed = self.push_byte(byte[0], now);
                // Only bytes skipped while hunting for sync leave the state at Syncing
                if self.packet.state != ReadState::Syncing {
                    self.last_progress = Some(now);
                }

                match feed {
                    Feed::Pending => {}
                    Feed::Corrupt { expected, received } => {
                        self.discards.push(Discard::Corrupt { expected, received });
                    }
                    Feed::Complete => {
                        if self.config.discard_cached && !self.live && !self.seen_empty_read {
                            log::debug!("discarding {} packet replayed from transport cache", self.config.variant);
                            self.stats.stale += 1;
                            self.discards.push(Discard::Stale);
                            self.packet.reset();
                            self.packet.reset_timing();
                            continue;
                        }
                        self.live = true;
                        self.stats.packets += 1;
                        return Ok(());
                    }
                }

                if self.packet.state != ReadState::Syncing {
                    continue;
                }
            }

            let elapsed = now.saturating_duration_since(last_progress);
            if elapsed > self.config.receive_timeout {
                self.stats.timeouts += 1;
                self.last_progress = Some(now);
                self.packet.reset();
                return Err(DecodeError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
            if read == 0 {
                std::thread::sleep(IDLE_BACKOFF);
            }
        }
    }
}

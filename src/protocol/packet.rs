use super::variant::{SampleEncoding, MAGNITUDE_MASK, MAX_CHANNELS, SIGN_BIT};
use std::time::Instant;

/// Parse progress of the in-flight packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Freshly reset, nothing consumed.
    Start,
    /// Scanning for a sync byte.
    Syncing,
    /// Collecting payload; `pos` counts bytes after the sync byte.
    Extracting { pos: usize },
    Finished,
}

/// Reusable packet arena. One instance lives for the whole decoder lifetime
/// and is `reset()` between packets instead of being reallocated.
#[derive(Debug, Clone)]
pub struct TelemetryPacket {
    pub(crate) state: ReadState,
    pub(crate) sync: u8,
    pub(crate) raw: [u16; MAX_CHANNELS],
    pub(crate) status: u8,
    pub(crate) payload: Vec<u8>,
    pub(crate) received_crc: u16,
    pub(crate) corrupt: bool,
    pub(crate) arrival: Option<Instant>,
    pub(crate) previous_arrival: Option<Instant>,
}

impl TelemetryPacket {
    pub fn new() -> Self {
        Self {
            state: ReadState::Start,
            sync: 0,
            raw: [0; MAX_CHANNELS],
            status: 0,
            payload: Vec::with_capacity(32),
            received_crc: 0,
            corrupt: false,
            arrival: None,
            previous_arrival: None,
        }
    }

    /// Back to `Start`. Arrival timestamps survive so the next packet can be
    /// compared against this one.
    pub fn reset(&mut self) {
        self.state = ReadState::Start;
        self.sync = 0;
        self.raw = [0; MAX_CHANNELS];
        self.status = 0;
        self.payload.clear();
        self.received_crc = 0;
        self.corrupt = false;
    }

    /// Forget timing history as well, used after reconnects.
    pub fn reset_timing(&mut self) {
        self.arrival = None;
        self.previous_arrival = None;
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    pub fn sync(&self) -> u8 {
        self.sync
    }

    pub fn status(&self) -> u8 {
        self.status
    }

    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    pub fn received_crc(&self) -> u16 {
        self.received_crc
    }

    /// Bytes covered by the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Unsigned view of the first `channels` words.
    pub fn raw(&self, channels: usize) -> &[u16] {
        &self.raw[..channels.min(MAX_CHANNELS)]
    }

    /// Signed view of one word.
    pub fn signed(&self, channel: usize, encoding: SampleEncoding) -> i32 {
        let word = self.raw[channel];
        match encoding {
            SampleEncoding::Unsigned16 => word as i32,
            SampleEncoding::SignMagnitude10 => {
                let magnitude = (word & MAGNITUDE_MASK) as i32;
                if word & SIGN_BIT != 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
        }
    }

    /// Decoded values as floats.
    pub fn values(&self, channels: usize, encoding: SampleEncoding) -> Vec<f64> {
        (0..channels.min(MAX_CHANNELS))
            .map(|ch| self.signed(ch, encoding) as f64)
            .collect()
    }

    pub fn arrival(&self) -> Option<Instant> {
        self.arrival
    }

    pub fn previous_arrival(&self) -> Option<Instant> {
        self.previous_arrival
    }

    pub(crate) fn mark_arrival(&mut self, now: Instant) {
        self.previous_arrival = self.arrival;
        self.arrival = Some(now);
    }

    pub(crate) fn zero_values(&mut self) {
        self.raw = [0; MAX_CHANNELS];
        self.status = 0;
    }
}

impl Default for TelemetryPacket {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_magnitude_view() {
        let mut packet = TelemetryPacket::new();
        packet.raw[0] = SIGN_BIT | 0x0123;
        packet.raw[1] = 0x03FF;
        assert_eq!(packet.signed(0, SampleEncoding::SignMagnitude10), -0x123);
        assert_eq!(packet.signed(1, SampleEncoding::SignMagnitude10), 1023);
        assert_eq!(packet.signed(0, SampleEncoding::Unsigned16), 0x0523);
    }

    #[test]
    fn test_reset_keeps_timing() {
        let mut packet = TelemetryPacket::new();
        let now = Instant::now();
        packet.mark_arrival(now);
        packet.payload.push(1);
        packet.reset();
        assert!(packet.payload().is_empty());
        assert_eq!(packet.arrival(), Some(now));
        packet.reset_timing();
        assert_eq!(packet.arrival(), None);
    }
}

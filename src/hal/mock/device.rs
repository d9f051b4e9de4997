use crate::hal::ByteTransport;
use crate::protocol::{encode_packet, ProtocolVariant, SampleEncoding};
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::io;
use std::time::{Duration, Instant};

/// Spacing of the two packets of a pair.
const PAIR_GAP: Duration = Duration::from_millis(5);

/// Backlog beyond which the device skips ahead instead of bursting.
const MAX_BACKLOG: Duration = Duration::from_secs(1);

/// Serial device emulator emitting encoded telemetry frames in real time.
///
/// Variants with a paired interval send two packets `PAIR_GAP` apart once per
/// interval and ignore `packet_rate`. Optional noise flips random bits in the
/// outgoing bytes.
pub struct SimulatedDevice {
    variant: ProtocolVariant,
    packet_rate: f64,
    frequency: f64,
    noise: f64,
    cached: usize,
    rng: StdRng,
    open: bool,
    opened_at: Instant,
    next_emit: Instant,
    pair_start: Instant,
    in_pair: bool,
    emitted: u64,
    pending: VecDeque<u8>,
}

impl SimulatedDevice {
    pub fn new(variant: ProtocolVariant, packet_rate: f64) -> Self {
        let now = Instant::now();
        Self {
            variant,
            packet_rate,
            frequency: 1.0,
            noise: 0.0,
            cached: 0,
            rng: StdRng::from_entropy(),
            open: false,
            opened_at: now,
            next_emit: now,
            pair_start: now,
            in_pair: false,
            emitted: 0,
            pending: VecDeque::new(),
        }
    }

    /// Sine frequency of the synthesized channel values.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Probability in `[0, 1]` that any outgoing byte has one bit flipped.
    pub fn with_noise(mut self, probability: f64) -> Self {
        self.noise = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Packets already sitting in the receive buffer when the port opens.
    pub fn with_cached_packets(mut self, count: usize) -> Self {
        self.cached = count;
        self
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn values_at(&self, t: f64) -> Vec<f64> {
        let (offset, amplitude) = match self.variant.encoding() {
            SampleEncoding::Unsigned16 => (512.0, 400.0),
            SampleEncoding::SignMagnitude10 => (0.0, 400.0),
        };
        (0..self.variant.channels())
            .map(|ch| {
                let shift = ch as f64 * PI / 4.0;
                offset + amplitude * (2.0 * PI * self.frequency * t + shift).sin()
            })
            .collect()
    }

    fn emit_packet(&mut self, at: Instant) {
        let t = at.saturating_duration_since(self.opened_at).as_secs_f64();
        let values = self.values_at(t);
        let mut frame = encode_packet(self.variant, &values, (self.emitted & 0xFF) as u8);

        if self.noise > 0.0 {
            for byte in frame.iter_mut() {
                if self.rng.gen_bool(self.noise) {
                    *byte ^= 1 << self.rng.gen_range(0..8);
                }
            }
        }

        self.pending.extend(frame);
        self.emitted += 1;
    }

    fn advance_schedule(&mut self) {
        match self.variant.paired_interval() {
            Some(interval) => {
                if self.in_pair {
                    self.pair_start += interval;
                    self.next_emit = self.pair_start;
                    self.in_pair = false;
                } else {
                    self.next_emit += PAIR_GAP;
                    self.in_pair = true;
                }
            }
            None => {
                self.next_emit += Duration::from_secs_f64(1.0 / self.packet_rate);
            }
        }
    }

    fn produce(&mut self, now: Instant) {
        if now.saturating_duration_since(self.next_emit) > MAX_BACKLOG {
            log::debug!("Simulated device fell behind, skipping ahead");
            self.next_emit = now;
            self.pair_start = now;
            self.in_pair = false;
        }
        while self.next_emit <= now {
            let at = self.next_emit;
            self.emit_packet(at);
            self.advance_schedule();
        }
    }
}

impl ByteTransport for SimulatedDevice {
    fn describe(&self) -> String {
        format!("simulated {} device", self.variant)
    }

    fn open(&mut self) -> Result<()> {
        if self.variant.paired_interval().is_none()
            && !(self.packet_rate.is_finite() && self.packet_rate > 0.0)
        {
            bail!("Packet rate must be positive, got {}", self.packet_rate);
        }

        let now = Instant::now();
        self.open = true;
        self.opened_at = now;
        self.pending.clear();
        self.in_pair = false;
        self.emitted = 0;

        for _ in 0..self.cached {
            self.emit_packet(now);
        }

        // First live packet one period after opening
        let first = match self.variant.paired_interval() {
            Some(interval) => now + interval,
            None => now + Duration::from_secs_f64(1.0 / self.packet_rate),
        };
        self.next_emit = first;
        self.pair_start = first;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "device closed"));
        }

        self.produce(Instant::now());

        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

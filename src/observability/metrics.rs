use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Lock-free counters for one source, shared between the worker and readers.
pub struct SourceMetrics {
    source: String,
    cycles: AtomicU64,
    packages_emitted: AtomicU64,
    corrupt_packets: AtomicU64,
    stale_packets: AtomicU64,
    timeouts: AtomicU64,
    cycle_errors: AtomicU64,
    total_latency_us: AtomicU64,
    latency_samples: AtomicU64,
}

impl SourceMetrics {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            cycles: AtomicU64::new(0),
            packages_emitted: AtomicU64::new(0),
            corrupt_packets: AtomicU64::new(0),
            stale_packets: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            cycle_errors: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn packages_emitted(&self) -> u64 {
        self.packages_emitted.load(Ordering::Relaxed)
    }

    pub fn corrupt_packets(&self) -> u64 {
        self.corrupt_packets.load(Ordering::Relaxed)
    }

    pub fn stale_packets(&self) -> u64 {
        self.stale_packets.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn cycle_errors(&self) -> u64 {
        self.cycle_errors.load(Ordering::Relaxed)
    }

    pub fn record_package_emitted(&self) {
        self.packages_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corrupt_packet(&self) {
        self.corrupt_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_packet(&self) {
        self.stale_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_error(&self) {
        self.cycle_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn start_cycle(&self) -> Instant {
        Instant::now()
    }

    /// Close a cycle opened with `start_cycle`; counts it and its latency.
    pub fn finish_cycle(&self, start: Instant) {
        let latency_us = start.elapsed().as_micros() as u64;
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_cycle_latency_us(&self) -> u64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0;
        }
        self.total_latency_us.load(Ordering::Relaxed) / samples
    }
}

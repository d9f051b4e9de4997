use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Package rate above which busy-waiting is selected automatically.
pub const HIGH_PRECISION_RATE: f64 = 1000.0;

/// How the worker waits out the rest of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingMode {
    /// Blocking, interruptible wait. Millisecond-level accuracy.
    LowPrecision,
    /// Spin on the monotonic clock. Sub-millisecond accuracy, occupies a
    /// full CPU core while waiting.
    HighPrecision,
}

impl TimingMode {
    pub fn for_rate(package_rate: f64, requested_high: bool) -> Self {
        if requested_high || package_rate > HIGH_PRECISION_RATE {
            Self::HighPrecision
        } else {
            Self::LowPrecision
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Woken,
}

/// Control-side handle that cuts a pending wait short.
#[derive(Debug, Clone)]
pub struct Waker {
    tx: Sender<()>,
}

impl Waker {
    /// Wake signals coalesce: at most one is pending at a time.
    pub fn wake(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Worker-side wait primitive shared by both timing modes.
#[derive(Debug)]
pub struct Pacer {
    rx: Receiver<()>,
}

pub fn pacer() -> (Waker, Pacer) {
    let (tx, rx) = bounded(1);
    (Waker { tx }, Pacer { rx })
}

impl Pacer {
    pub fn wait_until(&self, deadline: Instant, mode: TimingMode) -> WaitOutcome {
        match mode {
            TimingMode::LowPrecision => self.block_until(deadline),
            TimingMode::HighPrecision => self.spin_until(deadline),
        }
    }

    pub fn wait_for(&self, duration: Duration, mode: TimingMode) -> WaitOutcome {
        self.wait_until(Instant::now() + duration, mode)
    }

    /// Discard a pending wake signal.
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    fn block_until(&self, deadline: Instant) -> WaitOutcome {
        let delay = deadline.saturating_duration_since(Instant::now());
        if delay.is_zero() {
            return match self.rx.try_recv() {
                Ok(()) => WaitOutcome::Woken,
                Err(_) => WaitOutcome::Elapsed,
            };
        }

        match self.rx.recv_timeout(delay) {
            Ok(()) => WaitOutcome::Woken,
            Err(RecvTimeoutError::Timeout) => WaitOutcome::Elapsed,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                WaitOutcome::Elapsed
            }
        }
    }

    fn spin_until(&self, deadline: Instant) -> WaitOutcome {
        loop {
            match self.rx.try_recv() {
                Ok(()) => return WaitOutcome::Woken,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
            if Instant::now() >= deadline {
                return WaitOutcome::Elapsed;
            }
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        assert_eq!(TimingMode::for_rate(250.0, false), TimingMode::LowPrecision);
        assert_eq!(TimingMode::for_rate(250.0, true), TimingMode::HighPrecision);
        assert_eq!(TimingMode::for_rate(1000.0, false), TimingMode::LowPrecision);
        assert_eq!(TimingMode::for_rate(2000.0, false), TimingMode::HighPrecision);
    }

    #[test]
    fn test_low_precision_elapses() {
        let (_waker, pacer) = pacer();
        let start = Instant::now();
        assert_eq!(pacer.wait_for(Duration::from_millis(20), TimingMode::LowPrecision), WaitOutcome::Elapsed);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_high_precision_elapses() {
        let (_waker, pacer) = pacer();
        let deadline = Instant::now() + Duration::from_millis(5);
        assert_eq!(pacer.wait_until(deadline, TimingMode::HighPrecision), WaitOutcome::Elapsed);
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn test_pending_wake_cuts_spin_short() {
        let (waker, pacer) = pacer();
        waker.wake();
        waker.wake();
        let start = Instant::now();
        assert_eq!(pacer.wait_for(Duration::from_secs(5), TimingMode::HighPrecision), WaitOutcome::Woken);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drain_clears_pending_wake() {
        let (waker, pacer) = pacer();
        waker.wake();
        pacer.drain();
        assert_eq!(pacer.wait_for(Duration::from_millis(1), TimingMode::LowPrecision), WaitOutcome::Elapsed);
    }
}

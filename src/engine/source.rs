use anyhow::{anyhow, bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::pacer::{pacer, Pacer, TimingMode, Waker};
use super::state::SourceState;
use crate::core::{AcquisitionNode, CycleContext, PackageSink, SourceConfig};
use crate::observability::{EventBus, SourceEvent, SourceMetrics};

/// Worker poll period while acquisition is switched off.
pub const IDLE_POLL: Duration = Duration::from_millis(200);

/// Upper bound on how long `destroy` waits for the worker to exit.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

const JOIN_POLL: Duration = Duration::from_millis(10);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything the worker touches while acquiring.
struct Device {
    node: Box<dyn AcquisitionNode>,
    config: Option<SourceConfig>,
    sequence: u64,
    epoch: Instant,
}

struct Shared {
    name: String,
    /// Worker thread lifetime; cleared only by `destroy`.
    running: AtomicBool,
    /// Whether cycles are currently executed and emitted.
    started: AtomicBool,
    /// Serializes control calls. Always taken before `device`.
    control: Mutex<SourceState>,
    device: Mutex<Device>,
    sink: Box<dyn PackageSink>,
    events: EventBus,
    metrics: Arc<SourceMetrics>,
}

impl Shared {
    fn is_active(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.started.load(Ordering::Acquire)
    }

    fn transition(&self, state: &mut SourceState, target: SourceState) {
        log::info!("Source {}: {} -> {}", self.name, state, target);
        *state = target;
        self.events.publish(SourceEvent::StateChanged { state: target });
    }
}

/// One source: a dormant worker thread plus the control surface that drives
/// it through its lifecycle.
///
/// Control calls run on the caller's thread and may be issued from several
/// threads; they never wait on a full acquisition interval because every
/// state change wakes the worker.
pub struct SourceEngine {
    shared: Arc<Shared>,
    waker: Waker,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SourceEngine {
    /// Spawn the worker immediately; it idles until `start`.
    pub fn new(
        name: impl Into<String>,
        node: Box<dyn AcquisitionNode>,
        sink: Box<dyn PackageSink>,
    ) -> Result<Self> {
        let name = name.into();
        let (waker, pacer) = pacer();
        let shared = Arc::new(Shared {
            metrics: Arc::new(SourceMetrics::new(name.clone())),
            name,
            running: AtomicBool::new(true),
            started: AtomicBool::new(false),
            control: Mutex::new(SourceState::Unconfigured),
            device: Mutex::new(Device {
                node,
                config: None,
                sequence: 0,
                epoch: Instant::now(),
            }),
            sink,
            events: EventBus::new(),
        });

        let worker_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(format!("source-{}", shared.name))
            .spawn(move || worker_loop(worker_shared, pacer))
            .map_err(|e| anyhow!("Failed to spawn worker for {}: {}", shared.name, e))?;

        Ok(Self {
            shared,
            waker,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> SourceState {
        *lock(&self.shared.control)
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn metrics(&self) -> Arc<SourceMetrics> {
        self.shared.metrics.clone()
    }

    /// Active configuration, if any.
    pub fn config(&self) -> Option<SourceConfig> {
        let _control = lock(&self.shared.control);
        lock(&self.shared.device).config.clone()
    }

    /// Validate and apply `config`. On error the source keeps its previous
    /// state and configuration.
    pub fn configure(&self, config: SourceConfig) -> Result<()> {
        let mut state = lock(&self.shared.control);
        if !state.can_transition_to(&SourceState::Configured) {
            bail!("Cannot configure source {} in state {}", self.shared.name, *state);
        }
        config.validate()?;

        let mut device = lock(&self.shared.device);
        if *state == SourceState::Stopped {
            device.node.close()?;
        }
        device.node.configure(&config)?;
        log::debug!(
            "Source {}: {} channels at {} packages/s ({:?})",
            self.shared.name,
            config.channels,
            config.package_rate,
            config.timing_mode()
        );
        device.config = Some(config);
        drop(device);

        self.shared.transition(&mut state, SourceState::Configured);
        Ok(())
    }

    /// Open the transport and clear all buffers.
    pub fn initialize(&self) -> Result<()> {
        let mut state = lock(&self.shared.control);
        if !state.can_transition_to(&SourceState::Initialized) {
            bail!("Cannot initialize source {} in state {}", self.shared.name, *state);
        }

        let mut device = lock(&self.shared.device);
        device.node.open()?;
        device.node.reset();
        device.sequence = 0;
        drop(device);

        self.shared.transition(&mut state, SourceState::Initialized);
        Ok(())
    }

    /// Switch acquisition on. Starting a started source is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut state = lock(&self.shared.control);
        if *state == SourceState::Started {
            return Ok(());
        }
        if !state.can_start() {
            bail!("Cannot start source {} in state {}", self.shared.name, *state);
        }

        lock(&self.shared.device).epoch = Instant::now();
        self.shared.started.store(true, Ordering::Release);
        self.waker.wake();

        self.shared.transition(&mut state, SourceState::Started);
        Ok(())
    }

    /// Switch acquisition off and reset buffers and counters. Stopping a
    /// source that is not started is a no-op.
    pub fn stop(&self) -> Result<()> {
        let mut state = lock(&self.shared.control);
        self.stop_locked(&mut state);
        Ok(())
    }

    fn stop_locked(&self, state: &mut SourceState) {
        if *state != SourceState::Started {
            return;
        }

        self.shared.started.store(false, Ordering::Release);
        self.waker.wake();

        // The worker notices the cleared flag within one byte read or wait.
        let mut device = lock(&self.shared.device);
        device.node.reset();
        device.sequence = 0;
        drop(device);

        self.shared.transition(state, SourceState::Stopped);
    }

    /// Stop, end the worker with a bounded join and close the transport.
    /// Destroying twice is a no-op.
    pub fn destroy(&self) -> Result<()> {
        let mut state = lock(&self.shared.control);
        if *state == SourceState::Destroyed {
            return Ok(());
        }

        self.stop_locked(&mut state);

        self.shared.running.store(false, Ordering::Release);
        self.waker.wake();

        let exited = match lock(&self.worker).take() {
            Some(handle) => join_bounded(handle, JOIN_TIMEOUT, &self.shared.name),
            None => true,
        };

        let closed = if exited {
            lock(&self.shared.device).node.close()
        } else {
            match self.shared.device.try_lock() {
                Ok(mut device) => device.node.close(),
                Err(_) => {
                    log::warn!("Source {}: transport still busy, not closed", self.shared.name);
                    Ok(())
                }
            }
        };

        self.shared.transition(&mut state, SourceState::Destroyed);
        closed
    }
}

impl Drop for SourceEngine {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::error!("Source {}: error during teardown: {}", self.shared.name, e);
        }
    }
}

/// Wait for the worker in small steps. A worker that does not exit in time is
/// abandoned.
fn join_bounded(handle: JoinHandle<()>, timeout: Duration, name: &str) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            log::warn!("Source {}: worker did not exit within {:?}, abandoning it", name, timeout);
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
    if handle.join().is_err() {
        log::error!("Source {}: worker panicked", name);
    }
    true
}

fn worker_loop(shared: Arc<Shared>, pacer: Pacer) {
    log::debug!("Source {}: worker started", shared.name);
    let mut was_active = false;

    while shared.running.load(Ordering::Acquire) {
        if !shared.started.load(Ordering::Acquire) {
            was_active = false;
            pacer.wait_for(IDLE_POLL, TimingMode::LowPrecision);
            continue;
        }
        if !was_active {
            // The wake that started us must not shorten the first cycle.
            pacer.drain();
            was_active = true;
        }

        let cycle_start = shared.metrics.start_cycle();
        let pacing = run_cycle(&shared, &pacer);
        shared.metrics.finish_cycle(cycle_start);

        match pacing {
            Some((interval, mode)) => match cycle_start.checked_add(interval) {
                Some(deadline) => {
                    pacer.wait_until(deadline, mode);
                }
                None => {
                    log::warn!("Source {}: interval {:?} out of range, idling", shared.name, interval);
                    pacer.wait_for(IDLE_POLL, TimingMode::LowPrecision);
                }
            },
            None => {
                pacer.wait_for(IDLE_POLL, TimingMode::LowPrecision);
            }
        }
    }

    log::debug!("Source {}: worker exited", shared.name);
}

/// Acquire and emit one package. Returns the interval and timing mode to pace
/// the next cycle with, or `None` if the source has no configuration.
fn run_cycle(shared: &Shared, pacer: &Pacer) -> Option<(Duration, TimingMode)> {
    let cancel = || !shared.is_active();

    let mut device = lock(&shared.device);
    let (interval, mode) = match &device.config {
        Some(config) => (config.interval(), config.timing_mode()),
        None => return None,
    };

    let ctx = CycleContext::new(pacer, mode, &cancel, &shared.events, &shared.metrics);
    let package = match device.node.acquire(&ctx) {
        Ok(Some(package)) => package,
        Ok(None) => return Some((interval, mode)),
        Err(e) => {
            shared.metrics.record_cycle_error();
            log::error!("Source {}: acquisition cycle failed: {:#}", shared.name, e);
            return Some((interval, mode));
        }
    };

    if !shared.is_active() {
        return Some((interval, mode));
    }

    let sequence = device.sequence;
    device.sequence += 1;
    let timestamp_us = device.epoch.elapsed().as_micros() as u64;
    drop(device);

    shared.sink.emit(package.with_sequence(sequence, timestamp_us));
    shared.metrics.record_package_emitted();
    Some((interval, mode))
}

use super::{SamplePackage, SourceConfig};
use crate::engine::{Pacer, TimingMode, WaitOutcome};
use crate::observability::{EventBus, SourceEvent, SourceMetrics};
use anyhow::Result;
use std::time::Duration;

/// Device-specific half of a source: turns whatever the hardware delivers into
/// one `SamplePackage` per cycle. The engine owns threading and timing.
pub trait AcquisitionNode: Send {
    /// Apply a validated configuration. Called before `open` and again on
    /// every reconfiguration.
    fn configure(&mut self, config: &SourceConfig) -> Result<()>;

    /// Open the underlying transport.
    fn open(&mut self) -> Result<()>;

    /// Perform one acquisition cycle.
    ///
    /// `Ok(None)` means no package this cycle (cancelled, timed out or not
    /// enough data yet). Errors are logged by the engine and the loop goes on.
    fn acquire(&mut self, ctx: &CycleContext<'_>) -> Result<Option<SamplePackage>>;

    /// Clear buffers, counters and any half-read packet.
    fn reset(&mut self);

    fn close(&mut self) -> Result<()>;
}

/// What a node may use while acquiring: cancellation, interruptible pauses and
/// the source's status outputs.
pub struct CycleContext<'a> {
    pacer: &'a Pacer,
    timing: TimingMode,
    cancel: &'a dyn Fn() -> bool,
    events: &'a EventBus,
    metrics: &'a SourceMetrics,
}

impl<'a> CycleContext<'a> {
    pub fn new(
        pacer: &'a Pacer,
        timing: TimingMode,
        cancel: &'a dyn Fn() -> bool,
        events: &'a EventBus,
        metrics: &'a SourceMetrics,
    ) -> Self {
        Self {
            pacer,
            timing,
            cancel,
            events,
            metrics,
        }
    }

    /// True once the source was stopped or is being destroyed.
    pub fn is_cancelled(&self) -> bool {
        (self.cancel)()
    }

    pub fn cancel_check(&self) -> &dyn Fn() -> bool {
        self.cancel
    }

    pub fn timing(&self) -> TimingMode {
        self.timing
    }

    /// Sleep within the cycle using the source's timing mode.
    ///
    /// Returns false if a control call woke the worker before `duration`
    /// elapsed.
    pub fn pause(&self, duration: Duration) -> bool {
        self.pacer.wait_for(duration, self.timing) == WaitOutcome::Elapsed
    }

    pub fn publish(&self, event: SourceEvent) {
        self.events.publish(event);
    }

    pub fn metrics(&self) -> &SourceMetrics {
        self.metrics
    }
}

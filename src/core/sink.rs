use super::SamplePackage;

/// Downstream consumer of finished packages.
///
/// Called once per cycle on the worker thread. Implementations must not block
/// indefinitely; hand the package to another stage instead.
pub trait PackageSink: Send + Sync {
    fn emit(&self, package: SamplePackage);
}

impl<F> PackageSink for F
where
    F: Fn(SamplePackage) + Send + Sync,
{
    fn emit(&self, package: SamplePackage) {
        self(package)
    }
}

/// Non-blocking hand-off; a full or closed channel drops the package.
pub struct ChannelSink(pub crossbeam_channel::Sender<SamplePackage>);

impl PackageSink for ChannelSink {
    fn emit(&self, package: SamplePackage) {
        let sequence = package.sequence();
        if let Err(e) = self.0.try_send(package) {
            log::warn!("Dropping package {}: {}", sequence, e);
        }
    }
}

/// Bridge into an async stage without blocking the worker.
pub struct AsyncSink(pub tokio::sync::mpsc::Sender<SamplePackage>);

impl PackageSink for AsyncSink {
    fn emit(&self, package: SamplePackage) {
        let sequence = package.sequence();
        if let Err(e) = self.0.try_send(package) {
            log::warn!("Dropping package {}: {}", sequence, e);
        }
    }
}

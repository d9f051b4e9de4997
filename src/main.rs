use std::time::{Duration, Instant};

use telesource::core::ChannelSink;
use telesource::hal::SimulatedDevice;
use telesource::nodes::TelemetryNode;
use telesource::observability::{MetricsCollector, SourceMonitor};
use telesource::protocol::ProtocolVariant;
use telesource::spectral::{FrequencyBin, SpectralConfig};
use telesource::{SourceConfig, SourceEngine};

const RUN_TIME: Duration = Duration::from_secs(4);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Telesource - simulated power telemetry");
    println!("======================================\n");

    // Power frames arrive in pairs every 400 ms: 5 packages per second
    let mut config = SourceConfig::new("power", ProtocolVariant::Power, 5.0);
    config.history = 64;
    config.spectral = Some(SpectralConfig {
        order: 4,
        window: 16,
        bins: vec![
            FrequencyBin::new(0.1, 0.8, 4),
            FrequencyBin::new(0.8, 1.6, 4),
            FrequencyBin::new(1.6, 2.5, 4),
        ],
    });

    let device = SimulatedDevice::new(ProtocolVariant::Power, 0.0)
        .with_frequency(0.5)
        .with_noise(0.002);
    let node = TelemetryNode::new(Box::new(device));

    let (tx, rx) = crossbeam_channel::bounded(64);
    let engine = SourceEngine::new("power", Box::new(node), Box::new(ChannelSink(tx)))?;
    let events = engine.events().subscribe();

    let mut collector = MetricsCollector::new();
    collector.register(engine.metrics());
    let monitor = SourceMonitor::new(collector);

    engine.configure(config)?;
    engine.initialize()?;
    engine.start()?;

    let deadline = Instant::now() + RUN_TIME;
    while Instant::now() < deadline {
        if let Ok(package) = rx.recv_timeout(Duration::from_millis(100)) {
            let preview: Vec<String> = package
                .values()
                .iter()
                .take(6)
                .map(|v| format!("{:.1}", v))
                .collect();
            println!(
                "#{:<4} t={:>8} us  {}x{} {:?}  [{}]",
                package.sequence(),
                package.timestamp_us(),
                package.channels(),
                package.samples(),
                package.kind(),
                preview.join(", ")
            );
        }
        for event in events.try_iter() {
            println!("event: {:?}", event);
        }
    }

    engine.destroy()?;

    println!("\n{}", monitor.generate_report());
    Ok(())
}

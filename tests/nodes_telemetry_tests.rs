use std::time::{Duration, Instant};
use telesource::core::CycleContext;
use telesource::engine::{pacer, TimingMode};
use telesource::hal::{ScriptHandle, ScriptedTransport};
use telesource::nodes::TelemetryNode;
use telesource::observability::{EventBus, SourceEvent, SourceMetrics};
use telesource::protocol::{encode_packet, ProtocolVariant};
use telesource::{AcquisitionNode, SourceConfig};

fn node(config: &SourceConfig) -> (TelemetryNode, ScriptHandle) {
    let transport = ScriptedTransport::new();
    let handle = transport.handle();
    let mut node = TelemetryNode::new(Box::new(transport));
    node.configure(config).unwrap();
    node.open().unwrap();
    (node, handle)
}

fn never() -> bool {
    false
}

#[test]
fn test_package_collects_samples_per_package_frames() {
    let mut config = SourceConfig::new("raw", ProtocolVariant::Raw, 10.0);
    config.samples_per_package = 2;
    let (mut node, handle) = node(&config);
    handle.push_empty();
    handle.push_bytes(encode_packet(ProtocolVariant::Raw, &[1.0, -2.0, 3.0, -4.0], 0));
    handle.push_bytes(encode_packet(ProtocolVariant::Raw, &[5.0, -6.0, 7.0, -8.0], 0));

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let metrics = SourceMetrics::new("raw");
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &never, &events, &metrics);

    let package = node.acquire(&ctx).unwrap().unwrap();
    assert_eq!(package.channels(), 4);
    assert_eq!(package.samples(), 2);
    assert_eq!(package.channel(1), vec![-2.0, -6.0]);
    assert_eq!(package.channel(3), vec![-4.0, -8.0]);
}

#[test]
fn test_timeout_reports_lost_then_restored() {
    let mut config = SourceConfig::new("legacy", ProtocolVariant::Legacy, 10.0);
    config.receive_timeout_ms = 30;
    let (mut node, handle) = node(&config);

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let rx = events.subscribe();
    let metrics = SourceMetrics::new("legacy");
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &never, &events, &metrics);

    assert!(node.acquire(&ctx).unwrap().is_none());
    assert!(node.acquire(&ctx).unwrap().is_none());
    assert_eq!(metrics.timeouts(), 2);

    handle.push_bytes(encode_packet(ProtocolVariant::Legacy, &[1.0; 6], 0));
    assert!(node.acquire(&ctx).unwrap().is_some());

    let seen: Vec<SourceEvent> = rx.try_iter().collect();
    assert!(matches!(seen[0], SourceEvent::PacketTimeout { .. }));
    assert_eq!(seen[1], SourceEvent::ConnectionLost);
    assert!(matches!(seen[2], SourceEvent::PacketTimeout { .. }));
    assert_eq!(seen[3], SourceEvent::ConnectionRestored);
    assert_eq!(seen.len(), 4);
}

#[test]
fn test_corrupt_packet_event() {
    let config = SourceConfig::new("power", ProtocolVariant::Power, 5.0);
    let (mut node, handle) = node(&config);
    let mut bad = encode_packet(ProtocolVariant::Power, &[1.0; 5], 0);
    bad[5] ^= 0x04;
    handle.push_empty();
    handle.push_bytes(bad);
    handle.push_bytes(encode_packet(ProtocolVariant::Power, &[2.0; 5], 0));

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let rx = events.subscribe();
    let metrics = SourceMetrics::new("power");
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &never, &events, &metrics);

    let package = node.acquire(&ctx).unwrap().unwrap();
    assert_eq!(package.values(), &[2.0; 5]);
    assert_eq!(metrics.corrupt_packets(), 1);
    assert!(matches!(rx.try_recv(), Ok(SourceEvent::CorruptPacket { .. })));
}

#[test]
fn test_paired_packet_held_until_half_interval() {
    let config = SourceConfig::new("power", ProtocolVariant::Power, 5.0);
    let (mut node, handle) = node(&config);

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let metrics = SourceMetrics::new("power");
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &never, &events, &metrics);

    handle.push_empty();
    handle.push_bytes(encode_packet(ProtocolVariant::Power, &[1.0; 5], 0));
    let first_at = Instant::now();
    node.acquire(&ctx).unwrap().unwrap();

    std::thread::sleep(Duration::from_millis(10));
    handle.push_bytes(encode_packet(ProtocolVariant::Power, &[2.0; 5], 0));
    let second = node.acquire(&ctx).unwrap().unwrap();
    let held = first_at.elapsed();

    assert_eq!(second.values(), &[2.0; 5]);
    // Due 200 ms after the first packet's arrival
    assert!(held >= Duration::from_millis(190), "released after {:?}", held);
    assert!(held < Duration::from_secs(1));
}

#[test]
fn test_unpaired_variant_is_not_held() {
    let config = SourceConfig::new("raw", ProtocolVariant::Raw, 5.0);
    let (mut node, handle) = node(&config);

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let metrics = SourceMetrics::new("raw");
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &never, &events, &metrics);

    handle.push_empty();
    handle.push_bytes(encode_packet(ProtocolVariant::Raw, &[1.0; 4], 0));
    handle.push_bytes(encode_packet(ProtocolVariant::Raw, &[2.0; 4], 0));

    let start = Instant::now();
    node.acquire(&ctx).unwrap().unwrap();
    node.acquire(&ctx).unwrap().unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_cancelled_cycle_yields_nothing() {
    let config = SourceConfig::new("raw", ProtocolVariant::Raw, 5.0);
    let (mut node, _handle) = node(&config);

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let metrics = SourceMetrics::new("raw");
    let cancelled = || true;
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &cancelled, &events, &metrics);

    assert!(node.acquire(&ctx).unwrap().is_none());
}

#[test]
fn test_too_many_channels_rejected() {
    let mut config = SourceConfig::new("raw", ProtocolVariant::Raw, 5.0);
    config.channels = 6;
    let mut node = TelemetryNode::new(Box::new(ScriptedTransport::new()));
    assert!(node.configure(&config).is_err());
}

#[test]
fn test_idle_before_start_is_not_a_timeout() {
    let mut config = SourceConfig::new("power", ProtocolVariant::Power, 10.0);
    config.receive_timeout_ms = 100;
    config.discard_cached = false;
    let (mut node, handle) = node(&config);
    node.reset();

    std::thread::sleep(Duration::from_millis(300));
    handle.push_empty();
    handle.push_bytes(encode_packet(ProtocolVariant::Power, &[1.0, 2.0, 3.0, 4.0, 5.0], 0));

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let rx = events.subscribe();
    let metrics = SourceMetrics::new("power");
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &never, &events, &metrics);

    let package = node.acquire(&ctx).unwrap().unwrap();
    assert_eq!(package.channel(4), vec![5.0]);
    assert_eq!(metrics.timeouts(), 0);
    assert!(rx.try_iter().next().is_none());
}

#[test]
fn test_idle_then_silence_times_out_after_full_timeout() {
    let mut config = SourceConfig::new("power", ProtocolVariant::Power, 10.0);
    config.receive_timeout_ms = 100;
    let (mut node, _handle) = node(&config);
    node.reset();

    std::thread::sleep(Duration::from_millis(300));

    let (_waker, pacer) = pacer();
    let events = EventBus::new();
    let rx = events.subscribe();
    let metrics = SourceMetrics::new("power");
    let ctx = CycleContext::new(&pacer, TimingMode::LowPrecision, &never, &events, &metrics);

    let start = Instant::now();
    assert!(node.acquire(&ctx).unwrap().is_none());
    assert!(start.elapsed() >= Duration::from_millis(100));

    match rx.try_recv().unwrap() {
        SourceEvent::PacketTimeout { elapsed_ms } => assert!((100..300).contains(&elapsed_ms)),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(rx.try_recv().unwrap(), SourceEvent::ConnectionLost);
}

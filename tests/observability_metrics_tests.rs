use std::sync::Arc;
use telesource::observability::SourceMetrics;

#[test]
fn test_metrics_creation() {
    let metrics = SourceMetrics::new("power");
    assert_eq!(metrics.source(), "power");
    assert_eq!(metrics.packages_emitted(), 0);
    assert_eq!(metrics.cycle_errors(), 0);
}

#[test]
fn test_metrics_increment() {
    let metrics = Arc::new(SourceMetrics::new("power"));

    metrics.record_package_emitted();
    metrics.record_package_emitted();
    assert_eq!(metrics.packages_emitted(), 2);

    metrics.record_cycle_error();
    metrics.record_timeout();
    assert_eq!(metrics.cycle_errors(), 1);
    assert_eq!(metrics.timeouts(), 1);
}

#[tokio::test]
async fn test_cycle_latency_tracking() {
    let metrics = SourceMetrics::new("power");

    let start = metrics.start_cycle();
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    metrics.finish_cycle(start);

    assert_eq!(metrics.cycles(), 1);
    assert!(metrics.avg_cycle_latency_us() >= 10_000); // At least 10ms in microseconds
}

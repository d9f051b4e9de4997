use std::sync::Arc;
use telesource::observability::{MetricsCollector, SourceMetrics};

#[test]
fn test_collector_registration() {
    let mut collector = MetricsCollector::new();
    let metrics = Arc::new(SourceMetrics::new("power"));

    collector.register(metrics.clone());

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains_key("power"));
    assert!(collector.get("power").is_some());
    assert!(collector.get("raw").is_none());
}

#[test]
fn test_collector_aggregation() {
    let mut collector = MetricsCollector::new();

    let m1 = Arc::new(SourceMetrics::new("power"));
    let m2 = Arc::new(SourceMetrics::new("raw"));

    m1.record_package_emitted();
    m1.record_package_emitted();
    m2.record_package_emitted();

    collector.register(m1);
    collector.register(m2);

    let snapshot = collector.snapshot();

    assert_eq!(snapshot.get("power").unwrap().packages_emitted, 2);
    assert_eq!(snapshot.get("raw").unwrap().packages_emitted, 1);
}

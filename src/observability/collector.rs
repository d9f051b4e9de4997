use std::collections::HashMap;
use std::sync::Arc;
use super::SourceMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub source: String,
    pub cycles: u64,
    pub packages_emitted: u64,
    pub corrupt_packets: u64,
    pub stale_packets: u64,
    pub timeouts: u64,
    pub cycle_errors: u64,
    pub avg_cycle_latency_us: u64,
}

impl From<&SourceMetrics> for MetricsSnapshot {
    fn from(metrics: &SourceMetrics) -> Self {
        Self {
            source: metrics.source().to_string(),
            cycles: metrics.cycles(),
            packages_emitted: metrics.packages_emitted(),
            corrupt_packets: metrics.corrupt_packets(),
            stale_packets: metrics.stale_packets(),
            timeouts: metrics.timeouts(),
            cycle_errors: metrics.cycle_errors(),
            avg_cycle_latency_us: metrics.avg_cycle_latency_us(),
        }
    }
}

/// Registry of per-source metrics, keyed by source name.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: HashMap<String, Arc<SourceMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metrics: Arc<SourceMetrics>) {
        self.metrics.insert(metrics.source().to_string(), metrics);
    }

    pub fn snapshot(&self) -> HashMap<String, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(id, metrics)| (id.clone(), MetricsSnapshot::from(metrics.as_ref())))
            .collect()
    }

    pub fn get(&self, source: &str) -> Option<Arc<SourceMetrics>> {
        self.metrics.get(source).cloned()
    }
}

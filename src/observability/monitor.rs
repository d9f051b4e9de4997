use super::MetricsCollector;

pub struct SourceMonitor {
    collector: MetricsCollector,
}

impl SourceMonitor {
    pub fn new(collector: MetricsCollector) -> Self {
        Self { collector }
    }

    pub fn generate_report(&self) -> String {
        let snapshot = self.collector.snapshot();

        if snapshot.is_empty() {
            return "No sources registered".to_string();
        }

        let mut names: Vec<&String> = snapshot.keys().collect();
        names.sort();

        let mut report = String::from("=== Source Metrics ===\n");
        for name in names {
            let m = &snapshot[name];
            report.push_str(&format!(
                "\n[{}]\n  Cycles: {}\n  Packages: {} emitted\n  Discarded: {} corrupt, {} stale\n  Timeouts: {}\n  Cycle errors: {}\n  Avg cycle latency: {}μs\n",
                name,
                m.cycles,
                m.packages_emitted,
                m.corrupt_packets,
                m.stale_packets,
                m.timeouts,
                m.cycle_errors,
                m.avg_cycle_latency_us,
            ));
        }

        report
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }
}

pub mod collector;
pub mod events;
pub mod metrics;
pub mod monitor;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use events::{EventBus, SourceEvent};
pub use metrics::SourceMetrics;
pub use monitor::SourceMonitor;

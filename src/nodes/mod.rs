pub mod block;
pub mod channel_bank;
pub mod telemetry;

pub use block::BlockNode;
pub use channel_bank::ChannelBank;
pub use telemetry::TelemetryNode;

pub mod pacer;
pub mod source;
pub mod state;

pub use pacer::{pacer, Pacer, TimingMode, WaitOutcome, Waker, HIGH_PRECISION_RATE};
pub use source::{SourceEngine, IDLE_POLL, JOIN_TIMEOUT};
pub use state::SourceState;

pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;
pub mod traits;

pub use mock::{ScriptHandle, ScriptedTransport, SimulatedDevice, SineProvider};
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
pub use traits::{ByteTransport, SampleProvider};

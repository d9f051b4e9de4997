pub mod device;
pub mod scripted;
pub mod sine;

pub use device::SimulatedDevice;
pub use scripted::{ScriptHandle, ScriptedTransport};
pub use sine::SineProvider;

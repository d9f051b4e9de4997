pub mod buffers;
pub mod core;
pub mod engine;
pub mod hal;
pub mod nodes;
pub mod observability;
pub mod protocol;
pub mod spectral;

pub use crate::core::{AcquisitionNode, PackageSink, SamplePackage, SourceConfig};
pub use crate::engine::{SourceEngine, SourceState};

pub mod config;
pub mod node;
pub mod package;
pub mod sink;

pub use config::SourceConfig;
pub use node::{AcquisitionNode, CycleContext};
pub use package::{Layout, PackageKind, SamplePackage};
pub use sink::{AsyncSink, ChannelSink, PackageSink};

pub mod ring;

pub use ring::{RingBuffer, SampleRing, StateRing};

use anyhow::Result;
use std::io;

/// Byte stream from a serial-like device.
pub trait ByteTransport: Send {
    /// Transport identifier (e.g. a port path), used in log messages
    fn describe(&self) -> String;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Non-blocking read. `Ok(0)` means no data is available right now.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Device that delivers pre-digitized blocks, one `Vec` per channel.
pub trait SampleProvider: Send {
    fn describe(&self) -> String;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Next buffered block, or `None` when nothing is ready yet.
    fn fetch_block(&mut self) -> Result<Option<Vec<Vec<f64>>>>;
}

use crate::hal::ByteTransport;
use anyhow::{anyhow, Result};
use std::io::{self, Read};
use std::time::Duration;
use tokio_serial::SerialPort;

/// Per-read blocking limit handed to the driver.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Serial port opened through `tokio-serial`'s blocking port API.
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
        }
    }
}

impl ByteTransport for SerialTransport {
    fn describe(&self) -> String {
        format!("{} @ {} baud", self.path, self.baud_rate)
    }

    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        log::info!("Opening serial port: {} at {} baud", self.path, self.baud_rate);
        let port = tokio_serial::new(&self.path, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| anyhow!("Failed to open port {}: {}", self.path, e))?;
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            log::info!("Closed serial port {}", self.path);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))?;

        let available = port.bytes_to_read().map_err(io::Error::from)? as usize;
        if available == 0 {
            return Ok(0);
        }
        let len = available.min(buf.len());
        port.read(&mut buf[..len])
    }
}

use crate::hal::ByteTransport;
use anyhow::Result;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Step {
    /// Chunk and read offset into it
    Bytes(Vec<u8>, usize),
    Empty,
}

/// Transport replaying a queued script of chunks and explicit empty reads.
///
/// Once the script runs out every read reports no data. The queue is shared
/// with `ScriptHandle`, so a test can keep feeding bytes while a worker reads.
pub struct ScriptedTransport {
    open: bool,
    script: Arc<Mutex<VecDeque<Step>>>,
}

/// Producer side of a `ScriptedTransport`.
#[derive(Clone)]
pub struct ScriptHandle {
    script: Arc<Mutex<VecDeque<Step>>>,
}

impl ScriptHandle {
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return;
        }
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(Step::Bytes(bytes, 0));
    }

    /// Queue one read that returns no data.
    pub fn push_empty(&self) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(Step::Empty);
    }

    pub fn pending(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            open: false,
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Already-open transport preloaded with `bytes`.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let transport = Self {
            open: true,
            ..Self::new()
        };
        transport.handle().push_bytes(bytes);
        transport
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            script: self.script.clone(),
        }
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteTransport for ScriptedTransport {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed"));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut script = self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match script.pop_front() {
            Some(Step::Bytes(bytes, offset)) => {
                let rest = &bytes[offset..];
                let n = rest.len().min(buf.len());
                buf[..n].copy_from_slice(&rest[..n]);
                if offset + n < bytes.len() {
                    script.push_front(Step::Bytes(bytes, offset + n));
                }
                Ok(n)
            }
            Some(Step::Empty) | None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_are_split_across_reads() {
        let mut transport = ScriptedTransport::with_bytes(vec![1, 2, 3]);
        let mut buf = [0u8; 2];
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(transport.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_explicit_empty_read() {
        let mut transport = ScriptedTransport::new();
        transport.open().unwrap();
        let handle = transport.handle();
        handle.push_empty();
        handle.push_bytes(vec![9]);
        let mut buf = [0u8; 1];
        assert_eq!(transport.read(&mut buf).unwrap(), 0);
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
    }

    #[test]
    fn test_closed_transport_errors() {
        let mut transport = ScriptedTransport::new();
        let mut buf = [0u8; 1];
        assert!(transport.read(&mut buf).is_err());
    }
}

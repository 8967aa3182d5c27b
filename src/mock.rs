//! An in-memory duplex [`Transport`] for exercising the client against a
//! scripted "broker" without a real socket.
//!
//! The teacher crate's own tests fed pre-built byte slices straight into
//! its `nom` parser; this extends the same idea to a full duplex so the
//! dispatch loop, command emitter, and parser can all be driven together,
//! matching the seed scenarios in spec.md §8.

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::transport::Transport;

/// A mock broker connection. Bytes pushed with [`MockTransport::push_inbound`]
/// are what the client will read (as if sent by the broker); bytes the
/// client writes accumulate in [`MockTransport::outbound`] for assertions.
#[derive(Debug, Default)]
pub struct MockTransport {
    inbound: Vec<u8>,
    inbound_pos: usize,
    pub outbound: Vec<u8>,
    /// When set, `wait_readable` reports a timeout regardless of any
    /// buffered inbound data, simulating a stalled broker.
    pub force_timeout: bool,
    pub closed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, data: &[u8]) {
        self.inbound.extend_from_slice(data);
    }

    pub fn outbound_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.outbound)
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = &self.inbound[self.inbound_pos..];
        if available.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data buffered"));
        }
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.inbound_pos += n;
        Ok(n)
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn wait_readable(&mut self, _timeout: Option<Duration>) -> io::Result<bool> {
        if self.force_timeout {
            return Ok(false);
        }
        Ok(self.inbound_pos < self.inbound.len())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

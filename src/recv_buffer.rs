//! Buffered scanning over the transport.
//!
//! spec.md §9 calls out the reference client's unsized-body read path
//! (single-byte `recv` calls until a NULL) as quadratic for long bodies.
//! This buffer refills in 8 KiB chunks and scans in memory instead, so
//! every byte off the wire is copied at most twice regardless of frame
//! size.

use std::time::Duration;

use crate::transport::{read_with_timeout, Transport};

const FILL_CHUNK: usize = 8 * 1024;

pub(crate) struct RecvBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl RecvBuffer {
    pub(crate) fn new() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
        }
    }

    fn available(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Whether any unconsumed bytes are already sitting in the buffer.
    /// A broker that pipelines frames (or the mock transport's
    /// all-at-once `push_inbound`) can leave a complete next frame
    /// buffered here even after the transport itself reports not
    /// readable; callers must check this before treating "not readable"
    /// as "nothing to parse".
    pub(crate) fn has_buffered(&self) -> bool {
        !self.available().is_empty()
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.data.drain(..self.pos);
            self.pos = 0;
        }
    }

    fn fill<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
    ) -> std::io::Result<()> {
        self.compact();
        let mut chunk = [0u8; FILL_CHUNK];
        let n = read_with_timeout(transport, &mut chunk, timeout)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by remote host",
            ));
        }
        self.data.extend_from_slice(&chunk[..n]);
        Ok(())
    }

    /// Reads the first line of a frame. A lone `\r` is a complete
    /// heartbeat terminator in its own right (it need not be followed by
    /// `\n`), per the "single CR or CRLF" heartbeat rule: returns `None`
    /// for either a bare `\r` or a `\n`/`\r\n`, consuming only the
    /// terminator bytes actually present. Otherwise falls back to
    /// [`RecvBuffer::read_line`] and returns `Some(line)`.
    pub(crate) fn read_command_line<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
    ) -> std::io::Result<Option<Vec<u8>>> {
        while self.available().is_empty() {
            self.fill(transport, timeout)?;
        }
        match self.data[self.pos] {
            b'\n' => {
                self.pos += 1;
                Ok(None)
            }
            b'\r' => {
                self.pos += 1;
                // Only swallow a following `\n` if it's already buffered;
                // don't block on a fresh read for it, or a standalone CR
                // heartbeat with no CRLF anywhere nearby would stall.
                if self.available().first() == Some(&b'\n') {
                    self.pos += 1;
                }
                Ok(None)
            }
            _ => Ok(Some(self.read_line(transport, timeout)?)),
        }
    }

    /// Reads up to (and consuming) the next `\n`, stripping a trailing
    /// `\r` if present.
    pub(crate) fn read_line<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
    ) -> std::io::Result<Vec<u8>> {
        loop {
            if let Some(idx) = self.available().iter().position(|&b| b == b'\n') {
                let line_end = self.pos + idx;
                let mut line = self.data[self.pos..line_end].to_vec();
                self.pos = line_end + 1;
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(line);
            }
            self.fill(transport, timeout)?;
        }
    }

    /// Reads exactly `n` bytes.
    pub(crate) fn read_exact_n<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
        n: usize,
    ) -> std::io::Result<Vec<u8>> {
        while self.available().len() < n {
            self.fill(transport, timeout)?;
        }
        let bytes = self.data[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(bytes)
    }

    /// Reads up to (and consuming) the next NULL byte. The NULL itself is
    /// not included in the returned payload.
    pub(crate) fn read_until_null<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
    ) -> std::io::Result<Vec<u8>> {
        loop {
            if let Some(idx) = self.available().iter().position(|&b| b == 0) {
                let payload = self.data[self.pos..self.pos + idx].to_vec();
                self.pos += idx + 1;
                return Ok(payload);
            }
            self.fill(transport, timeout)?;
        }
    }

    /// Consumes exactly one byte, failing if it isn't `expected`.
    pub(crate) fn consume_byte<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
        expected: u8,
    ) -> std::io::Result<()> {
        while self.available().is_empty() {
            self.fill(transport, timeout)?;
        }
        let b = self.data[self.pos];
        self.pos += 1;
        if b != expected {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected terminator byte {expected:#x}, found {b:#x}"),
            ));
        }
        Ok(())
    }
}

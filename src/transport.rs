//! The byte-stream abstraction the dispatch loop and parser are built on.
//!
//! spec.md treats the socket layer as an external collaborator: the core
//! only needs a blocking `Read + Write` plus a timed "is there data to
//! read yet" primitive. [`TcpTransport`] is the real, `mio`-backed
//! implementation (the same readiness-polling approach
//! `frederikbosch-stomp-rs`'s `Session` uses its `mio::EventLoop` for);
//! tests substitute [`crate::mock::MockTransport`].

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream as StdTcpStream};
use std::time::Duration;

use mio::net::TcpStream as MioTcpStream;
use mio::{Events, Interest, Poll, Token};

const STREAM_TOKEN: Token = Token(0);

/// A blocking byte stream with a timed read-readiness check.
///
/// `wait_readable` is the "select-layer" primitive spec.md §4.5 uses to
/// compute the dispatch loop's heartbeat watchdog: `Some(d)` waits up to
/// `d` and returns whether the stream became readable; `None` blocks
/// indefinitely.
pub trait Transport: Read + Write {
    fn wait_readable(&mut self, timeout: Option<Duration>) -> std::io::Result<bool>;

    /// Best-effort close of the underlying stream. Called on disconnect
    /// and on any fatal error path. Default no-op for streams with no
    /// meaningful shutdown (e.g. an in-memory mock).
    fn shutdown(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Reads a single chunk off `transport`, waiting up to `timeout` for the
/// stream to become readable first. Used by [`crate::parser`] so that a
/// stalled broker fails with a `TimedOut` I/O error rather than blocking
/// forever on the underlying `read`.
pub(crate) fn read_with_timeout<T: Transport + ?Sized>(
    transport: &mut T,
    buf: &mut [u8],
    timeout: Duration,
) -> std::io::Result<usize> {
    if transport.wait_readable(Some(timeout))? {
        transport.read(buf)
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "read timed out",
        ))
    }
}

/// A real TCP connection, polled for readiness with `mio`.
pub struct TcpTransport {
    stream: MioTcpStream,
    poll: Poll,
    events: Events,
}

impl TcpTransport {
    pub fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let std_stream = StdTcpStream::connect(addr)?;
        std_stream.set_nodelay(true)?;
        std_stream.set_nonblocking(true)?;
        let mut stream = MioTcpStream::from_std(std_stream);
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut stream, STREAM_TOKEN, Interest::READABLE)?;
        Ok(Self {
            stream,
            poll,
            events: Events::with_capacity(4),
        })
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn wait_readable(&mut self, timeout: Option<Duration>) -> std::io::Result<bool> {
        self.events.clear();
        self.poll.poll(&mut self.events, timeout)?;
        Ok(self
            .events
            .iter()
            .any(|e| e.token() == STREAM_TOKEN && e.is_readable()))
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }
}

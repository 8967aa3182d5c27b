use std::time::Instant;

/// Errors surfaced by [`crate::Client`] operations and the dispatch loop.
///
/// See the data model notes on each variant for which Client operations
/// can raise it.
#[derive(Debug, thiserror::Error)]
pub enum StompError {
    /// Raised by any operation that requires an open session.
    #[error("not connected")]
    NotConnected,

    /// The connection string's scheme was not `stomp` or `stomp+ssl`, or
    /// the string could not be parsed as a URI at all.
    #[error("unsupported or unparseable connection string: {0}")]
    BadScheme(String),

    /// `subscribe` was called with an ack mode string outside
    /// `auto`/`client`/`client-individual`.
    #[error("invalid ack mode: {0}")]
    BadAckMode(String),

    /// The broker sent a frame where a CONNECTED was expected, or sent an
    /// ERROR frame that reached the default error handler.
    #[error("protocol error: {message}")]
    Protocol { message: String, body: Vec<u8> },

    /// The heartbeat watchdog fired: no frame (including a bare heartbeat)
    /// arrived within the configured select timeout.
    #[error("missed heartbeat, last activity at {last_activity:?}")]
    HeartbeatTimeout { last_activity: Instant },

    /// The underlying byte stream failed to read, write, or connect.
    #[error(transparent)]
    Transport(#[from] std::io::Error),
}

//! Session state and command emitter: the `Client` that owns a transport,
//! tracks subscriptions/transactions/server metadata, and serializes each
//! outbound STOMP command.

use std::net::ToSocketAddrs;
use std::time::{Duration, Instant};

use crate::codec::write_frame;
use crate::error::StompError;
use crate::parser;
use crate::response::{FrameKind, Response};
use crate::transport::{TcpTransport, Transport};
use crate::uri::ConnectionParams;
use crate::recv_buffer::RecvBuffer;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Subscription acknowledgement mode. See spec.md's glossary: `auto`
/// considers a message delivered as soon as it's sent, `client`
/// acknowledges cumulatively, `client-individual` acknowledges one
/// message at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    Auto,
    Client,
    ClientIndividual,
}

impl AckMode {
    /// Parses a wire-format ack mode string, for callers that carry it as
    /// a string (e.g. read from config) rather than constructing the enum
    /// directly.
    pub fn parse(s: &str) -> Result<Self, StompError> {
        match s {
            "auto" => Ok(AckMode::Auto),
            "client" => Ok(AckMode::Client),
            "client-individual" => Ok(AckMode::ClientIndividual),
            other => Err(StompError::BadAckMode(other.to_string())),
        }
    }

    fn wire_value(self) -> Option<&'static str> {
        match self {
            AckMode::Auto => None,
            AckMode::Client => Some("client"),
            AckMode::ClientIndividual => Some("client-individual"),
        }
    }
}

type ResponseHandler<T> = Box<dyn FnMut(&mut Client<T>, &Response)>;
type VoidHandler<T> = Box<dyn FnMut(&mut Client<T>)>;

/// The six handler slots from spec.md §6. Each is `None` by default; for
/// `on_error` and `on_missed_heartbeat`, `None` triggers the built-in
/// close-and-raise behavior described in spec.md §7.
pub struct Handlers<T: Transport> {
    pub on_connected: Option<ResponseHandler<T>>,
    pub on_error: Option<ResponseHandler<T>>,
    pub on_heartbeat: Option<VoidHandler<T>>,
    pub on_message: Option<ResponseHandler<T>>,
    pub on_missed_heartbeat: Option<VoidHandler<T>>,
    pub on_receipt: Option<ResponseHandler<T>>,
}

impl<T: Transport> Default for Handlers<T> {
    fn default() -> Self {
        Self {
            on_connected: None,
            on_error: None,
            on_heartbeat: None,
            on_message: None,
            on_missed_heartbeat: None,
            on_receipt: None,
        }
    }
}

/// A STOMP 1.2 client session over a transport `T`.
///
/// Not safe for concurrent use from multiple threads: every operation
/// assumes exclusive access, matching spec.md §5.
pub struct Client<T: Transport> {
    pub(crate) transport: T,
    pub(crate) recv_buf: RecvBuffer,
    pub(crate) read_timeout: Duration,
    pub(crate) last_activity: Instant,

    connected: bool,
    params: ConnectionParams,
    heartbeat_interval_secs: u32,

    /// Destination per subscription slot; an empty string is a tombstone
    /// left behind by `unsubscribe` so subscription ids stay stable.
    subscriptions: Vec<String>,
    /// Open transaction ids, in BEGIN order.
    transactions: Vec<String>,
    server_metadata: Vec<(String, String)>,

    pub handlers: Handlers<T>,
}

impl<T: Transport> Client<T> {
    /// Wraps an already-connected transport. Does not perform the STOMP
    /// handshake; call [`Client::connect`] next.
    pub fn new(transport: T, params: ConnectionParams) -> Self {
        let heartbeat_interval_secs = params.heartbeat_secs;
        Self {
            transport,
            recv_buf: RecvBuffer::new(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            last_activity: Instant::now(),
            connected: false,
            params,
            heartbeat_interval_secs,
            subscriptions: Vec::new(),
            transactions: Vec::new(),
            server_metadata: Vec::new(),
            handlers: Handlers::default(),
        }
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn transactions(&self) -> &[String] {
        &self.transactions
    }

    /// Case-insensitive lookup into the headers captured from the
    /// CONNECTED frame (e.g. `client.server_header("server")`).
    pub fn server_header(&self, name: &str) -> Option<&str> {
        self.server_metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Direct access to the underlying transport, e.g. for tests that
    /// inspect bytes written to a mock broker.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn close(&mut self) {
        let _ = self.transport.shutdown();
        self.connected = false;
    }

    /// Sends CONNECT and reads the reply. On CONNECTED, captures server
    /// metadata and marks the session connected. Any other reply is a
    /// `StompError::Protocol` and leaves the session disconnected.
    pub fn connect(&mut self) -> Result<(), StompError> {
        if self.connected {
            return Ok(());
        }

        let host_header = if self.params.vhost.is_empty() {
            self.params.host.clone()
        } else {
            self.params.vhost.clone()
        };
        let mut headers: Vec<(&str, String)> = vec![
            ("accept-version", "1.2".to_string()),
            ("host", host_header),
        ];
        if let Some(login) = self.params.login.clone() {
            headers.push(("login", login));
        }
        if let Some(passcode) = self.params.passcode.clone() {
            headers.push(("passcode", passcode));
        }
        if self.heartbeat_interval_secs > 0 {
            headers.push((
                "heart-beat",
                format!("0,{}", self.heartbeat_interval_secs as u64 * 1000),
            ));
        }

        write_frame(&mut self.transport, "CONNECT", &headers, None)?;
        let resp = parser::read_response(self)?;

        match resp.kind {
            FrameKind::Connected => {
                self.server_metadata = resp.headers().to_vec();
                self.connected = true;
                self.invoke_connected(&resp);
                Ok(())
            }
            _ => match self.handlers.on_error.take() {
                Some(mut handler) => {
                    handler(self, &resp);
                    self.handlers.on_error = Some(handler);
                    Ok(())
                }
                None => self.default_error_handler(&resp),
            },
        }
    }

    /// Sends DISCONNECT and closes the transport. A no-op if already
    /// disconnected.
    pub fn disconnect(&mut self) -> Result<(), StompError> {
        if !self.connected {
            return Ok(());
        }
        write_frame(&mut self.transport, "DISCONNECT", &[], None)?;
        self.close();
        Ok(())
    }

    /// Publishes `body` to `destination`. `content-length` is always
    /// sent. The current transaction is auto-attached iff exactly one is
    /// open and `extra_headers` doesn't already supply one.
    pub fn send(
        &mut self,
        destination: &str,
        body: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), StompError> {
        self.send_with_headers(destination, body, content_type, &[])
    }

    pub fn send_with_headers(
        &mut self,
        destination: &str,
        body: &[u8],
        content_type: Option<&str>,
        extra_headers: &[(&str, &str)],
    ) -> Result<(), StompError> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let mut headers: Vec<(&str, String)> = vec![
            ("destination", destination.to_string()),
            ("content-length", body.len().to_string()),
        ];
        if let Some(ct) = content_type {
            headers.push(("content-type", ct.to_string()));
        }
        for (k, v) in extra_headers {
            headers.push((k, (*v).to_string()));
        }
        let caller_supplied_tx = extra_headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("transaction"));
        if !caller_supplied_tx && self.transactions.len() == 1 {
            headers.push(("transaction", self.transactions[0].clone()));
        }
        write_frame(&mut self.transport, "SEND", &headers, Some(body))?;
        Ok(())
    }

    /// Subscribes to `destination`. `id` defaults to the current length
    /// of the subscription list and is returned either way.
    pub fn subscribe(
        &mut self,
        destination: &str,
        ack: AckMode,
        id: Option<&str>,
    ) -> Result<String, StompError> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let sub_id = id
            .map(str::to_string)
            .unwrap_or_else(|| self.subscriptions.len().to_string());
        let mut headers: Vec<(&str, String)> = vec![
            ("destination", destination.to_string()),
            ("id", sub_id.clone()),
        ];
        if let Some(ack_value) = ack.wire_value() {
            headers.push(("ack", ack_value.to_string()));
        }
        write_frame(&mut self.transport, "SUBSCRIBE", &headers, None)?;
        self.subscriptions.push(destination.to_string());
        Ok(sub_id)
    }

    /// Unsubscribes from the first slot still bound to `destination`.
    /// Tombstones (rather than removes) the slot so other subscriptions'
    /// ids stay stable. A no-op if no such subscription exists.
    pub fn unsubscribe(&mut self, destination: &str) -> Result<(), StompError> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let Some(idx) = self.subscriptions.iter().position(|d| d == destination) else {
            return Ok(());
        };
        write_frame(
            &mut self.transport,
            "UNSUBSCRIBE",
            &[("id", idx.to_string())],
            None,
        )?;
        self.subscriptions[idx] = String::new();
        Ok(())
    }

    pub fn begin(&mut self, transaction: &str) -> Result<(), StompError> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        write_frame(
            &mut self.transport,
            "BEGIN",
            &[("transaction", transaction.to_string())],
            None,
        )?;
        self.transactions.push(transaction.to_string());
        Ok(())
    }

    /// Commits `transaction`, or the most recently opened transaction if
    /// `None`. A no-op if no transaction is open and none was given.
    pub fn commit(&mut self, transaction: Option<&str>) -> Result<(), StompError> {
        self.end_transaction("COMMIT", transaction)
    }

    /// Aborts `transaction`, or the most recently opened transaction if
    /// `None`. A no-op if no transaction is open and none was given.
    pub fn abort(&mut self, transaction: Option<&str>) -> Result<(), StompError> {
        self.end_transaction("ABORT", transaction)
    }

    fn end_transaction(&mut self, verb: &str, transaction: Option<&str>) -> Result<(), StompError> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let id = match transaction {
            Some(id) => id.to_string(),
            None => match self.transactions.last() {
                Some(id) => id.clone(),
                None => return Ok(()),
            },
        };
        write_frame(
            &mut self.transport,
            verb,
            &[("transaction", id.clone())],
            None,
        )?;
        if let Some(pos) = self.transactions.iter().position(|t| *t == id) {
            self.transactions.remove(pos);
        }
        Ok(())
    }

    pub fn ack(&mut self, message_id: &str) -> Result<(), StompError> {
        self.ack_or_nack("ACK", message_id)
    }

    pub fn nack(&mut self, message_id: &str) -> Result<(), StompError> {
        self.ack_or_nack("NACK", message_id)
    }

    fn ack_or_nack(&mut self, verb: &str, message_id: &str) -> Result<(), StompError> {
        if !self.connected {
            return Err(StompError::NotConnected);
        }
        let mut headers: Vec<(&str, String)> = vec![("id", message_id.to_string())];
        if self.transactions.len() == 1 {
            headers.push(("transaction", self.transactions[0].clone()));
        }
        write_frame(&mut self.transport, verb, &headers, None)?;
        Ok(())
    }

    pub(crate) fn default_error_handler(&mut self, resp: &Response) -> Result<(), StompError> {
        let message = resp.get("message").unwrap_or_default().to_string();
        let mut body = resp.payload.clone();
        while body.last() == Some(&b'\n') {
            body.pop();
        }
        self.close();
        Err(StompError::Protocol { message, body })
    }

    pub(crate) fn default_missed_heartbeat_handler(&mut self) -> StompError {
        let last_activity = self.last_activity;
        self.close();
        StompError::HeartbeatTimeout { last_activity }
    }

    fn invoke_connected(&mut self, resp: &Response) {
        if let Some(mut handler) = self.handlers.on_connected.take() {
            handler(self, resp);
            self.handlers.on_connected = Some(handler);
        }
    }

    pub(crate) fn heartbeat_interval_secs(&self) -> u32 {
        self.heartbeat_interval_secs
    }

    pub fn on_connected<F>(&mut self, f: F)
    where
        F: FnMut(&mut Client<T>, &Response) + 'static,
    {
        self.handlers.on_connected = Some(Box::new(f));
    }

    pub fn on_error<F>(&mut self, f: F)
    where
        F: FnMut(&mut Client<T>, &Response) + 'static,
    {
        self.handlers.on_error = Some(Box::new(f));
    }

    pub fn on_message<F>(&mut self, f: F)
    where
        F: FnMut(&mut Client<T>, &Response) + 'static,
    {
        self.handlers.on_message = Some(Box::new(f));
    }

    pub fn on_receipt<F>(&mut self, f: F)
    where
        F: FnMut(&mut Client<T>, &Response) + 'static,
    {
        self.handlers.on_receipt = Some(Box::new(f));
    }

    pub fn on_heartbeat<F>(&mut self, f: F)
    where
        F: FnMut(&mut Client<T>) + 'static,
    {
        self.handlers.on_heartbeat = Some(Box::new(f));
    }

    pub fn on_missed_heartbeat<F>(&mut self, f: F)
    where
        F: FnMut(&mut Client<T>) + 'static,
    {
        self.handlers.on_missed_heartbeat = Some(Box::new(f));
    }
}

impl Client<TcpTransport> {
    /// Parses `uri`, opens a TCP connection, and performs the STOMP
    /// handshake.
    pub fn connect_uri(uri: &str) -> Result<Self, StompError> {
        let params = ConnectionParams::parse(uri)?;
        let addr = format!("{}:{}", params.host, params.port)
            .to_socket_addrs()
            .map_err(StompError::Transport)?
            .next()
            .ok_or_else(|| {
                StompError::Transport(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("could not resolve {}:{}", params.host, params.port),
                ))
            })?;
        let transport = TcpTransport::connect(addr)?;
        let mut client = Client::new(transport, params);
        client.connect()?;
        Ok(client)
    }
}

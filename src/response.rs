//! The structured result of parsing one inbound frame.

/// Which STOMP verb a [`Response`] carries. `Other` preserves the raw verb
/// text for frame kinds this client doesn't specifically model (or a
/// broker sending a lower-cased / nonstandard command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Connected,
    Message,
    Receipt,
    Error,
    Heartbeat,
    Other(String),
}

impl FrameKind {
    pub(crate) fn from_command(command: &str) -> Self {
        match command {
            "CONNECTED" => FrameKind::Connected,
            "MESSAGE" => FrameKind::Message,
            "RECEIPT" => FrameKind::Receipt,
            "ERROR" => FrameKind::Error,
            other => FrameKind::Other(other.to_string()),
        }
    }
}

/// One parsed inbound frame.
///
/// Headers preserve wire order and first-occurrence-wins lookup via
/// [`Response::get`], matching the STOMP spec's rule that a duplicated
/// header name is resolved by its first value.
#[derive(Debug, Clone)]
pub struct Response {
    pub kind: FrameKind,
    headers: Vec<(String, String)>,
    pub payload: Vec<u8>,
}

impl Response {
    pub(crate) fn new(kind: FrameKind, headers: Vec<(String, String)>, payload: Vec<u8>) -> Self {
        Self {
            kind,
            headers,
            payload,
        }
    }

    pub(crate) fn heartbeat() -> Self {
        Self {
            kind: FrameKind::Heartbeat,
            headers: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Case-insensitive header lookup, preserving the first occurrence of
    /// a repeated header name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers in wire order, original case preserved.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

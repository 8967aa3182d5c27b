//! Reads one logical STOMP frame off a [`Client`]'s transport.
//!
//! Mirrors the teacher's `parse_frame` nom grammar (command line, header
//! lines split on the first `:`, content-length-bounded or NULL-scanned
//! body, trailing NULL) but built incrementally over a blocking `Read`
//! instead of a filled buffer, since there is no async runtime handing us
//! a complete chunk up front.

use std::time::Instant;

use crate::client::Client;
use crate::codec::unescape_value;
use crate::error::StompError;
use crate::response::{FrameKind, Response};
use crate::transport::Transport;

pub(crate) fn read_response<T: Transport>(client: &mut Client<T>) -> Result<Response, StompError> {
    client.last_activity = Instant::now();

    let Some(command_line) = client
        .recv_buf
        .read_command_line(&mut client.transport, client.read_timeout)?
    else {
        return Ok(Response::heartbeat());
    };
    let command = String::from_utf8_lossy(&command_line).to_string();

    let mut headers = Vec::new();
    let mut content_length: Option<usize> = None;
    loop {
        let line = client
            .recv_buf
            .read_line(&mut client.transport, client.read_timeout)?;
        if line.is_empty() {
            break;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            // A header line with no colon ends header reading (the
            // reference parser treats this the same as hitting the blank
            // separator line).
            break;
        };
        let name = String::from_utf8_lossy(&line[..colon]).to_string();
        let raw_value = String::from_utf8_lossy(&line[colon + 1..]).to_string();
        let value = unescape_value(&raw_value);
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().ok();
        }
        headers.push((name, value));
    }

    let payload = match content_length {
        Some(len) => {
            let body = client
                .recv_buf
                .read_exact_n(&mut client.transport, client.read_timeout, len)?;
            client
                .recv_buf
                .consume_byte(&mut client.transport, client.read_timeout, 0)?;
            body
        }
        None => client
            .recv_buf
            .read_until_null(&mut client.transport, client.read_timeout)?,
    };

    Ok(Response::new(
        FrameKind::from_command(&command),
        headers,
        payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::uri::ConnectionParams;

    fn client_with(data: &[u8]) -> Client<MockTransport> {
        let mut transport = MockTransport::new();
        transport.push_inbound(data);
        let params = ConnectionParams::parse("stomp://h/vh").unwrap();
        Client::new(transport, params)
    }

    #[test]
    fn blank_line_is_heartbeat() {
        let mut client = client_with(b"\r\n");
        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.kind, FrameKind::Heartbeat);
        assert!(resp.payload.is_empty());
        assert!(resp.headers().is_empty());
    }

    #[test]
    fn bare_cr_is_heartbeat() {
        // A lone `\r`, not followed by `\n`, is its own complete
        // heartbeat terminator; the bytes that follow belong to the next
        // frame and must not be swallowed along with it.
        let mut client = client_with(b"\rCONNECTED\r\nserver:mock\r\n\r\n\x00");
        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.kind, FrameKind::Heartbeat);
        assert!(resp.payload.is_empty());

        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.kind, FrameKind::Connected);
        assert_eq!(resp.get("server"), Some("mock"));
    }

    #[test]
    fn message_with_explicit_content_length_zero() {
        let mut client = client_with(b"MESSAGE\r\ncontent-length:0\r\n\r\n\x00");
        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.kind, FrameKind::Message);
        assert!(resp.payload.is_empty());
    }

    #[test]
    fn message_without_content_length_reads_to_null() {
        let mut client = client_with(b"MESSAGE\r\ndestination:/q\r\n\r\nbody-bytes\x00");
        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.payload, b"body-bytes");
    }

    #[test]
    fn message_with_content_length_decodes_escaped_headers() {
        let mut client = client_with(
            b"MESSAGE\r\ncontent-type:text/plain\r\ncontent-length:7\r\n\r\nDumb.\n\n\x00",
        );
        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.payload, b"Dumb.\n\n");
        assert_eq!(resp.get("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn escaped_header_value_is_decoded() {
        let mut client = client_with(b"ERROR\r\nmessage:bad\\cheader\\nvalue\r\n\r\n\x00");
        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.get("message"), Some("bad:header\nvalue"));
    }

    #[test]
    fn connected_frame_with_no_body_consumes_null() {
        let mut client = client_with(b"CONNECTED\r\nserver:mock\r\n\r\n\x00");
        let resp = read_response(&mut client).unwrap();
        assert_eq!(resp.kind, FrameKind::Connected);
        assert_eq!(resp.get("server"), Some("mock"));
        assert!(resp.payload.is_empty());
    }
}

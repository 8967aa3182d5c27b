//! Header escaping and frame serialization.
//!
//! Escape rules apply to header *values* only, never names. The reference
//! client escapes in the order CR, LF, backslash, colon; doing the
//! substitution in a single pass over the input (as below) sidesteps the
//! double-escaping hazard that a sequence of `str::replace` calls would
//! hit, since every output byte is produced exactly once.

use std::io::{self, Write};

pub(crate) fn escape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn unescape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some('\\') => out.push('\\'),
            // Unknown escape sequence: the STOMP spec leaves this
            // undefined. Keep it literally rather than dropping the
            // backslash so re-encoding is closer to a round trip.
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Writes one outbound STOMP frame: `VERB\r\n` + `name:value\r\n`* + `\r\n`
/// + optional body + a single NULL terminator. When there is no body, an
/// extra trailing `\r\n` is appended, which some brokers expect as
/// inter-frame whitespace.
pub(crate) fn write_frame<W: Write>(
    w: &mut W,
    command: &str,
    headers: &[(&str, String)],
    body: Option<&[u8]>,
) -> io::Result<()> {
    write!(w, "{command}\r\n")?;
    for (name, value) in headers {
        write!(w, "{name}:{}\r\n", escape_value(value))?;
    }
    write!(w, "\r\n")?;
    match body {
        Some(body) => {
            w.write_all(body)?;
            w.write_all(b"\x00")?;
        }
        None => {
            w.write_all(b"\x00")?;
            write!(w, "\r\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_decode_round_trip() {
        let samples = [
            "plain",
            "line1\r\nline2",
            "col:on",
            "back\\slash",
            "mix:\r\nall\\of:it",
            "",
        ];
        for s in samples {
            assert_eq!(unescape_value(&escape_value(s)), s);
        }
    }

    #[test]
    fn escape_order_matches_reference() {
        assert_eq!(escape_value("a:b"), "a\\cb");
        assert_eq!(escape_value("a\\b"), "a\\\\b");
        assert_eq!(escape_value("a\r\nb"), "a\\r\\nb");
    }

    #[test]
    fn write_frame_with_body_has_no_trailing_crlf() {
        let mut buf = Vec::new();
        write_frame(
            &mut buf,
            "SEND",
            &[
                ("destination", "/q".to_string()),
                ("content-length", "12".to_string()),
                ("content-type", "text/plain".to_string()),
            ],
            Some(b"Hello world!"),
        )
        .unwrap();
        assert_eq!(
            buf,
            b"SEND\r\ndestination:/q\r\ncontent-length:12\r\ncontent-type:text/plain\r\n\r\nHello world!\x00"
        );
    }

    #[test]
    fn write_frame_without_body_has_trailing_crlf() {
        let mut buf = Vec::new();
        write_frame(&mut buf, "DISCONNECT", &[], None).unwrap();
        assert_eq!(buf, b"DISCONNECT\r\n\r\n\x00\r\n");
    }
}

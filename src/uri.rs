//! Connection-string interpretation.
//!
//! `url::Url` does the RFC 3986 split into scheme/userinfo/host/port/
//! path/query (the part spec.md treats as an external collaborator); the
//! STOMP-specific semantics below — vhost decoding, default ports, the
//! `heartbeat` query option — are first-party and the part this design
//! actually needs to get right.

use percent_encoding::percent_decode_str;

use crate::error::StompError;

const DEFAULT_PORT_PLAIN: u16 = 61613;
const DEFAULT_PORT_SSL: u16 = 61614;

/// Connection parameters parsed from a `stomp://` / `stomp+ssl://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub login: Option<String>,
    pub passcode: Option<String>,
    pub heartbeat_secs: u32,
    /// `true` for `stomp+ssl`. The core treats the stream opaquely; this
    /// is a hint for whoever constructs the transport to pre-wrap it in
    /// TLS before handing it to [`crate::Client::new`].
    pub tls_hint: bool,
}

impl ConnectionParams {
    pub fn parse(uri: &str) -> Result<Self, StompError> {
        let url = url::Url::parse(uri).map_err(|_| StompError::BadScheme(uri.to_string()))?;

        let tls_hint = match url.scheme() {
            "stomp" => false,
            "stomp+ssl" => true,
            other => return Err(StompError::BadScheme(other.to_string())),
        };

        let host = url
            .host_str()
            .ok_or_else(|| StompError::BadScheme(uri.to_string()))?
            .to_string();
        let port = url
            .port()
            .unwrap_or(if tls_hint { DEFAULT_PORT_SSL } else { DEFAULT_PORT_PLAIN });

        let login = decode_userinfo(url.username());
        let passcode = url.password().and_then(decode_userinfo);

        let vhost = decode_vhost(url.path());

        let mut heartbeat_secs = 0;
        for (key, value) in url.query_pairs() {
            if key == "heartbeat" {
                if let Ok(secs) = value.parse::<u32>() {
                    heartbeat_secs = secs;
                }
                // Malformed/unknown options are ignored silently.
            }
        }

        Ok(Self {
            host,
            port,
            vhost,
            login,
            passcode,
            heartbeat_secs,
            tls_hint,
        })
    }
}

fn decode_userinfo(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    Some(percent_decode_str(raw).decode_utf8_lossy().into_owned())
}

fn decode_vhost(path: &str) -> String {
    let stripped = path.strip_prefix('/').unwrap_or(path);
    let decoded = stripped.replace("%2f", "/").replace("%2F", "/");
    let mut collapsed = String::with_capacity(decoded.len());
    let mut prev_slash = false;
    for c in decoded.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let p = ConnectionParams::parse("stomp://u:p@h/vh").unwrap();
        assert_eq!(p.host, "h");
        assert_eq!(p.port, DEFAULT_PORT_PLAIN);
        assert_eq!(p.vhost, "vh");
        assert_eq!(p.login.as_deref(), Some("u"));
        assert_eq!(p.passcode.as_deref(), Some("p"));
        assert_eq!(p.heartbeat_secs, 0);
        assert!(!p.tls_hint);
    }

    #[test]
    fn parses_ssl_scheme_default_port() {
        let p = ConnectionParams::parse("stomp+ssl://h/").unwrap();
        assert_eq!(p.port, DEFAULT_PORT_SSL);
        assert!(p.tls_hint);
    }

    #[test]
    fn decodes_percent_2f_vhost_and_collapses_slashes() {
        let p = ConnectionParams::parse("stomp://u:p@h/%2Fvhost?heartbeat=5").unwrap();
        assert_eq!(p.vhost, "/vhost");
        assert_eq!(p.heartbeat_secs, 5);
        assert_eq!(p.port, DEFAULT_PORT_PLAIN);
    }

    #[test]
    fn lowercase_percent_2f_also_decodes() {
        let p = ConnectionParams::parse("stomp://h/%2fvhost").unwrap();
        assert_eq!(p.vhost, "/vhost");
    }

    #[test]
    fn rejects_bad_scheme() {
        let err = ConnectionParams::parse("amqp://h/").unwrap_err();
        assert!(matches!(err, StompError::BadScheme(_)));
    }

    #[test]
    fn unknown_query_keys_are_ignored() {
        let p = ConnectionParams::parse("stomp://h/vh?foo=bar&heartbeat=oops").unwrap();
        assert_eq!(p.heartbeat_secs, 0);
    }

    #[test]
    fn explicit_port_overrides_default() {
        let p = ConnectionParams::parse("stomp://h:12345/vh").unwrap();
        assert_eq!(p.port, 12345);
    }
}
